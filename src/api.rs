// 🪪 Profile API - The only way profile attributes change
// Validates the requested attributes, writes them and records an audit event

use crate::db::{self, Event, Profile};
use crate::errors::{ApiError, ApiResult};
use chrono::Utc;
use rusqlite::{params, Connection};
use serde::Serialize;

const GENDER_ACC_MIN: i64 = 1;
const GENDER_ACC_MAX: i64 = 100;

// ============================================================================
// PROFILE UPDATE
// ============================================================================

/// Attributes to set on a profile. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender_acc: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_bot: Option<bool>,
}

impl ProfileUpdate {
    pub fn is_bot(value: bool) -> Self {
        ProfileUpdate {
            is_bot: Some(value),
            ..Default::default()
        }
    }
}

// ============================================================================
// EDIT PROFILE
// ============================================================================

/// Apply `update` to the profile identified by `uuid`.
///
/// Fails with `NotFound` when the uuid is unknown and with `InvalidValue`
/// when an attribute does not validate. An update that changes nothing
/// returns the stored profile without writing or logging an event.
pub fn edit_profile(conn: &Connection, uuid: &str, update: &ProfileUpdate) -> ApiResult<Profile> {
    if uuid.trim().is_empty() {
        return Err(ApiError::invalid_value("'uuid' cannot be an empty string"));
    }

    let stored = db::find_profile(conn, uuid)?.ok_or_else(|| ApiError::not_found(uuid))?;
    let mut profile = stored.clone();

    if let Some(name) = &update.name {
        profile.name = blank_to_none(name);
    }
    if let Some(email) = &update.email {
        profile.email = blank_to_none(email);
    }
    if let Some(gender) = &update.gender {
        profile.gender = blank_to_none(gender);
    }
    if let Some(acc) = update.gender_acc {
        if !(GENDER_ACC_MIN..=GENDER_ACC_MAX).contains(&acc) {
            return Err(ApiError::invalid_value(format!(
                "'gender_acc' ({}) is not in range ({},{})",
                acc, GENDER_ACC_MIN, GENDER_ACC_MAX
            )));
        }
        profile.gender_acc = Some(acc);
    }
    if let Some(is_bot) = update.is_bot {
        profile.is_bot = is_bot;
    }

    match (&profile.gender, profile.gender_acc) {
        (None, Some(_)) => {
            return Err(ApiError::invalid_value(
                "'gender_acc' can only be set when 'gender' is given",
            ));
        }
        (Some(_), None) => profile.gender_acc = Some(GENDER_ACC_MAX),
        _ => {}
    }

    if profile == stored {
        tracing::debug!(uuid, "profile unchanged");
        return Ok(stored);
    }

    let now = Utc::now();
    profile.last_modified = Some(now);

    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "UPDATE profiles
         SET name = ?1, email = ?2, gender = ?3, gender_acc = ?4, is_bot = ?5, last_modified = ?6
         WHERE uuid = ?7",
        params![
            profile.name,
            profile.email,
            profile.gender,
            profile.gender_acc,
            profile.is_bot,
            now.to_rfc3339(),
            profile.uuid,
        ],
    )?;

    let data = serde_json::to_value(update).map_err(|e| ApiError::database(e.to_string()))?;
    let event = Event::new("profile_updated", "profile", uuid, data, "profile_api");
    db::insert_event(&tx, &event).map_err(|e| ApiError::database(e.to_string()))?;

    tx.commit()?;

    tracing::debug!(uuid, is_bot = profile.is_bot, "profile updated");

    Ok(profile)
}

fn blank_to_none(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// ============================================================================
// PROFILE API PORT
// ============================================================================

/// Profile-update capability consumed by commands.
pub trait ProfileApi {
    fn edit_profile(&self, uuid: &str, update: &ProfileUpdate) -> ApiResult<Profile>;
}

/// `ProfileApi` backed by the SQLite store
pub struct SqliteProfileApi<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteProfileApi<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        SqliteProfileApi { conn }
    }
}

impl ProfileApi for SqliteProfileApi<'_> {
    fn edit_profile(&self, uuid: &str, update: &ProfileUpdate) -> ApiResult<Profile> {
        edit_profile(self.conn, uuid, update)
    }
}
