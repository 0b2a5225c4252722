use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A single observed account, grouped under exactly one profile.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Identity {
    /// Stable identifier, derived from the identity values
    pub id: String,

    /// Profile this identity has been matched to
    pub uuid: String,

    /// Where the identity was observed (e.g. "git", "github", "mailing-list")
    pub source: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl Identity {
    /// Build an identity for `source`, computing its id.
    /// An empty `uuid` means the identity is its own profile.
    pub fn new(
        uuid: Option<&str>,
        source: &str,
        name: Option<&str>,
        email: Option<&str>,
        username: Option<&str>,
    ) -> Self {
        let name = non_empty(name);
        let email = non_empty(email);
        let username = non_empty(username);

        let id = compute_identity_id(source, email.as_deref(), name.as_deref(), username.as_deref());
        let uuid = non_empty(uuid).unwrap_or_else(|| id.clone());

        Identity {
            id,
            uuid,
            source: source.to_string(),
            name,
            email,
            username,
        }
    }
}

/// SHA-256 over `source:email:name:username`; absent values hash as "".
/// Importing the same values twice yields the same id.
pub fn compute_identity_id(
    source: &str,
    email: Option<&str>,
    name: Option<&str>,
    username: Option<&str>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!(
        "{}:{}:{}:{}",
        source,
        email.unwrap_or(""),
        name.unwrap_or(""),
        username.unwrap_or("")
    ));
    format!("{:x}", hasher.finalize())
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Canonical person record. Only the profile API mutates it.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Profile {
    pub uuid: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub gender: Option<String>,
    pub gender_acc: Option<i64>,
    pub is_bot: bool,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Event for audit trail. Every profile edit is recorded.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

pub fn open_database(path: &std::path::Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database: {:?}", path))?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(conn)
}

/// Open a database that must already exist; never creates the file.
pub fn open_existing_database(path: &std::path::Path) -> Result<Connection> {
    if !path.exists() {
        bail!("Database not found: {:?} (run `identity-sorter init` first)", path);
    }
    open_database(path)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    // ==========================================================================
    // Profiles Table
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS profiles (
            uuid TEXT PRIMARY KEY NOT NULL,
            name TEXT,
            email TEXT,
            gender TEXT,
            gender_acc INTEGER,
            is_bot INTEGER NOT NULL DEFAULT 0,
            last_modified TEXT
        )",
        [],
    )?;

    // ==========================================================================
    // Identities Table (grouped by profile uuid)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS identities (
            id TEXT PRIMARY KEY NOT NULL,
            uuid TEXT NOT NULL REFERENCES profiles(uuid) ON DELETE CASCADE,
            source TEXT NOT NULL,
            name TEXT,
            email TEXT,
            username TEXT,
            last_modified TEXT
        )",
        [],
    )?;

    // ==========================================================================
    // Events Table (audit trail)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_identities_uuid ON identities(uuid)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_identities_source ON identities(source)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id)",
        [],
    )?;

    Ok(())
}

/// Insert identities, creating their profiles on demand.
/// Returns how many identities were new; already stored ones are skipped.
pub fn insert_identities(conn: &Connection, identities: &[Identity]) -> Result<usize> {
    let mut inserted = 0;
    let mut duplicates = 0;

    for identity in identities {
        let now = Utc::now().to_rfc3339();

        // Profile and identity are written together; a skipped identity
        // must not leave an empty profile behind
        let tx = conn.unchecked_transaction()?;

        tx.execute(
            "INSERT OR IGNORE INTO profiles (uuid, is_bot, last_modified) VALUES (?1, 0, ?2)",
            params![identity.uuid, now],
        )?;

        let result = tx.execute(
            "INSERT INTO identities (id, uuid, source, name, email, username, last_modified)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                identity.id,
                identity.uuid,
                identity.source,
                identity.name,
                identity.email,
                identity.username,
                now,
            ],
        );

        match result {
            Ok(_) => {
                inserted += 1;

                let event = Event::new(
                    "identity_added",
                    "identity",
                    &identity.id,
                    serde_json::json!({
                        "uuid": identity.uuid,
                        "source": identity.source,
                    }),
                    "loader",
                );
                insert_event(&tx, &event)?;
                tx.commit()?;
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                tx.rollback()?;
                duplicates += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    tracing::debug!(inserted, duplicates, "identities stored");

    Ok(inserted)
}

/// Insert event into audit trail
pub fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO events (
            event_id, timestamp, event_type, entity_type, entity_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.entity_type,
            event.entity_id,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

/// Get events for a specific entity, newest first
pub fn get_events_for_entity(
    conn: &Connection,
    entity_type: &str,
    entity_id: &str,
) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
         FROM events
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY id DESC",
    )?;

    let events = stmt
        .query_map(params![entity_type, entity_id], |row| {
            let timestamp_str: String = row.get(1)?;
            let data_json: String = row.get(5)?;

            Ok(Event {
                event_id: row.get(0)?,
                timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
                    .map_err(|_| rusqlite::Error::InvalidQuery)?
                    .with_timezone(&Utc),
                event_type: row.get(2)?,
                entity_type: row.get(3)?,
                entity_id: row.get(4)?,
                data: serde_json::from_str(&data_json)
                    .map_err(|_| rusqlite::Error::InvalidQuery)?,
                actor: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(events)
}

pub fn find_profile(conn: &Connection, uuid: &str) -> rusqlite::Result<Option<Profile>> {
    conn.query_row(
        "SELECT uuid, name, email, gender, gender_acc, is_bot, last_modified
         FROM profiles
         WHERE uuid = ?1",
        [uuid],
        |row| {
            let last_modified: Option<String> = row.get(6)?;

            Ok(Profile {
                uuid: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                gender: row.get(3)?,
                gender_acc: row.get(4)?,
                is_bot: row.get(5)?,
                last_modified: last_modified
                    .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                    .map(|dt| dt.with_timezone(&Utc)),
            })
        },
    )
    .optional()
}

const IDENTITY_COLUMNS: &str = "id, uuid, source, name, email, username";

fn identity_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Identity> {
    Ok(Identity {
        id: row.get(0)?,
        uuid: row.get(1)?,
        source: row.get(2)?,
        name: row.get(3)?,
        email: row.get(4)?,
        username: row.get(5)?,
    })
}

/// Identities of one profile, ordered by identity id
pub fn get_identities_for_profile(conn: &Connection, uuid: &str) -> Result<Vec<Identity>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM identities WHERE uuid = ?1 ORDER BY id",
        IDENTITY_COLUMNS
    ))?;

    let identities = stmt
        .query_map([uuid], identity_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(identities)
}

/// Every identity of every profile that has at least one identity in `source`,
/// ordered by profile uuid then identity id
pub fn get_profile_identities_by_source(conn: &Connection, source: &str) -> Result<Vec<Identity>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM identities
         WHERE uuid IN (SELECT uuid FROM identities WHERE source = ?1)
         ORDER BY uuid, id",
        IDENTITY_COLUMNS
    ))?;

    let identities = stmt
        .query_map([source], identity_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(identities)
}

pub fn count_identities(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM identities", [], |row| row.get(0))?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    #[test]
    fn test_identity_id_is_stable() {
        let a = Identity::new(None, "git", Some("John Smith"), Some("jsmith@example.com"), Some("jsmith"));
        let b = Identity::new(None, "git", Some("John Smith"), Some("jsmith@example.com"), Some("jsmith"));
        let c = Identity::new(None, "github", Some("John Smith"), Some("jsmith@example.com"), Some("jsmith"));

        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id, "source is part of the identity");
        assert_eq!(a.id.len(), 64, "SHA-256 hash should be 64 hex characters");
        assert_eq!(a.uuid, a.id, "identity without profile becomes its own profile");
    }

    #[test]
    fn test_identity_blank_fields_are_absent() {
        let identity = Identity::new(Some("  "), "git", Some(""), None, Some("   "));

        assert_eq!(identity.name, None);
        assert_eq!(identity.username, None);
        assert_eq!(identity.uuid, identity.id);
    }

    #[test]
    fn test_insert_identities_twice() {
        let conn = test_db();

        let identities = vec![
            Identity::new(Some("uuid-1"), "git", Some("John"), None, Some("john")),
            Identity::new(Some("uuid-1"), "github", None, None, Some("john_bot")),
            Identity::new(None, "git", Some("Jane"), Some("jane@example.com"), None),
        ];

        let inserted1 = insert_identities(&conn, &identities).unwrap();
        let inserted2 = insert_identities(&conn, &identities).unwrap();

        assert_eq!(inserted1, 3);
        assert_eq!(inserted2, 0, "second import should skip all identities");
        assert_eq!(count_identities(&conn).unwrap(), 3);

        let profile = find_profile(&conn, "uuid-1").unwrap().unwrap();
        assert!(!profile.is_bot, "new profiles are not bots");
        assert_eq!(get_identities_for_profile(&conn, "uuid-1").unwrap().len(), 2);
    }

    #[test]
    fn test_moved_identity_leaves_no_empty_profile() {
        let conn = test_db();

        insert_identities(&conn, &[Identity::new(Some("uuid-1"), "git", None, None, Some("x"))])
            .unwrap();
        let inserted = insert_identities(
            &conn,
            &[Identity::new(Some("uuid-2"), "git", None, None, Some("x"))],
        )
        .unwrap();

        assert_eq!(inserted, 0, "same identity under another profile is a duplicate");
        assert!(find_profile(&conn, "uuid-2").unwrap().is_none());
        assert_eq!(get_identities_for_profile(&conn, "uuid-1").unwrap().len(), 1);
    }

    #[test]
    fn test_profile_identities_by_source() {
        let conn = test_db();

        insert_identities(
            &conn,
            &[
                Identity::new(Some("uuid-b"), "git", None, None, Some("b-git")),
                Identity::new(Some("uuid-b"), "jira", None, None, Some("b-jira")),
                Identity::new(Some("uuid-a"), "git", None, None, Some("a-git")),
                Identity::new(Some("uuid-c"), "jira", None, None, Some("c-jira")),
            ],
        )
        .unwrap();

        let found = get_profile_identities_by_source(&conn, "git").unwrap();
        let uuids: Vec<&str> = found.iter().map(|i| i.uuid.as_str()).collect();

        // uuid-b is returned with its jira identity too; uuid-c has no git identity
        assert_eq!(uuids, vec!["uuid-a", "uuid-b", "uuid-b"]);
    }

    #[test]
    fn test_missing_profile() {
        let conn = test_db();
        assert!(find_profile(&conn, "nope").unwrap().is_none());
    }

    #[test]
    fn test_event_log() {
        let conn = test_db();

        let event = Event::new(
            "test_event",
            "profile",
            "test_id_123",
            serde_json::json!({"test": "data"}),
            "test_actor",
        );

        insert_event(&conn, &event).unwrap();

        let events = get_events_for_entity(&conn, "profile", "test_id_123").unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "test_event");
        assert_eq!(events[0].actor, "test_actor");
    }

    #[test]
    fn test_open_existing_does_not_create() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.db");

        assert!(open_existing_database(&path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_file_backed_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identities.db");

        {
            let conn = open_database(&path).unwrap();
            setup_database(&conn).unwrap();
            insert_identities(&conn, &[Identity::new(Some("uuid-1"), "git", None, None, Some("x"))])
                .unwrap();
        }

        let conn = open_database(&path).unwrap();
        assert_eq!(count_identities(&conn).unwrap(), 1);
    }
}
