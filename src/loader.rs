// 📂 Identity Loader - CSV → identities
// One row per observed account: uuid,source,name,email,username

use crate::db::Identity;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct IdentityRow {
    #[serde(default)]
    uuid: Option<String>,
    source: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    username: Option<String>,
}

pub fn load_csv(csv_path: &Path) -> Result<Vec<Identity>> {
    let rdr = csv::Reader::from_path(csv_path)
        .with_context(|| format!("Failed to open CSV file: {:?}", csv_path))?;

    read_identities(rdr)
}

/// Read identities from any CSV stream, e.g. stdin
pub fn load_csv_from_reader<R: Read>(reader: R) -> Result<Vec<Identity>> {
    read_identities(csv::Reader::from_reader(reader))
}

fn read_identities<R: Read>(mut rdr: csv::Reader<R>) -> Result<Vec<Identity>> {
    let mut identities = Vec::new();

    for (line, result) in rdr.deserialize().enumerate() {
        let row: IdentityRow = result.context("Failed to deserialize identity")?;

        // Header is line 1
        if row.source.trim().is_empty() {
            bail!("Line {}: 'source' cannot be empty", line + 2);
        }

        identities.push(Identity::new(
            row.uuid.as_deref(),
            row.source.trim(),
            row.name.as_deref(),
            row.email.as_deref(),
            row.username.as_deref(),
        ));
    }

    Ok(identities)
}
