use std::path::PathBuf;

pub const DEFAULT_DATABASE: &str = "identities.db";
pub const DEFAULT_LOG_FILTER: &str = "warn,identity_sorter=info";

/// Runtime settings shared by every subcommand.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub database: PathBuf,

    /// `EnvFilter` directives; `RUST_LOG` takes precedence when set
    pub log_filter: String,
}

impl Config {
    pub fn new(database: PathBuf, verbose: bool) -> Self {
        let log_filter = if verbose {
            "info,identity_sorter=debug".to_string()
        } else {
            DEFAULT_LOG_FILTER.to_string()
        };

        Config {
            database,
            log_filter,
        }
    }
}
