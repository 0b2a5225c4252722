// 🖥️ Command-line surface
// identity-sorter [--database PATH] <init | load | show | autobot>

use crate::api::SqliteProfileApi;
use crate::autobot::{AutoBot, AUTOBOT_DESCRIPTION};
use crate::config::{Config, DEFAULT_DATABASE};
use crate::db::{
    self, get_identities_for_profile, insert_identities, open_database, open_existing_database,
    setup_database,
};
use crate::errors::{ApiError, CMD_SUCCESS};
use crate::loader::{load_csv, load_csv_from_reader};
use crate::report::{ConsoleReporter, Reporter};
use crate::selector::SourcePrioritySelector;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "identity-sorter", version, about = "Sort identities into profiles and flag bots")]
pub struct Cli {
    /// SQLite database holding profiles and identities
    #[arg(long, global = true, env = "IDENTITY_SORTER_DB", default_value = DEFAULT_DATABASE)]
    pub database: PathBuf,

    /// Log more details
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the database schema
    Init,

    /// Import identities from a CSV file (uuid,source,name,email,username); `-` reads stdin
    Load { csv: PathBuf },

    /// Print a profile and its identities as JSON
    Show { uuid: String },

    #[command(about = AUTOBOT_DESCRIPTION)]
    Autobot {
        /// Sources to read identities from, highest priority first
        #[arg(required = true, num_args = 1..)]
        source: Vec<String>,
    },
}

impl Cli {
    pub fn config(&self) -> Config {
        Config::new(self.database.clone(), self.verbose)
    }
}

/// Run the parsed command and return the process exit code
pub fn run(cli: Cli) -> Result<i32> {
    let config = cli.config();

    match cli.command {
        Command::Init => {
            let conn = open_database(&config.database)?;
            setup_database(&conn)?;
            println!("✓ Database initialized at {:?}", config.database);
            Ok(CMD_SUCCESS)
        }
        Command::Load { csv } => {
            let conn = open_database(&config.database)?;
            setup_database(&conn)?;
            let identities = if csv.as_os_str() == "-" {
                load_csv_from_reader(std::io::stdin().lock())?
            } else {
                load_csv(&csv)?
            };
            let inserted = insert_identities(&conn, &identities)?;
            println!("✓ Loaded {} identities from CSV", identities.len());
            println!("✓ Inserted: {} identities", inserted);
            println!("✓ Skipped duplicates: {}", identities.len() - inserted);
            Ok(CMD_SUCCESS)
        }
        Command::Show { uuid } => {
            let conn = open_existing_database(&config.database)?;
            let reporter = ConsoleReporter;
            let profile = match db::find_profile(&conn, &uuid)? {
                Some(p) => p,
                None => {
                    let err = ApiError::not_found(&uuid);
                    reporter.error(&err.message);
                    return Ok(err.code());
                }
            };
            let identities = get_identities_for_profile(&conn, &uuid)?;
            let out = serde_json::json!({
                "profile": profile,
                "identities": identities,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
            Ok(CMD_SUCCESS)
        }
        Command::Autobot { source } => {
            let conn = open_existing_database(&config.database)?;
            let selector = SourcePrioritySelector::new(&conn);
            let api = SqliteProfileApi::new(&conn);
            let reporter = ConsoleReporter;

            Ok(AutoBot::new(&selector, &api, &reporter).mark_bots(&source))
        }
    }
}
