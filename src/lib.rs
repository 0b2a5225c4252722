// Identity Sorter - Core Library
// Profile/identity store, profile API and the bot classifier

pub mod errors;
pub mod db;
pub mod api;
pub mod selector;
pub mod classifier;
pub mod report;
pub mod autobot;
pub mod loader;
pub mod config;
pub mod logging;
pub mod cli;

// Re-export commonly used types
pub use errors::{
    ApiError, ApiResult, ErrorKind,
    CMD_SUCCESS, CODE_DATABASE_ERROR, CODE_NOT_FOUND_ERROR, CODE_VALUE_ERROR,
};
pub use db::{
    Identity, Profile, Event,
    open_database, open_existing_database, setup_database, insert_identities, insert_event,
    get_events_for_entity, find_profile, get_identities_for_profile,
    count_identities,
};
pub use api::{edit_profile, ProfileApi, ProfileUpdate, SqliteProfileApi};
pub use selector::{CandidateSelector, Candidates, SourcePrioritySelector};
pub use classifier::{classify, BotMatcher, Verdict};
pub use report::{ConsoleReporter, Reporter, Template};
pub use autobot::AutoBot;
pub use config::Config;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
