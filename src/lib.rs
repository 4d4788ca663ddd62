pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{Cli, Command};

pub use adapters::{FileCredentialStore, LocalServerFlow, OAuthClient, RecordScraper, SearchClient};
pub use config::AppConfig;
pub use core::{Authenticator, SearchService};
pub use utils::error::{AppError, AuthenticationError, Result, ScrapeError, SearchError};
