// Adapters layer: concrete implementations for external systems (token file, OAuth, search API, scraping, web).

pub mod consent;
pub mod csv_export;
pub mod file_store;
pub mod google_search;
pub mod oauth;
pub mod record_scraper;
pub mod web;

pub use consent::LocalServerFlow;
pub use file_store::FileCredentialStore;
pub use google_search::SearchClient;
pub use oauth::{ClientSecrets, OAuthClient};
pub use record_scraper::{extract_records, RecordScraper};
