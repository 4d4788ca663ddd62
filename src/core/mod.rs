pub mod authenticator;
pub mod search_service;

pub use crate::domain::model::{Credential, RecordOutcome, ScrapedRecord, SearchResultItem};
pub use crate::domain::ports::{ConsentFlow, CredentialStore};
pub use crate::utils::error::Result;
pub use authenticator::Authenticator;
pub use search_service::SearchService;
