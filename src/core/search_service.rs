use crate::adapters::google_search::SearchClient;
use crate::core::authenticator::Authenticator;
use crate::domain::model::SearchResultItem;
use crate::domain::ports::{ConsentFlow, CredentialStore};
use crate::utils::error::Result;

/// Authenticate, then search. One attempt per call.
pub struct SearchService<S: CredentialStore, F: ConsentFlow> {
    authenticator: Authenticator<S, F>,
    client: SearchClient,
}

impl<S: CredentialStore, F: ConsentFlow> SearchService<S, F> {
    pub fn new(authenticator: Authenticator<S, F>, client: SearchClient) -> Self {
        Self {
            authenticator,
            client,
        }
    }

    pub fn authenticator(&self) -> &Authenticator<S, F> {
        &self.authenticator
    }

    pub async fn run(&self, query: &str) -> Result<Vec<SearchResultItem>> {
        tracing::info!(query = %query, "Received search query");
        let credential = self.authenticator.get_valid_credential().await?;
        let results = self.client.search(query, &credential).await?;
        tracing::info!(query = %query, count = results.len(), "Search completed");
        Ok(results)
    }
}
