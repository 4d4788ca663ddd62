use crate::domain::model::Credential;
use crate::utils::error::AuthenticationError;
use async_trait::async_trait;

/// Persistence for the single OAuth credential.
pub trait CredentialStore: Send + Sync {
    /// `Ok(None)` when nothing has been persisted yet.
    fn load(
        &self,
    ) -> impl std::future::Future<Output = Result<Option<Credential>, AuthenticationError>> + Send;

    /// Replaces the stored credential; readers never observe a partial write.
    fn save(
        &self,
        credential: &Credential,
    ) -> impl std::future::Future<Output = Result<(), AuthenticationError>> + Send;
}

/// The interactive, user-facing authorization step.
#[async_trait]
pub trait ConsentFlow: Send + Sync {
    async fn authorize(&self, scopes: &[String]) -> Result<Credential, AuthenticationError>;
}
