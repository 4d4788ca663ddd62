use crate::adapters::oauth::OAuthClient;
use crate::config::OAuthConfig;
use crate::domain::model::Credential;
use crate::domain::ports::{ConsentFlow, CredentialStore};
use crate::utils::error::AuthenticationError;
use chrono::{Duration, Utc};
use tokio::sync::Mutex;

/// What was found in the store, judged against the required scopes and clock.
#[derive(Debug)]
enum CredentialState {
    NoToken,
    LoadedInvalid(Credential),
    LoadedValid(Credential),
}

/// Produces a credential that is valid at the moment it is returned.
///
/// The load, refresh and save steps run under one lock, so concurrent callers
/// in this process never refresh the same token twice or interleave writes.
pub struct Authenticator<S: CredentialStore, F: ConsentFlow> {
    store: S,
    flow: F,
    oauth: OAuthClient,
    required_scopes: Vec<String>,
    expiry_skew: Duration,
    refresh_guard: Mutex<()>,
}

impl<S: CredentialStore, F: ConsentFlow> Authenticator<S, F> {
    pub fn new(store: S, flow: F, oauth: OAuthClient, config: &OAuthConfig) -> Self {
        Self {
            store,
            flow,
            oauth,
            required_scopes: config.scopes.clone(),
            expiry_skew: config.expiry_skew(),
            refresh_guard: Mutex::new(()),
        }
    }

    pub fn required_scopes(&self) -> &[String] {
        &self.required_scopes
    }

    fn assess(&self, loaded: Option<Credential>) -> CredentialState {
        match loaded {
            None => CredentialState::NoToken,
            Some(credential) => {
                if credential.is_valid(&self.required_scopes, Utc::now(), self.expiry_skew) {
                    CredentialState::LoadedValid(credential)
                } else {
                    CredentialState::LoadedInvalid(credential)
                }
            }
        }
    }

    fn is_usable(&self, credential: &Credential) -> bool {
        credential.is_valid(&self.required_scopes, Utc::now(), self.expiry_skew)
    }

    pub async fn get_valid_credential(&self) -> Result<Credential, AuthenticationError> {
        let _guard = self.refresh_guard.lock().await;
        tracing::debug!("Authenticating search API access");

        let loaded = self.store.load().await.map_err(|e| {
            tracing::error!(error = %e, "Could not load persisted credential");
            e
        })?;

        match self.assess(loaded) {
            CredentialState::LoadedValid(credential) => {
                tracing::debug!(expiry = ?credential.expiry, "Persisted credential is valid");
                return Ok(credential);
            }
            CredentialState::LoadedInvalid(credential) if credential.can_refresh() => {
                tracing::debug!(expiry = ?credential.expiry, "Refreshing invalid credential");
                if let Some(refreshed) = self.try_refresh(&credential).await? {
                    return Ok(refreshed);
                }
            }
            CredentialState::LoadedInvalid(_) => {
                tracing::debug!("Credential is invalid and has no refresh token");
            }
            CredentialState::NoToken => {
                tracing::debug!("No persisted credential");
            }
        }

        self.run_consent_flow().await
    }

    /// `Ok(None)` means fall through to the interactive flow.
    async fn try_refresh(
        &self,
        credential: &Credential,
    ) -> Result<Option<Credential>, AuthenticationError> {
        let refreshed = match self.oauth.refresh(credential).await {
            Ok(refreshed) => refreshed,
            Err(e) => {
                tracing::warn!(error = %e, "Credential refresh failed, starting consent flow");
                return Ok(None);
            }
        };

        if !self.is_usable(&refreshed) {
            tracing::warn!(
                missing = ?refreshed.missing_scopes(&self.required_scopes),
                "Refreshed credential is still not usable, starting consent flow"
            );
            return Ok(None);
        }

        self.persist(&refreshed).await?;
        tracing::info!(expiry = ?refreshed.expiry, "Credential refreshed");
        Ok(Some(refreshed))
    }

    async fn run_consent_flow(&self) -> Result<Credential, AuthenticationError> {
        tracing::info!("No valid credentials, initiating OAuth flow");
        let credential = self
            .flow
            .authorize(&self.required_scopes)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Error during OAuth flow");
                e
            })?;

        let missing = credential.missing_scopes(&self.required_scopes);
        if !missing.is_empty() {
            tracing::error!(missing = ?missing, "Consent did not grant the required scopes");
            return Err(AuthenticationError::InsufficientScope { missing });
        }

        self.persist(&credential).await?;
        tracing::info!(expiry = ?credential.expiry, "Authentication successful");
        Ok(credential)
    }

    async fn persist(&self, credential: &Credential) -> Result<(), AuthenticationError> {
        self.store.save(credential).await.map_err(|e| {
            tracing::error!(error = %e, "Could not persist credential");
            e
        })
    }
}
