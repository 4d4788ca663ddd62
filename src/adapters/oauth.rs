//! OAuth2 token endpoint calls and client-secret loading.
//!
//! Speaks the two grants this tool needs: `authorization_code` (after the
//! consent redirect) and `refresh_token`. Tokens and secrets are never logged.

use crate::domain::model::Credential;
use crate::utils::error::AuthenticationError;
use chrono::{Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use url::Url;

const GOOGLE_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const ERROR_BODY_SNIPPET: usize = 200;

fn default_auth_uri() -> String {
    GOOGLE_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

/// OAuth client registration, as found under `installed` or `web` in the
/// downloaded client secrets file.
#[derive(Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AuthenticationError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| AuthenticationError::ClientSecrets {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        Self::from_json_str(&content).map_err(|message| AuthenticationError::ClientSecrets {
            path: path.display().to_string(),
            message,
        })
    }

    fn from_json_str(content: &str) -> Result<Self, String> {
        let file: ClientSecretsFile = serde_json::from_str(content).map_err(|e| e.to_string())?;
        file.installed
            .or(file.web)
            .ok_or_else(|| "expected an \"installed\" or \"web\" client entry".to_string())
    }
}

impl fmt::Debug for ClientSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSecrets")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("auth_uri", &self.auth_uri)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl TokenResponse {
    fn granted_scopes(&self) -> Option<Vec<String>> {
        self.scope
            .as_deref()
            .map(|s| s.split_whitespace().map(str::to_string).collect())
    }

    /// `expires_in` is server-controlled; values past the representable range are rejected.
    fn expiry(&self) -> Result<Option<chrono::DateTime<Utc>>, AuthenticationError> {
        let Some(seconds) = self.expires_in else {
            return Ok(None);
        };
        Duration::try_seconds(seconds)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .map(Some)
            .ok_or_else(|| AuthenticationError::TokenEndpoint {
                status: 200,
                message: format!("expires_in out of range: {}", seconds),
            })
    }
}

/// Builds the consent URL the user opens in a browser.
pub fn authorization_url(
    secrets: &ClientSecrets,
    scopes: &[String],
    redirect_uri: &str,
    state: &str,
) -> Result<Url, AuthenticationError> {
    let scope = scopes.join(" ");
    Url::parse_with_params(
        &secrets.auth_uri,
        &[
            ("response_type", "code"),
            ("client_id", secrets.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("scope", scope.as_str()),
            ("state", state),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ],
    )
    .map_err(|e| AuthenticationError::ClientSecrets {
        path: secrets.auth_uri.clone(),
        message: format!("invalid auth_uri: {}", e),
    })
}

#[derive(Debug, Clone)]
pub struct OAuthClient {
    http: Client,
}

impl OAuthClient {
    pub fn new(timeout: std::time::Duration) -> Result<Self, AuthenticationError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    pub fn with_client(http: Client) -> Self {
        Self { http }
    }

    /// Exchanges a refresh token for a new access token.
    ///
    /// The returned credential keeps the old refresh token unless the server
    /// rotated it, and keeps the old scopes unless the server reported them.
    pub async fn refresh(&self, credential: &Credential) -> Result<Credential, AuthenticationError> {
        let refresh_token = credential
            .refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| unavailable("no refresh token"))?;
        let token_uri = credential
            .token_uri
            .as_deref()
            .ok_or_else(|| unavailable("token_uri missing from credential"))?;
        let client_id = credential
            .client_id
            .as_deref()
            .ok_or_else(|| unavailable("client_id missing from credential"))?;
        let client_secret = credential
            .client_secret
            .as_deref()
            .ok_or_else(|| unavailable("client_secret missing from credential"))?;

        tracing::debug!(token_uri, "Refreshing access token");
        let token = self
            .request_token(
                token_uri,
                &[
                    ("grant_type", "refresh_token"),
                    ("refresh_token", refresh_token),
                    ("client_id", client_id),
                    ("client_secret", client_secret),
                ],
            )
            .await?;

        let expiry = token.expiry()?;
        let scopes = token
            .granted_scopes()
            .unwrap_or_else(|| credential.scopes.clone());
        Ok(Credential {
            access_token: token.access_token,
            refresh_token: token
                .refresh_token
                .or_else(|| credential.refresh_token.clone()),
            token_uri: credential.token_uri.clone(),
            client_id: credential.client_id.clone(),
            client_secret: credential.client_secret.clone(),
            scopes,
            expiry,
        })
    }

    /// Redeems an authorization code returned to the consent callback.
    pub async fn exchange_code(
        &self,
        secrets: &ClientSecrets,
        code: &str,
        redirect_uri: &str,
        requested_scopes: &[String],
    ) -> Result<Credential, AuthenticationError> {
        tracing::debug!(token_uri = %secrets.token_uri, "Exchanging authorization code");
        let token = self
            .request_token(
                &secrets.token_uri,
                &[
                    ("grant_type", "authorization_code"),
                    ("code", code),
                    ("redirect_uri", redirect_uri),
                    ("client_id", secrets.client_id.as_str()),
                    ("client_secret", secrets.client_secret.as_str()),
                ],
            )
            .await?;

        let expiry = token.expiry()?;
        let scopes = token
            .granted_scopes()
            .unwrap_or_else(|| requested_scopes.to_vec());
        Ok(Credential {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            token_uri: Some(secrets.token_uri.clone()),
            client_id: Some(secrets.client_id.clone()),
            client_secret: Some(secrets.client_secret.clone()),
            scopes,
            expiry,
        })
    }

    async fn request_token(
        &self,
        token_uri: &str,
        params: &[(&str, &str)],
    ) -> Result<TokenResponse, AuthenticationError> {
        let response = self.http.post(token_uri).form(params).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(err) => match err.error_description {
                    Some(description) => format!("{}: {}", err.error, description),
                    None => err.error,
                },
                Err(_) => body.chars().take(ERROR_BODY_SNIPPET).collect(),
            };
            return Err(AuthenticationError::TokenEndpoint {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<TokenResponse>().await?)
    }
}

fn unavailable(message: &str) -> AuthenticationError {
    AuthenticationError::RefreshUnavailable {
        message: message.to_string(),
    }
}
