use crate::adapters::oauth::{authorization_url, ClientSecrets, OAuthClient};
use crate::config::OAuthConfig;
use crate::domain::model::Credential;
use crate::domain::ports::ConsentFlow;
use crate::utils::error::AuthenticationError;
use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};

const CALLBACK_PAGE: &str = "<!doctype html><html><body>\
<p>Authorization complete. You may close this window.</p></body></html>";
const WAITING_PAGE: &str = "<!doctype html><html><body>\
<p>Waiting for the authorization redirect.</p></body></html>";

#[derive(Debug, Default, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

impl CallbackParams {
    /// Only the authorization server's redirect carries `code` or `error`.
    fn is_redirect(&self) -> bool {
        self.code.is_some() || self.error.is_some()
    }
}

type CallbackSender = Arc<Mutex<Option<oneshot::Sender<CallbackParams>>>>;

/// Installed-app consent: the user opens the authorization URL, Google
/// redirects to a listener on `localhost:<callback_port>`, and the code is
/// exchanged for a credential.
pub struct LocalServerFlow {
    client_secrets_path: PathBuf,
    callback_port: u16,
    timeout: Duration,
    open_browser: bool,
    oauth: OAuthClient,
}

impl LocalServerFlow {
    pub fn new(config: &OAuthConfig, oauth: OAuthClient) -> Self {
        Self {
            client_secrets_path: config.client_secrets_path.clone(),
            callback_port: config.callback_port,
            timeout: config.consent_timeout(),
            open_browser: config.open_browser,
            oauth,
        }
    }

    fn redirect_uri(&self) -> String {
        format!("http://localhost:{}/", self.callback_port)
    }

    /// Serves the callback route until one redirect arrives or the timeout elapses.
    async fn await_callback(
        &self,
        listener: TcpListener,
    ) -> Result<CallbackParams, AuthenticationError> {
        let (tx, rx) = oneshot::channel();
        let sender: CallbackSender = Arc::new(Mutex::new(Some(tx)));
        let app = Router::new()
            .route("/", get(receive_callback))
            .with_state(sender);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        let outcome = tokio::time::timeout(self.timeout, rx).await;

        let _ = shutdown_tx.send(());
        match server.await {
            Ok(Err(e)) => tracing::warn!(error = %e, "Callback listener stopped with an error"),
            Err(e) => tracing::warn!(error = %e, "Callback listener task failed"),
            Ok(Ok(())) => {}
        }

        match outcome {
            Ok(Ok(params)) => Ok(params),
            Ok(Err(_)) => Err(AuthenticationError::InvalidCallback {
                reason: "callback listener closed before a redirect arrived".to_string(),
            }),
            Err(_) => Err(AuthenticationError::ConsentTimeout {
                seconds: self.timeout.as_secs(),
            }),
        }
    }
}

async fn receive_callback(
    State(sender): State<CallbackSender>,
    Query(params): Query<CallbackParams>,
) -> Html<&'static str> {
    if !params.is_redirect() {
        tracing::debug!("Ignoring callback request without code or error");
        return Html(WAITING_PAGE);
    }
    if let Some(tx) = sender.lock().await.take() {
        let _ = tx.send(params);
    }
    Html(CALLBACK_PAGE)
}

#[async_trait]
impl ConsentFlow for LocalServerFlow {
    async fn authorize(&self, scopes: &[String]) -> Result<Credential, AuthenticationError> {
        let secrets = ClientSecrets::from_file(&self.client_secrets_path)?;
        let redirect_uri = self.redirect_uri();
        let state = uuid::Uuid::new_v4().simple().to_string();
        let auth_url = authorization_url(&secrets, scopes, &redirect_uri, &state)?;

        let listener = TcpListener::bind(("127.0.0.1", self.callback_port))
            .await
            .map_err(|source| AuthenticationError::CallbackListener {
                port: self.callback_port,
                source,
            })?;

        tracing::info!(redirect_uri = %redirect_uri, "Waiting for OAuth consent");
        tracing::info!("Open this URL in a browser to authorize access: {}", auth_url);
        if self.open_browser {
            if let Err(e) = open::that(auth_url.as_str()) {
                tracing::warn!(error = %e, "Could not launch a browser; open the URL manually");
            }
        }

        let params = self.await_callback(listener).await?;

        if let Some(error) = params.error {
            return Err(AuthenticationError::ConsentDenied { reason: error });
        }
        if params.state.as_deref() != Some(state.as_str()) {
            return Err(AuthenticationError::InvalidCallback {
                reason: "state parameter does not match".to_string(),
            });
        }
        let code = params
            .code
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AuthenticationError::InvalidCallback {
                reason: "authorization code missing".to_string(),
            })?;

        self.oauth
            .exchange_code(&secrets, &code, &redirect_uri, scopes)
            .await
    }
}
