use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use httpmock::prelude::*;
use people_search::config::{OAuthConfig, CUSTOMSEARCH_SCOPE};
use people_search::core::{ConsentFlow, Credential, CredentialStore};
use people_search::{AuthenticationError, Authenticator, FileCredentialStore, OAuthClient};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// 計數用的授權流程，回傳預先設定的結果
struct StubFlow {
    calls: Arc<AtomicUsize>,
    outcome: Option<Credential>,
}

impl StubFlow {
    fn granting(credential: Credential) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                calls: calls.clone(),
                outcome: Some(credential),
            },
            calls,
        )
    }

    fn denying() -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                calls: calls.clone(),
                outcome: None,
            },
            calls,
        )
    }
}

#[async_trait]
impl ConsentFlow for StubFlow {
    async fn authorize(&self, _scopes: &[String]) -> Result<Credential, AuthenticationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome
            .clone()
            .ok_or_else(|| AuthenticationError::ConsentDenied {
                reason: "access_denied".to_string(),
            })
    }
}

fn oauth_config() -> OAuthConfig {
    OAuthConfig {
        scopes: vec![CUSTOMSEARCH_SCOPE.to_string()],
        ..OAuthConfig::default()
    }
}

fn credential(token: &str, token_uri: &str, expires_in_secs: i64) -> Credential {
    Credential {
        access_token: token.to_string(),
        refresh_token: Some("refresh-1".to_string()),
        token_uri: Some(token_uri.to_string()),
        client_id: Some("client-id".to_string()),
        client_secret: Some("client-secret".to_string()),
        scopes: vec![CUSTOMSEARCH_SCOPE.to_string()],
        expiry: Some(Utc::now() + Duration::seconds(expires_in_secs)),
    }
}

async fn stored(store: &FileCredentialStore) -> Option<Credential> {
    store.load().await.expect("token file should be readable")
}

#[tokio::test]
async fn test_missing_token_runs_consent_and_persists() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let token_path = temp_dir.path().join("token.json");
    let granted = credential("fresh-token", "http://unused.invalid/token", 3600);
    let (flow, calls) = StubFlow::granting(granted.clone());

    let authenticator = Authenticator::new(
        FileCredentialStore::new(&token_path),
        flow,
        OAuthClient::with_client(reqwest::Client::new()),
        &oauth_config(),
    );

    let credential = authenticator.get_valid_credential().await?;
    assert_eq!(credential.access_token, "fresh-token");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    assert!(token_path.exists());
    let persisted = stored(&FileCredentialStore::new(&token_path)).await;
    assert_eq!(persisted, Some(granted));
    Ok(())
}

#[tokio::test]
async fn test_valid_token_is_returned_without_network_or_consent() -> Result<()> {
    let server = MockServer::start_async().await;
    let token_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/token");
            then.status(200)
                .json_body(serde_json::json!({"access_token": "should-not-be-used"}));
        })
        .await;

    let temp_dir = TempDir::new()?;
    let store = FileCredentialStore::new(temp_dir.path().join("token.json"));
    let existing = credential("still-good", &server.url("/token"), 3600);
    store.save(&existing).await?;

    let (flow, calls) = StubFlow::denying();
    let authenticator = Authenticator::new(
        store,
        flow,
        OAuthClient::with_client(reqwest::Client::new()),
        &oauth_config(),
    );

    let credential = authenticator.get_valid_credential().await?;
    assert_eq!(credential, existing);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    token_mock.assert_hits_async(0).await;
    Ok(())
}

#[tokio::test]
async fn test_expired_token_is_refreshed_and_persisted() -> Result<()> {
    let server = MockServer::start_async().await;
    let token_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/token")
                .body_contains("grant_type=refresh_token")
                .body_contains("refresh_token=refresh-1");
            then.status(200).json_body(serde_json::json!({
                "access_token": "refreshed-token",
                "expires_in": 3600,
                "token_type": "Bearer"
            }));
        })
        .await;

    let temp_dir = TempDir::new()?;
    let token_path = temp_dir.path().join("token.json");
    let store = FileCredentialStore::new(&token_path);
    store
        .save(&credential("expired-token", &server.url("/token"), -600))
        .await?;

    let (flow, calls) = StubFlow::denying();
    let authenticator = Authenticator::new(
        store,
        flow,
        OAuthClient::with_client(reqwest::Client::new()),
        &oauth_config(),
    );

    let credential = authenticator.get_valid_credential().await?;
    assert_eq!(credential.access_token, "refreshed-token");
    assert_eq!(credential.refresh_token.as_deref(), Some("refresh-1"));
    assert!(credential.expiry.is_some_and(|expiry| expiry > Utc::now()));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    token_mock.assert_hits_async(1).await;

    let persisted = stored(&FileCredentialStore::new(&token_path)).await;
    assert_eq!(
        persisted.map(|c| c.access_token),
        Some("refreshed-token".to_string())
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callers_share_one_refresh() -> Result<()> {
    let server = MockServer::start_async().await;
    let token_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/token")
                .body_contains("grant_type=refresh_token");
            then.status(200)
                .delay(std::time::Duration::from_millis(300))
                .json_body(serde_json::json!({
                    "access_token": "shared-token",
                    "expires_in": 3600
                }));
        })
        .await;

    let temp_dir = TempDir::new()?;
    let store = FileCredentialStore::new(temp_dir.path().join("token.json"));
    store
        .save(&credential("expired-token", &server.url("/token"), -600))
        .await?;

    let (flow, calls) = StubFlow::denying();
    let authenticator = Arc::new(Authenticator::new(
        store,
        flow,
        OAuthClient::with_client(reqwest::Client::new()),
        &oauth_config(),
    ));

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let authenticator = Arc::clone(&authenticator);
            tokio::spawn(async move { authenticator.get_valid_credential().await })
        })
        .collect();

    for handle in handles {
        let credential = handle.await??;
        assert_eq!(credential.access_token, "shared-token");
    }

    token_mock.assert_hits_async(1).await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn test_refresh_failure_falls_back_to_consent() -> Result<()> {
    let server = MockServer::start_async().await;
    let token_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/token");
            then.status(400).json_body(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Token has been expired or revoked."
            }));
        })
        .await;

    let temp_dir = TempDir::new()?;
    let token_path = temp_dir.path().join("token.json");
    let store = FileCredentialStore::new(&token_path);
    store
        .save(&credential("expired-token", &server.url("/token"), -600))
        .await?;

    let (flow, calls) = StubFlow::granting(credential(
        "consented-token",
        &server.url("/token"),
        3600,
    ));
    let authenticator = Authenticator::new(
        store,
        flow,
        OAuthClient::with_client(reqwest::Client::new()),
        &oauth_config(),
    );

    let credential = authenticator.get_valid_credential().await?;
    assert_eq!(credential.access_token, "consented-token");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    token_mock.assert_hits_async(1).await;

    let persisted = stored(&FileCredentialStore::new(&token_path)).await;
    assert_eq!(
        persisted.map(|c| c.access_token),
        Some("consented-token".to_string())
    );
    Ok(())
}

#[tokio::test]
async fn test_refresh_and_consent_failure_leaves_store_untouched() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/token");
            then.status(401)
                .json_body(serde_json::json!({"error": "invalid_client"}));
        })
        .await;

    let temp_dir = TempDir::new()?;
    let token_path = temp_dir.path().join("token.json");
    let store = FileCredentialStore::new(&token_path);
    let expired = credential("expired-token", &server.url("/token"), -600);
    store.save(&expired).await?;

    let (flow, calls) = StubFlow::denying();
    let authenticator = Authenticator::new(
        store,
        flow,
        OAuthClient::with_client(reqwest::Client::new()),
        &oauth_config(),
    );

    let result = authenticator.get_valid_credential().await;
    assert!(matches!(
        result,
        Err(AuthenticationError::ConsentDenied { .. })
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let persisted = stored(&FileCredentialStore::new(&token_path)).await;
    assert_eq!(persisted, Some(expired));
    Ok(())
}

#[tokio::test]
async fn test_consent_without_required_scope_is_rejected() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let token_path = temp_dir.path().join("token.json");

    let mut narrow = credential("narrow-token", "http://unused.invalid/token", 3600);
    narrow.scopes = vec!["openid".to_string()];
    let (flow, _calls) = StubFlow::granting(narrow);

    let authenticator = Authenticator::new(
        FileCredentialStore::new(&token_path),
        flow,
        OAuthClient::with_client(reqwest::Client::new()),
        &oauth_config(),
    );

    match authenticator.get_valid_credential().await {
        Err(AuthenticationError::InsufficientScope { missing }) => {
            assert_eq!(missing, vec![CUSTOMSEARCH_SCOPE.to_string()]);
        }
        other => panic!("expected insufficient scope, got {:?}", other),
    }
    assert!(!token_path.exists());
    Ok(())
}

#[tokio::test]
async fn test_stored_token_missing_scope_without_refresh_runs_consent() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = FileCredentialStore::new(temp_dir.path().join("token.json"));

    let mut scoped_out = credential("old-token", "http://unused.invalid/token", 3600);
    scoped_out.scopes = vec!["openid".to_string()];
    scoped_out.refresh_token = None;
    store.save(&scoped_out).await?;

    let (flow, calls) = StubFlow::granting(credential(
        "new-token",
        "http://unused.invalid/token",
        3600,
    ));
    let authenticator = Authenticator::new(
        store,
        flow,
        OAuthClient::with_client(reqwest::Client::new()),
        &oauth_config(),
    );

    let credential = authenticator.get_valid_credential().await?;
    assert_eq!(credential.access_token, "new-token");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn test_malformed_token_file_is_an_error_and_is_kept() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let token_path = temp_dir.path().join("token.json");
    std::fs::write(&token_path, "{ not json")?;

    let (flow, calls) = StubFlow::granting(credential(
        "new-token",
        "http://unused.invalid/token",
        3600,
    ));
    let authenticator = Authenticator::new(
        FileCredentialStore::new(&token_path),
        flow,
        OAuthClient::with_client(reqwest::Client::new()),
        &oauth_config(),
    );

    let result = authenticator.get_valid_credential().await;
    assert!(matches!(
        result,
        Err(AuthenticationError::MalformedCredential { .. })
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(std::fs::read_to_string(&token_path)?, "{ not json");
    Ok(())
}
