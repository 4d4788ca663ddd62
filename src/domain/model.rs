use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// An OAuth2 user credential in the "authorized user" file layout.
///
/// The refresh coordinates (`token_uri`, `client_id`, `client_secret`) travel
/// with the token so a refresh never needs the client secrets file.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    #[serde(rename = "token", alias = "access_token")]
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl Credential {
    /// A credential without an expiry never expires.
    pub fn is_expired(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        self.expiry.is_some_and(|expiry| {
            now.checked_add_signed(skew)
                .map_or(true, |deadline| deadline >= expiry)
        })
    }

    pub fn missing_scopes(&self, required: &[String]) -> Vec<String> {
        required
            .iter()
            .filter(|scope| !self.scopes.contains(scope))
            .cloned()
            .collect()
    }

    pub fn is_valid(&self, required: &[String], now: DateTime<Utc>, skew: Duration) -> bool {
        !self.access_token.is_empty()
            && !self.is_expired(now, skew)
            && self.missing_scopes(required).is_empty()
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token
            .as_deref()
            .is_some_and(|token| !token.is_empty())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("token_uri", &self.token_uri)
            .field("client_id", &self.client_id)
            .field("scopes", &self.scopes)
            .field("expiry", &self.expiry)
            .finish()
    }
}

/// One item of the search API response, passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchResultItem(Map<String, Value>);

impl SearchResultItem {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn title(&self) -> Option<&str> {
        self.get("title").and_then(Value::as_str)
    }

    pub fn link(&self) -> Option<&str> {
        self.get("link").and_then(Value::as_str)
    }

    pub fn snippet(&self) -> Option<&str> {
        self.get("snippet").and_then(Value::as_str)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedRecord {
    pub name: String,
    pub address: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingName,
    MissingAddress,
    EmptyName,
    EmptyAddress,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::MissingName => "name element not found",
            SkipReason::MissingAddress => "address element not found",
            SkipReason::EmptyName => "name element is empty",
            SkipReason::EmptyAddress => "address element is empty",
        };
        f.write_str(text)
    }
}

/// Result of extracting one record container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Extracted(ScrapedRecord),
    Skipped(SkipReason),
}

impl RecordOutcome {
    pub fn into_record(self) -> Option<ScrapedRecord> {
        match self {
            RecordOutcome::Extracted(record) => Some(record),
            RecordOutcome::Skipped(_) => None,
        }
    }
}
