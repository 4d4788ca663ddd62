use crate::utils::error::{AppError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CUSTOMSEARCH_SCOPE: &str = "https://www.googleapis.com/auth/customsearch";

/// Upper bound for `oauth.expiry_skew_seconds`.
pub const MAX_EXPIRY_SKEW_SECONDS: i64 = 3600;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub oauth: OAuthConfig,
    pub search: SearchConfig,
    pub scrape: ScrapeConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    pub client_secrets_path: PathBuf,
    pub token_path: PathBuf,
    pub scopes: Vec<String>,
    pub callback_port: u16,
    pub consent_timeout_seconds: u64,
    pub expiry_skew_seconds: i64,
    pub open_browser: bool,
    /// Timeout for token endpoint requests (refresh and code exchange).
    pub http_timeout_seconds: u64,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            client_secrets_path: PathBuf::from("/opt/credentials.json"),
            token_path: PathBuf::from("/opt/token.json"),
            scopes: vec![CUSTOMSEARCH_SCOPE.to_string()],
            callback_port: 5000,
            consent_timeout_seconds: 300,
            expiry_skew_seconds: 60,
            open_browser: true,
            http_timeout_seconds: 30,
        }
    }
}

impl OAuthConfig {
    pub fn consent_timeout(&self) -> Duration {
        Duration::from_secs(self.consent_timeout_seconds)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }

    pub fn expiry_skew(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.expiry_skew_seconds.clamp(0, MAX_EXPIRY_SKEW_SECONDS))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub endpoint: String,
    pub engine_id: String,
    pub timeout_seconds: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://www.googleapis.com/customsearch/v1".to_string(),
            engine_id: "90f74a59e07b84462".to_string(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0".to_string(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        validation::validate_socket_addr("server.bind", &self.bind)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(AppError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// Missing file means built-in defaults.
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            tracing::debug!(
                path = %path.as_ref().display(),
                "Config file not found, using defaults"
            );
            Ok(Self::default())
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| AppError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${ENGINE_ID})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| AppError::ConfigError {
            message: format!("env substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_path(
            "oauth.client_secrets_path",
            &self.oauth.client_secrets_path.to_string_lossy(),
        )?;
        validation::validate_path("oauth.token_path", &self.oauth.token_path.to_string_lossy())?;
        validation::validate_non_empty_list("oauth.scopes", &self.oauth.scopes)?;
        validation::validate_positive_number(
            "oauth.callback_port",
            u64::from(self.oauth.callback_port),
            1,
        )?;
        validation::validate_positive_number(
            "oauth.consent_timeout_seconds",
            self.oauth.consent_timeout_seconds,
            1,
        )?;
        validation::validate_positive_number(
            "oauth.http_timeout_seconds",
            self.oauth.http_timeout_seconds,
            1,
        )?;
        if !(0..=MAX_EXPIRY_SKEW_SECONDS).contains(&self.oauth.expiry_skew_seconds) {
            return Err(AppError::InvalidConfigValueError {
                field: "oauth.expiry_skew_seconds".to_string(),
                value: self.oauth.expiry_skew_seconds.to_string(),
                reason: format!("Value must be between 0 and {}", MAX_EXPIRY_SKEW_SECONDS),
            });
        }

        validation::validate_url("search.endpoint", &self.search.endpoint)?;
        validation::validate_non_empty_string("search.engine_id", &self.search.engine_id)?;
        validation::validate_positive_number(
            "search.timeout_seconds",
            self.search.timeout_seconds,
            1,
        )?;

        validation::validate_non_empty_string("scrape.user_agent", &self.scrape.user_agent)?;
        validation::validate_positive_number(
            "scrape.timeout_seconds",
            self.scrape.timeout_seconds,
            1,
        )?;

        self.server.socket_addr()?;
        Ok(())
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
