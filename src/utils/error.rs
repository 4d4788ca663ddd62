use thiserror::Error;

/// Failures while producing a usable OAuth credential.
#[derive(Error, Debug)]
pub enum AuthenticationError {
    #[error("Credential store error at {path}: {source}")]
    Store {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed credential file {path}: {source}")]
    MalformedCredential {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Client secrets unavailable at {path}: {message}")]
    ClientSecrets { path: String, message: String },

    #[error("Credential cannot be refreshed: {message}")]
    RefreshUnavailable { message: String },

    #[error("Token endpoint returned {status}: {message}")]
    TokenEndpoint { status: u16, message: String },

    #[error("Token request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Callback listener failed on port {port}: {source}")]
    CallbackListener {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("Consent was not completed within {seconds}s")]
    ConsentTimeout { seconds: u64 },

    #[error("Consent denied: {reason}")]
    ConsentDenied { reason: String },

    #[error("Consent callback rejected: {reason}")]
    InvalidCallback { reason: String },

    #[error("Credential lacks required scopes: {missing:?}")]
    InsufficientScope { missing: Vec<String> },
}

/// Failures of the outbound search API call.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Search request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Search API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Malformed search response: {message}")]
    Malformed { message: String },

    #[error("Invalid search endpoint {endpoint}: {message}")]
    Endpoint { endpoint: String, message: String },
}

/// Failures while fetching or parsing a scrape target.
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("Invalid scrape URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Fetching {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Fetching {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Selector {selector} is invalid: {message}")]
    Selector { selector: String, message: String },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(#[from] AuthenticationError),

    #[error("Search failed: {0}")]
    Search(#[from] SearchError),

    #[error("Scrape failed: {0}")]
    Scrape(#[from] ScrapeError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV export error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Missing configuration value: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Authentication,
    Remote,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AppError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::Authentication(_) => ErrorCategory::Authentication,
            AppError::Search(_) | AppError::Scrape(_) => ErrorCategory::Remote,
            AppError::ConfigError { .. }
            | AppError::ConfigValidationError { .. }
            | AppError::MissingConfigError { .. }
            | AppError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            AppError::IoError(_) | AppError::CsvError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            AppError::Search(_) | AppError::Scrape(_) => ErrorSeverity::Medium,
            AppError::Authentication(_) | AppError::CsvError(_) => ErrorSeverity::High,
            _ => ErrorSeverity::Critical,
        }
    }

    /// Process exit code for the CLI, derived from severity.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            AppError::Authentication(AuthenticationError::ConsentTimeout { .. }) => {
                "Authorization was not completed in the browser in time".to_string()
            }
            AppError::Authentication(_) => "Could not obtain a valid access token".to_string(),
            AppError::Search(SearchError::Api { status, .. }) => {
                format!("The search service rejected the request (HTTP {})", status)
            }
            AppError::Search(_) => "The search service could not be reached".to_string(),
            AppError::Scrape(ScrapeError::Status { status, .. }) => {
                format!("The page could not be fetched (HTTP {})", status)
            }
            AppError::Scrape(_) => "The page could not be scraped".to_string(),
            AppError::IoError(_) | AppError::CsvError(_) => {
                "A local file could not be read or written".to_string()
            }
            _ => format!("Invalid configuration: {}", self),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            AppError::Authentication(AuthenticationError::ClientSecrets { .. }) => {
                "Download the OAuth client secrets JSON and point oauth.client_secrets_path at it"
            }
            AppError::Authentication(AuthenticationError::MalformedCredential { .. }) => {
                "Delete the token file and run `people-search auth` to authorize again"
            }
            AppError::Authentication(_) => {
                "Run `people-search auth` and complete the consent step in the browser"
            }
            AppError::Search(SearchError::Api { .. }) => {
                "Check the search engine id and the API quota for the project"
            }
            AppError::Search(_) | AppError::Scrape(_) => {
                "Check network connectivity and try again"
            }
            AppError::IoError(_) | AppError::CsvError(_) => {
                "Check that the path exists and is writable"
            }
            _ => "Fix the configuration file and run the command again",
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
