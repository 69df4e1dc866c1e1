use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("Unsupported source: {0}")]
    UnsupportedSource(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Extraction timed out after {secs}s: {url}")]
    ExtractionTimeout { url: String, secs: u64 },

    #[error("Extractor dependency setup failed: {0}")]
    DependencySetup(String),

    #[error("Missing required field: {0}")]
    MissingRequiredField(String),

    #[error("Reconciliation conflict: {0}")]
    ReconciliationConflict(String),

    /// A create collided with an existing row; callers refetch by name.
    #[error("{entity} already exists: {name}")]
    Conflict { entity: &'static str, name: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScraperError {
    /// Stable tag used in error envelopes, logs and metric labels
    pub fn kind(&self) -> &'static str {
        match self {
            ScraperError::UnsupportedSource(_) => "UnsupportedSource",
            ScraperError::InvalidInput(_) => "InvalidInput",
            ScraperError::ExtractionFailed(_) => "ExtractionFailed",
            ScraperError::ExtractionTimeout { .. } => "ExtractionTimeout",
            ScraperError::DependencySetup(_) => "DependencySetupFailed",
            ScraperError::MissingRequiredField(_) => "MissingRequiredField",
            ScraperError::ReconciliationConflict(_) | ScraperError::Conflict { .. } => {
                "ReconciliationConflict"
            }
            ScraperError::Storage { .. } => "StorageError",
            ScraperError::Config(_) => "ConfigError",
            ScraperError::Json(_) | ScraperError::Toml(_) | ScraperError::Io(_) => "InternalError",
        }
    }

    /// Whether re-running the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ScraperError::ExtractionFailed(_)
                | ScraperError::ExtractionTimeout { .. }
                | ScraperError::ReconciliationConflict(_)
                | ScraperError::Conflict { .. }
                | ScraperError::Storage { .. }
        )
    }

    /// Client errors are the caller's fault; everything else is ours or the source's.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ScraperError::UnsupportedSource(_) | ScraperError::InvalidInput(_)
        )
    }
}

impl From<rusqlite::Error> for ScraperError {
    fn from(err: rusqlite::Error) -> Self {
        ScraperError::Storage {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScraperError>;
