/*!
 * Error taxonomy.
 *
 * - `ProviderError`: what a translation backend reports for a single call
 * - `TranslationError`: how the pipeline classifies a failed run
 * - `StoreError`: persistence failures
 * - `AppError`: top-level wrapper used by the binary
 */

use thiserror::Error;

/// Failure of one call to a translation backend
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Backend request failed: {0}")]
    RequestFailed(String),

    /// The backend answered but the payload was unusable
    #[error("Unreadable backend response: {0}")]
    ParseError(String),

    /// Non-success status reported by the backend
    #[error("Backend returned status {status_code}: {message}")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Backend unreachable: {0}")]
    ConnectionError(String),

    #[error("Backend rate limit hit: {0}")]
    RateLimitExceeded(String),

    #[error("Backend timed out: {0}")]
    Timeout(String),

    /// Missing or rejected credentials
    #[error("Backend rejected credentials: {0}")]
    AuthenticationError(String),
}

impl ProviderError {
    /// HTTP-style status code carried by this error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ProviderError::ApiError { status_code, .. } => Some(*status_code),
            ProviderError::RateLimitExceeded(_) => Some(429),
            _ => None,
        }
    }
}

/// Errors that can occur while persisting or loading projects
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// No project with that id exists
    #[error("Project not found: {0}")]
    NotFound(String),

    /// The underlying database failed
    #[error("Database error: {0}")]
    Database(String),

    /// A stored payload could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Filesystem failure (backups)
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Database(error.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

/// Errors that end a translation run or a single translation request
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranslationError {
    /// Missing model id, language or credentials; never retried
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A transient failure that outlived the retry policy
    #[error("Translation service still failing after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// Number of attempts made
        attempts: u32,
        /// Last error reported by the backend
        source: ProviderError,
    },

    /// A non-retryable backend failure
    #[error("Translation failed: {0}")]
    Permanent(ProviderError),

    /// The backend returned a different number of results than requested
    #[error("Response length mismatch: expected {expected} translations, got {actual}")]
    LengthMismatch {
        /// Number of texts sent
        expected: usize,
        /// Number of texts received
        actual: usize,
    },

    /// Another run already holds this project
    #[error("Project {0} already has a translation run in progress")]
    ProjectBusy(String),

    /// The request names a block that does not exist or is malformed
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Persisting progress failed
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl TranslationError {
    /// Whether the failure came from the backend rather than local state
    pub fn is_service_error(&self) -> bool {
        matches!(
            self,
            TranslationError::RetriesExhausted { .. }
                | TranslationError::Permanent(_)
                | TranslationError::LengthMismatch { .. }
        )
    }
}

/// Error surfaced by the `fictrans` binary
#[derive(Error, Debug)]
pub enum AppError {
    #[error("I/O failure: {0}")]
    File(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Translation(#[from] TranslationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(format!("{:#}", error))
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
