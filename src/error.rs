use thiserror::Error;

/// Error taxonomy for the core.
///
/// Configuration problems are fatal at startup and never produced per
/// request. Transient provider errors are retried inside the owning
/// component; once retries are exhausted they escalate to permanent.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("transient provider error: {0}")]
    TransientProvider(String),

    #[error("provider error: {0}")]
    PermanentProvider(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Error surfaced by an external AI provider call.
///
/// Providers only distinguish retryable from non-retryable failures; the
/// retry layer owns backoff and escalation.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("transient: {0}")]
    Transient(String),

    #[error("permanent: {0}")]
    Permanent(String),
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transient(_))
    }
}

impl From<ProviderError> for CoreError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Transient(msg) => CoreError::TransientProvider(msg),
            ProviderError::Permanent(msg) => CoreError::PermanentProvider(msg),
        }
    }
}
