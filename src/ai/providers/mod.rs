// Concrete AI providers. The vendor is picked once at startup from
// configuration; everything downstream talks to the `LlmProvider` and
// `EmbeddingProvider` traits.

pub mod google;
pub mod openai;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use crate::ai::{EmbeddingProvider, LlmProvider};
use crate::config::{Config, ProviderKind};
use crate::error::{CoreError, CoreResult, ProviderError};

pub use google::GoogleProvider;
pub use openai::OpenAiProvider;

/// Shared HTTP client builder; every outbound provider call carries a
/// timeout so nothing blocks a grading or query path indefinitely.
pub(crate) fn build_http_client(timeout_secs: u64) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ProviderError::Permanent(format!("failed to build HTTP client: {}", e)))
}

/// Classify an outbound request failure. Network and timeout problems are
/// retryable; anything else at this layer is not.
pub(crate) fn classify_request_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() || err.is_connect() {
        ProviderError::Transient(format!("request failed: {}", err))
    } else {
        ProviderError::Permanent(format!("request failed: {}", err))
    }
}

/// Classify a non-success HTTP status. Rate limits and server-side errors
/// are retryable; client errors are permanent.
pub(crate) fn classify_status(status: reqwest::StatusCode, body: &str) -> ProviderError {
    if status.as_u16() == 429 || status.is_server_error() {
        ProviderError::Transient(format!("provider returned {}: {}", status, body))
    } else {
        ProviderError::Permanent(format!("provider returned {}: {}", status, body))
    }
}

/// Instantiate the configured provider pair. This is the only place that
/// branches on the provider kind.
pub fn create_providers(
    config: &Config,
) -> CoreResult<(Arc<dyn LlmProvider>, Arc<dyn EmbeddingProvider>)> {
    match config.provider {
        ProviderKind::OpenAi => {
            let provider = Arc::new(
                OpenAiProvider::new(
                    config.api_key.clone(),
                    None,
                    config.llm_model.clone(),
                    config.embedding_model.clone(),
                    config.embedding_dimensions,
                    config.request_timeout_secs,
                )
                .map_err(|e| CoreError::Configuration(e.to_string()))?,
            );
            Ok((provider.clone(), provider))
        }
        ProviderKind::Google => {
            let provider = Arc::new(
                GoogleProvider::new(
                    config.api_key.clone(),
                    None,
                    config.llm_model.clone(),
                    config.embedding_model.clone(),
                    config.embedding_dimensions,
                    config.request_timeout_secs,
                )
                .map_err(|e| CoreError::Configuration(e.to_string()))?,
            );
            Ok((provider.clone(), provider))
        }
    }
}
