//! Error types for tutor-core.
//!
//! None of these reach the end user: the [`Tutor`](crate::Tutor) recovers
//! every provider failure by falling back to the deterministic engine.

use thiserror::Error;

/// Result type alias using tutor-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while producing a tutor reply.
#[derive(Error, Debug)]
pub enum Error {
    /// Remote provider returned an error response
    #[error("LLM API error: {provider} - {message}")]
    LlmApi { provider: String, message: String },

    /// Transport or decoding failure talking to the provider
    #[error("LLM error: {0}")]
    LLM(String),

    /// Remote call exceeded its deadline
    #[error("Operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// No remote provider is usable right now
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Image payload could not be decoded
    #[error("Invalid image payload: {0}")]
    InvalidImage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an LLM API error.
    pub fn llm_api(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LlmApi {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Create a provider unavailable error.
    pub fn provider_unavailable(reason: impl Into<String>) -> Self {
        Self::ProviderUnavailable(reason.into())
    }
}
