//! Error types for coco-llm

use thiserror::Error;

/// Provider error
///
/// Every variant is either retryable (transient: rate limits, overload,
/// server faults, network trouble) or fatal (configuration, auth, bad
/// request, unparseable response). See [`Error::is_retryable`].
#[derive(Debug, Error)]
pub enum Error {
    /// Provider not configured
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    /// Authentication rejected by the provider
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Request rejected as invalid
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Rate limit exceeded
    #[error("rate limit exceeded")]
    RateLimit,

    /// Provider temporarily overloaded
    #[error("provider overloaded")]
    Overloaded,

    /// Server-side failure
    #[error("server error (HTTP {status}): {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Sanitized message
        message: String,
    },

    /// Network error
    #[error("network error: {0}")]
    Network(String),

    /// Timeout
    #[error("timeout after {0}ms")]
    Timeout(u64),

    /// Invalid response
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl Error {
    /// Whether retrying the same request may succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimit
                | Self::Overloaded
                | Self::Server { .. }
                | Self::Network(_)
                | Self::Timeout(_)
        )
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
