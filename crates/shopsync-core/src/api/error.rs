//! Typed error taxonomy for the transport client

use thiserror::Error;

/// Errors raised at the transport client boundary.
///
/// Network-level retries happen below this layer; by the time an `ApiError`
/// surfaces, the retry budget for transient failures is already spent.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport or timeout failure after exhausting retries
    #[error("Network error: {0}")]
    Network(String),

    /// HTTP 401/403: host reachable, credentials rejected
    #[error("Authentication failed (HTTP {status})")]
    Auth { status: u16 },

    /// HTTP 404
    #[error("Resource not found (HTTP 404)")]
    NotFound,

    /// HTTP 429, still failing after retries
    #[error("Rate limited (HTTP 429)")]
    RateLimited { retry_after: Option<u64> },

    /// Any other HTTP status >= 400
    #[error("API request failed (HTTP {status})")]
    Http {
        status: u16,
        body: Option<serde_json::Value>,
    },

    /// 2xx response whose body did not parse as the expected shape
    #[error("Invalid response payload: {0}")]
    Decode(String),

    /// Client construction rejected the configuration
    #[error("Invalid client configuration: {0}")]
    InvalidConfiguration(String),
}

impl ApiError {
    /// Whether this error indicates rejected credentials / missing scope.
    ///
    /// Callers branch on this instead of matching on message text.
    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }
}
