//! Gateway error types.

use thiserror::Error;

use crate::resilience::RetriesExhausted;
use crate::upstream::UpstreamError;

/// Errors that end a profile request.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Client exceeded its request window.
    #[error("rate limit exceeded for {client}")]
    RateLimited { client: String },

    /// The user service could not be resolved after retries.
    #[error("user {id} not found or service unavailable: {source}")]
    UpstreamUnavailable {
        id: String,
        #[source]
        source: RetriesExhausted<UpstreamError>,
    },

    /// Composite response could not be encoded.
    #[error("failed to serialize profile: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;
