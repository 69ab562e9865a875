//! # Gateway Error Types
//!
//! Errors that can occur when talking to the payment gateway.
//!
//! ## Propagation
//! The engine collapses everything except `IntentNotFound` into its generic
//! gateway-unavailable surface: retry policy belongs to the caller, never to
//! the core.

use thiserror::Error;

/// Errors from the payment gateway client.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Missing gateway credentials.
    #[error("Missing ORDERFLOW_GATEWAY_SECRET environment variable")]
    MissingSecret,

    /// HTTP request failed (network, DNS, TLS, timeout).
    #[error("Gateway request failed: {0}")]
    RequestFailed(String),

    /// Response body could not be parsed.
    #[error("Gateway response parsing failed: {0}")]
    ResponseParseFailed(String),

    /// The gateway does not know this intent id.
    #[error("Payment intent not found: {0}")]
    IntentNotFound(String),

    /// Gateway credentials were rejected.
    #[error("Gateway rejected credentials")]
    Unauthorized,

    /// The gateway returned an error response.
    #[error("Gateway error (status {status}): {message}")]
    Api { status: u16, message: String },
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;
