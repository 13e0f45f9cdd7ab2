//! Error types for the Google Drive gateway

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Failures of a single gateway call.
///
/// Every variant is recoverable by the user. `Unauthorized` additionally means
/// the session's credential is no longer accepted and must be dropped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Rejected before any remote call
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Credential expired locally or refused by the remote API
    #[error("Not authorized to access Google Drive")]
    Unauthorized,

    #[error("File not found: {file_id}")]
    NotFound { file_id: String },

    #[error("Google Drive request timed out")]
    Timeout,

    /// Any other non-2xx answer. `message` is the API's own error message.
    #[error("Google Drive API error (status {status}): {message}")]
    RemoteFailure { status: u16, message: String },

    #[error("Failed to parse API response: {0}")]
    Parse(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl GatewayError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, GatewayError::Unauthorized)
    }
}

impl From<BridgeError> for GatewayError {
    fn from(error: BridgeError) -> Self {
        match error {
            BridgeError::Timeout(_) => GatewayError::Timeout,
            other => GatewayError::Network(other.to_string()),
        }
    }
}

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;
