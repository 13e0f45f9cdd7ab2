use thiserror::Error;

/// Failures of the authorization-code flow.
///
/// Messages never contain tokens, codes, state values, or the client secret.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Authorization code missing from callback")]
    MissingCode,

    #[error("Returned state does not match the pending authorization")]
    StateMismatch,

    #[error("Token exchange failed: {0}")]
    ExchangeFailed(String),

    #[error("Authorization denied by provider: {0}")]
    AuthorizationDenied(String),

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Not authenticated")]
    NotAuthenticated,
}

impl AuthError {
    /// Every variant is recovered the same way: start a new authorization.
    /// Only a state mismatch hints at a forged or replayed redirect.
    pub fn is_suspicious(&self) -> bool {
        matches!(self, AuthError::StateMismatch)
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
