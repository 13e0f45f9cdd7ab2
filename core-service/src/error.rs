use core_auth::{AuthError, AuthorizationDirective};
use provider_google_drive::GatewayError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error(transparent)]
    Config(#[from] core_runtime::Error),

    /// No usable credential. Carries a fresh link for the user to follow.
    #[error("Authentication required")]
    AuthenticationRequired(AuthorizationDirective),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Invalid setting `{field}`: {message}")]
    InvalidSetting { field: String, message: String },

    #[error("Settings storage failed: {0}")]
    Settings(#[from] bridge_traits::BridgeError),
}

impl CoreError {
    /// Whether the user has to (re)authorize before retrying.
    pub fn requires_authentication(&self) -> bool {
        matches!(
            self,
            CoreError::AuthenticationRequired(_)
                | CoreError::Gateway(GatewayError::Unauthorized)
        )
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
