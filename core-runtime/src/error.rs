use thiserror::Error;

/// Problems with the OAuth client configuration. All of them are fatal at
/// startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Client configuration is missing required field `{0}`")]
    MissingField(String),

    #[error("Client configuration field `{field}` is not a valid URL")]
    InvalidUrl { field: String },

    #[error("Client configuration is malformed: {0}")]
    Malformed(String),

    #[error("Client configuration could not be read from {path}: {reason}")]
    Unreadable { path: String, reason: String },

    #[error("Invalid setting `{field}`: {message}")]
    InvalidValue { field: String, message: String },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
