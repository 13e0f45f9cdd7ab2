//! # Core Runtime Module
//!
//! Foundational infrastructure shared by the other crates:
//! - Configuration (`ClientConfig` from client-secrets JSON, `AppConfig` builder)
//! - Logging and tracing setup with secret redaction helpers
//! - Event bus for auth and session notifications

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{AppConfig, AppConfigBuilder, ClientConfig};
pub use error::{ConfigError, Error, Result};
