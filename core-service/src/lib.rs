//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (HTTP, settings,
//! clock) together with the authorization flow and the Drive gateway. Desktop
//! hosts typically enable the `desktop-shims` feature (which depends on
//! `bridge-desktop`) and call [`bootstrap_desktop`].

pub mod error;
pub mod service;
pub mod settings;

pub use error::{CoreError, Result};
pub use service::CoreService;
pub use settings::UserSettings;

pub use core_auth::{AuthAction, AuthRequest, AuthSession, AuthState, AuthorizationDirective};
pub use provider_google_drive::{FileRecord, FileStream, GatewayError};

/// Convenience bootstrapper for desktop hosts.
///
/// Missing bridges are filled with the desktop defaults.
///
/// ```no_run
/// # #[cfg(feature = "desktop-shims")]
/// # fn example() -> core_service::Result<()> {
/// use core_runtime::ClientConfig;
///
/// let client = ClientConfig::from_file("client_secret.json")
///     .map_err(core_runtime::Error::from)?;
/// let core = core_service::bootstrap_desktop(client)?;
/// let session = core.new_session();
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "desktop-shims")]
pub fn bootstrap_desktop(client: core_runtime::ClientConfig) -> Result<CoreService> {
    let config = core_runtime::AppConfig::builder()
        .client(client)
        .build()
        .map_err(|err| CoreError::InitializationFailed(err.to_string()))?;
    Ok(CoreService::new(config))
}
