//! # Configuration
//!
//! Two layers:
//!
//! - [`ClientConfig`]: the OAuth client registration, loaded once at startup
//!   from a Google client-secrets document and immutable afterwards.
//! - [`AppConfig`]: everything the service needs at runtime, assembled with a
//!   builder that enforces fail-fast validation of required bridges.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{AppConfig, ClientConfig};
//!
//! let client = ClientConfig::from_file("client_secret.json")?;
//! let config = AppConfig::builder()
//!     .client(client)
//!     .default_page_size(50)
//!     .build()?;
//! ```
//!
//! With the `desktop-shims` feature, `HttpClient` and `SettingsStore` fall
//! back to the `bridge-desktop` implementations when not injected. Without
//! it, a missing bridge is reported as [`Error::CapabilityMissing`].

use crate::error::{ConfigError, Error, Result};
use bridge_traits::{Clock, HttpClient, SettingsStore, SystemClock};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Least-privilege scope that still allows search and download.
pub const DRIVE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";

/// Drive v3 REST base URL.
pub const DEFAULT_DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_EXCHANGE_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const MAX_PAGE_SIZE: u32 = 1000;
pub const DEFAULT_SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(8 * 60 * 60);

// ============================================================================
// ClientConfig
// ============================================================================

/// OAuth client registration.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub client_id: String,
    pub client_secret: String,
    pub auth_uri: Url,
    pub token_uri: Url,
    pub redirect_uri: Url,
    pub scopes: Vec<String>,
}

/// On-disk shape. Google wraps the registration in either `web` or
/// `installed` depending on the client type.
#[derive(Deserialize)]
struct ClientSecretsFile {
    web: Option<RawClientConfig>,
    installed: Option<RawClientConfig>,
}

#[derive(Deserialize)]
struct RawClientConfig {
    client_id: Option<String>,
    client_secret: Option<String>,
    auth_uri: Option<String>,
    token_uri: Option<String>,
    #[serde(default)]
    redirect_uris: Vec<String>,
}

fn required(value: Option<String>, field: &str) -> std::result::Result<String, ConfigError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingField(field.to_string()))
}

fn parse_url(value: &str, field: &str) -> std::result::Result<Url, ConfigError> {
    Url::parse(value).map_err(|_| ConfigError::InvalidUrl {
        field: field.to_string(),
    })
}

impl ClientConfig {
    /// Parse a client-secrets JSON document.
    ///
    /// Accepts `{"web": {...}}`, `{"installed": {...}}`, or the bare inner
    /// object. The first entry of `redirect_uris` becomes the redirect URI.
    pub fn from_json_str(json: &str) -> std::result::Result<Self, ConfigError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| ConfigError::Malformed(e.to_string()))?;

        let raw = if value.get("web").is_some() || value.get("installed").is_some() {
            let file: ClientSecretsFile = serde_json::from_value(value)
                .map_err(|e| ConfigError::Malformed(e.to_string()))?;
            file.web
                .or(file.installed)
                .ok_or_else(|| ConfigError::MissingField("web".to_string()))?
        } else {
            serde_json::from_value(value).map_err(|e| ConfigError::Malformed(e.to_string()))?
        };

        Self::from_raw(raw)
    }

    /// Read and parse a client-secrets file.
    pub fn from_file(path: impl AsRef<Path>) -> std::result::Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json_str(&contents)
    }

    fn from_raw(raw: RawClientConfig) -> std::result::Result<Self, ConfigError> {
        let client_id = required(raw.client_id, "client_id")?;
        let client_secret = required(raw.client_secret, "client_secret")?;
        let auth_uri = required(raw.auth_uri, "auth_uri")?;
        let token_uri = required(raw.token_uri, "token_uri")?;
        let redirect_uri = required(raw.redirect_uris.into_iter().next(), "redirect_uris[0]")?;

        let config = Self {
            client_id,
            client_secret,
            auth_uri: parse_url(&auth_uri, "auth_uri")?,
            token_uri: parse_url(&token_uri, "token_uri")?,
            redirect_uri: parse_url(&redirect_uri, "redirect_uris[0]")?,
            scopes: vec![DRIVE_READONLY_SCOPE.to_string()],
        };
        config.validate()?;
        Ok(config)
    }

    /// Replace the requested scopes.
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Override the redirect URI taken from the document.
    pub fn with_redirect_uri(mut self, redirect_uri: &str) -> std::result::Result<Self, ConfigError> {
        self.redirect_uri = parse_url(redirect_uri, "redirect_uri")?;
        Ok(self)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.client_id.is_empty() {
            return Err(ConfigError::MissingField("client_id".to_string()));
        }
        if self.client_secret.is_empty() {
            return Err(ConfigError::MissingField("client_secret".to_string()));
        }
        if self.scopes.is_empty() {
            return Err(ConfigError::MissingField("scopes".to_string()));
        }
        for (field, url) in [
            ("auth_uri", &self.auth_uri),
            ("token_uri", &self.token_uri),
            ("redirect_uri", &self.redirect_uri),
        ] {
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::InvalidUrl {
                    field: field.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("auth_uri", &self.auth_uri.as_str())
            .field("token_uri", &self.token_uri.as_str())
            .field("redirect_uri", &self.redirect_uri.as_str())
            .field("scopes", &self.scopes)
            .finish()
    }
}

// ============================================================================
// AppConfig
// ============================================================================

/// Runtime configuration for the service.
#[derive(Clone)]
pub struct AppConfig {
    pub client: ClientConfig,

    /// HTTP client for the token endpoint and the Drive API
    pub http_client: Arc<dyn HttpClient>,

    /// User preferences storage
    pub settings_store: Arc<dyn SettingsStore>,

    /// Time source for expiry checks
    pub clock: Arc<dyn Clock>,

    /// Per-request timeout for Drive calls
    pub request_timeout: Duration,

    /// Upper bound on the authorization-code exchange
    pub exchange_timeout: Duration,

    /// Page size used by the overview when the caller gives none
    pub default_page_size: u32,

    /// Idle time after which the host drops a browser session
    pub session_idle_timeout: Duration,

    pub drive_api_base: String,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("client", &self.client)
            .field("http_client", &"HttpClient { ... }")
            .field("settings_store", &"SettingsStore { ... }")
            .field("request_timeout", &self.request_timeout)
            .field("exchange_timeout", &self.exchange_timeout)
            .field("default_page_size", &self.default_page_size)
            .field("session_idle_timeout", &self.session_idle_timeout)
            .field("drive_api_base", &self.drive_api_base)
            .finish()
    }
}

impl AppConfig {
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Checks value ranges. Bridges are already guaranteed by the builder.
    pub fn validate(&self) -> Result<()> {
        self.client.validate()?;

        if self.request_timeout.is_zero() {
            return Err(invalid("request_timeout", "must be greater than zero"));
        }
        if self.exchange_timeout.is_zero() {
            return Err(invalid("exchange_timeout", "must be greater than zero"));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.default_page_size) {
            return Err(invalid(
                "default_page_size",
                &format!("must be between 1 and {}", MAX_PAGE_SIZE),
            ));
        }
        if self.session_idle_timeout.is_zero() {
            return Err(invalid("session_idle_timeout", "must be greater than zero"));
        }
        Url::parse(&self.drive_api_base).map_err(|_| ConfigError::InvalidUrl {
            field: "drive_api_base".to_string(),
        })?;

        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> Error {
    Error::Config(ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    })
}

#[cfg(not(feature = "desktop-shims"))]
fn capability_missing(capability: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: format!(
            "No {} implementation provided. Enable the 'desktop-shims' feature \
             or inject one through the builder.",
            capability
        ),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::with_timeout(timeout));
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(_timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    Err(capability_missing("HttpClient"))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_settings_store() -> Result<Arc<dyn SettingsStore>> {
    use bridge_desktop::MemorySettingsStore;

    let store: Arc<dyn SettingsStore> = Arc::new(MemorySettingsStore::new());
    Ok(store)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_settings_store() -> Result<Arc<dyn SettingsStore>> {
    Err(capability_missing("SettingsStore"))
}

/// Builder for [`AppConfig`].
#[derive(Default)]
pub struct AppConfigBuilder {
    client: Option<ClientConfig>,
    http_client: Option<Arc<dyn HttpClient>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    clock: Option<Arc<dyn Clock>>,
    request_timeout: Option<Duration>,
    exchange_timeout: Option<Duration>,
    default_page_size: Option<u32>,
    session_idle_timeout: Option<Duration>,
    drive_api_base: Option<String>,
}

impl AppConfigBuilder {
    /// Sets the OAuth client registration (required).
    pub fn client(mut self, client: ClientConfig) -> Self {
        self.client = Some(client);
        self
    }

    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    /// Default: [`SystemClock`]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Default: 30 seconds
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Default: 30 seconds
    pub fn exchange_timeout(mut self, timeout: Duration) -> Self {
        self.exchange_timeout = Some(timeout);
        self
    }

    /// Default: 100. Values above 1000 are capped.
    pub fn default_page_size(mut self, size: u32) -> Self {
        self.default_page_size = Some(size.min(MAX_PAGE_SIZE));
        self
    }

    /// Default: 8 hours
    pub fn session_idle_timeout(mut self, timeout: Duration) -> Self {
        self.session_idle_timeout = Some(timeout);
        self
    }

    /// Point the gateway at another Drive-compatible endpoint.
    pub fn drive_api_base(mut self, base: impl Into<String>) -> Self {
        self.drive_api_base = Some(base.into());
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// - `ConfigError::MissingField("client")` when no client registration was set
    /// - `Error::CapabilityMissing` when a bridge is absent and no default exists
    /// - `ConfigError::InvalidValue` for out-of-range durations or page sizes
    pub fn build(self) -> Result<AppConfig> {
        let client = self
            .client
            .ok_or_else(|| ConfigError::MissingField("client".to_string()))?;

        let request_timeout = self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client(request_timeout)?,
        };

        let settings_store = match self.settings_store {
            Some(store) => store,
            None => provide_default_settings_store()?,
        };

        let config = AppConfig {
            client,
            http_client,
            settings_store,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            request_timeout,
            exchange_timeout: self.exchange_timeout.unwrap_or(DEFAULT_EXCHANGE_TIMEOUT),
            default_page_size: self.default_page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            session_idle_timeout: self
                .session_idle_timeout
                .unwrap_or(DEFAULT_SESSION_IDLE_TIMEOUT),
            drive_api_base: self
                .drive_api_base
                .unwrap_or_else(|| DEFAULT_DRIVE_API_BASE.to_string()),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::{
        error::Result as BridgeResult,
        http::{HttpRequest, HttpResponse, HttpStreamResponse},
        BridgeError,
    };

    const WEB_SECRETS: &str = r#"{
        "web": {
            "client_id": "abc.apps.googleusercontent.com",
            "project_id": "bijlagetool",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": "https://oauth2.googleapis.com/token",
            "client_secret": "very-secret-value",
            "redirect_uris": ["https://bijlagetool.example/", "http://localhost:8501/"]
        }
    }"#;

    struct UnusedHttpClient;

    #[async_trait]
    impl HttpClient for UnusedHttpClient {
        async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
            Err(BridgeError::NotAvailable("test".to_string()))
        }

        async fn execute_stream(&self, _request: HttpRequest) -> BridgeResult<HttpStreamResponse> {
            Err(BridgeError::NotAvailable("test".to_string()))
        }
    }

    struct UnusedSettingsStore;

    #[async_trait]
    impl SettingsStore for UnusedSettingsStore {
        async fn set_string(&self, _key: &str, _value: &str) -> BridgeResult<()> {
            Ok(())
        }

        async fn get_string(&self, _key: &str) -> BridgeResult<Option<String>> {
            Ok(None)
        }

        async fn set_bool(&self, _key: &str, _value: bool) -> BridgeResult<()> {
            Ok(())
        }

        async fn get_bool(&self, _key: &str) -> BridgeResult<Option<bool>> {
            Ok(None)
        }

        async fn delete_prefix(&self, _prefix: &str) -> BridgeResult<()> {
            Ok(())
        }
    }

    fn client() -> ClientConfig {
        ClientConfig::from_json_str(WEB_SECRETS).unwrap()
    }

    fn builder_with_bridges() -> AppConfigBuilder {
        AppConfig::builder()
            .client(client())
            .http_client(Arc::new(UnusedHttpClient))
            .settings_store(Arc::new(UnusedSettingsStore))
    }

    #[test]
    fn test_parse_web_client_secrets() {
        let config = client();

        assert_eq!(config.client_id, "abc.apps.googleusercontent.com");
        assert_eq!(config.client_secret, "very-secret-value");
        assert_eq!(config.token_uri.as_str(), "https://oauth2.googleapis.com/token");
        assert_eq!(config.redirect_uri.as_str(), "https://bijlagetool.example/");
        assert_eq!(config.scopes, vec![DRIVE_READONLY_SCOPE.to_string()]);
    }

    #[test]
    fn test_parse_installed_and_bare_documents() {
        let installed = WEB_SECRETS.replace("\"web\"", "\"installed\"");
        assert_eq!(ClientConfig::from_json_str(&installed).unwrap(), client());

        let bare: serde_json::Value = serde_json::from_str(WEB_SECRETS).unwrap();
        let bare = bare["web"].to_string();
        assert_eq!(ClientConfig::from_json_str(&bare).unwrap(), client());
    }

    #[test]
    fn test_missing_fields_are_named() {
        let without_secret = WEB_SECRETS.replace("\"client_secret\": \"very-secret-value\",", "");
        assert_eq!(
            ClientConfig::from_json_str(&without_secret).unwrap_err(),
            ConfigError::MissingField("client_secret".to_string())
        );

        let without_redirect = WEB_SECRETS.replace(
            "[\"https://bijlagetool.example/\", \"http://localhost:8501/\"]",
            "[]",
        );
        assert_eq!(
            ClientConfig::from_json_str(&without_redirect).unwrap_err(),
            ConfigError::MissingField("redirect_uris[0]".to_string())
        );
    }

    #[test]
    fn test_invalid_url_and_malformed_json() {
        let bad_url = WEB_SECRETS.replace("https://oauth2.googleapis.com/token", "not a url");
        assert_eq!(
            ClientConfig::from_json_str(&bad_url).unwrap_err(),
            ConfigError::InvalidUrl {
                field: "token_uri".to_string()
            }
        );

        assert!(matches!(
            ClientConfig::from_json_str("{ web: ").unwrap_err(),
            ConfigError::Malformed(_)
        ));
    }

    #[test]
    fn test_unreadable_file() {
        let err = ClientConfig::from_file("/nonexistent/bijlagetool/client_secret.json").unwrap_err();
        assert!(matches!(err, ConfigError::Unreadable { .. }));
    }

    #[test]
    fn test_debug_hides_client_secret() {
        let debug = format!("{:?}", client());
        assert!(!debug.contains("very-secret-value"));
        assert!(debug.contains("[REDACTED]"));
        assert!(debug.contains("abc.apps.googleusercontent.com"));
    }

    #[test]
    fn test_overrides() {
        let config = client()
            .with_scopes(["https://www.googleapis.com/auth/drive.file"])
            .with_redirect_uri("https://x/")
            .unwrap();

        assert_eq!(config.scopes, vec!["https://www.googleapis.com/auth/drive.file"]);
        assert_eq!(config.redirect_uri.as_str(), "https://x/");
        assert!(client().with_redirect_uri("::").is_err());
    }

    #[test]
    fn test_builder_defaults() {
        let config = builder_with_bridges().build().unwrap();

        assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(config.exchange_timeout, DEFAULT_EXCHANGE_TIMEOUT);
        assert_eq!(config.default_page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.session_idle_timeout, DEFAULT_SESSION_IDLE_TIMEOUT);
        assert_eq!(config.drive_api_base, DEFAULT_DRIVE_API_BASE);
    }

    #[test]
    fn test_builder_caps_page_size() {
        let config = builder_with_bridges().default_page_size(5000).build().unwrap();
        assert_eq!(config.default_page_size, MAX_PAGE_SIZE);

        let err = builder_with_bridges().default_page_size(0).build().unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue { ref field, .. }) if field == "default_page_size"
        ));
    }

    #[test]
    fn test_builder_requires_client() {
        let err = AppConfig::builder()
            .http_client(Arc::new(UnusedHttpClient))
            .settings_store(Arc::new(UnusedSettingsStore))
            .build()
            .unwrap_err();

        assert!(matches!(err, Error::Config(ConfigError::MissingField(ref f)) if f == "client"));
    }

    #[test]
    fn test_builder_rejects_zero_timeout() {
        let err = builder_with_bridges()
            .exchange_timeout(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::InvalidValue { .. })));
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_missing_bridge_is_reported() {
        let err = AppConfig::builder().client(client()).build().unwrap_err();
        assert!(matches!(
            err,
            Error::CapabilityMissing { ref capability, .. } if capability == "HttpClient"
        ));
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_desktop_defaults_fill_missing_bridges() {
        let config = AppConfig::builder().client(client()).build().unwrap();
        let debug = format!("{:?}", config);
        assert!(debug.contains("HttpClient { ... }"));
        assert!(!debug.contains("very-secret-value"));
    }
}
