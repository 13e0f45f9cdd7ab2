//! # Host Bridge Traits
//!
//! Capability traits the core relies on but does not implement itself.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Async HTTP with buffered and streamed bodies
//! - [`SettingsStore`](storage::SettingsStore) - Key-value preferences storage
//! - [`Clock`](time::Clock) - Time source for deterministic expiry checks
//!
//! The desktop implementations live in `bridge-desktop`. Tests swap in
//! `mockall` doubles or [`ManualClock`](time::ManualClock).
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with a descriptive error when a required capability
//! has not been injected:
//!
//! ```ignore
//! let http_client = config.http_client
//!     .ok_or_else(|| Error::CapabilityMissing {
//!         capability: "HttpClient".to_string(),
//!         message: "No HTTP client implementation provided".to_string(),
//!     })?;
//! ```
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! convert their platform errors into it and keep timeouts distinguishable
//! through [`BridgeError::Timeout`].
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so they can be shared across
//! async tasks behind an `Arc`.

pub mod error;
pub mod http;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{ByteStream, HttpClient, HttpMethod, HttpRequest, HttpResponse, HttpStreamResponse};
pub use storage::SettingsStore;
pub use time::{Clock, LogLevel, ManualClock, SystemClock};
