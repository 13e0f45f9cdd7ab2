//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop and server hosts.
//!
//! - `HttpClient` using `reqwest` with rustls
//! - `SettingsStore` backed by process memory
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{MemorySettingsStore, ReqwestHttpClient};
//! use std::time::Duration;
//!
//! let http_client = ReqwestHttpClient::with_timeout(Duration::from_secs(30));
//! let settings = MemorySettingsStore::new();
//! ```

mod http;
mod settings;

pub use http::ReqwestHttpClient;
pub use settings::MemorySettingsStore;
