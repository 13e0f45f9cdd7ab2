//! Umbrella crate for the Bijlagetool workspace.
//!
//! Embedders that want the service façade without the web server depend on
//! this crate; the `desktop-shims` feature brings in `core-service` with the
//! reqwest HTTP client and in-memory settings store.

#[cfg(feature = "desktop-shims")]
pub use core_service;
