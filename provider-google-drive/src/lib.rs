//! # Google Drive Provider
//!
//! Implements the [`FileGateway`] contract for Google Drive API v3.
//!
//! ## Overview
//!
//! This module provides:
//! - Name search and recent-files listing
//! - File metadata lookup
//! - Streaming downloads
//! - Status mapping onto [`GatewayError`] (401 means the credential is gone)

pub mod connector;
pub mod error;
pub mod gateway;
pub mod query;
pub mod types;

pub use connector::DriveGateway;
pub use error::{GatewayError, Result};
pub use gateway::{FileGateway, FileStream};
pub use types::FileRecord;
