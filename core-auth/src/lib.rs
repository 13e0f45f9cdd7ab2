//! # Authentication Module
//!
//! OAuth 2.0 authorization-code flow for a single browser session.
//!
//! ## Overview
//!
//! An [`AuthSession`] issues an authorization link, validates the redirect
//! that comes back, exchanges the one-shot code for a [`Credential`] and keeps
//! that credential fresh. Hosting surfaces drive it through
//! [`AuthSession::dispatch`], which maps a request's query parameters to an
//! [`AuthAction`].
//!
//! ## Features
//!
//! - CSRF state compared in constant time, consumed on every callback
//! - PKCE (S256) on every authorization
//! - Bounded token exchange, never retried
//! - Refresh shortly before expiry
//! - Auth state event emission

pub mod dispatch;
pub mod error;
pub mod oauth;
pub mod session;
pub mod types;

pub use dispatch::{strip_callback_params, AuthAction, AuthRequest, CALLBACK_PARAMS};
pub use error::{AuthError, Result};
pub use session::AuthSession;
pub use types::{AuthRequestState, AuthState, AuthorizationDirective, Credential};
