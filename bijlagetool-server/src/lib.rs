//! Bijlagetool web server: Google sign-in and Drive attachments over HTTP.

pub mod audit;
pub mod cli;
pub mod error;
pub mod routes;
pub mod sessions;
pub mod state;

pub use routes::app;
pub use state::AppState;
