//! HTTP surface: the four pages plus the OAuth endpoints.
//!
//! Responses are JSON; presentation is up to the front end.

use axum::body::Body;
use axum::http::Request;
use axum::routing::{get, post};
use axum::Router;
use core_runtime::logging::redact_query;
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::state::AppState;

pub mod auth;
pub mod files;
pub mod settings;

pub const APP_TITLE: &str = "Bijlagetool";
pub const MENU: [&str; 4] = ["Home", "Zoeken", "Overzicht", "Instellingen"];
pub const FOOTER: &str = "© 2023 Bijlagetool | Veldhuis Advies";

pub const CALLBACK_PATH: &str = "/auth/callback";

const FIXED_PATHS: &[&str] = &[
    "/",
    "/auth/login",
    CALLBACK_PATH,
    "/auth/logout",
    "/zoeken",
    "/overzicht",
    "/instellingen",
];

/// Common page chrome.
#[derive(Debug, Serialize)]
pub struct Layout {
    pub title: &'static str,
    pub menu: [&'static str; 4],
    pub footer: &'static str,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            title: APP_TITLE,
            menu: MENU,
            footer: FOOTER,
        }
    }
}

/// Build the application router with all routes
pub fn app(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/", get(auth::home))
        .route("/auth/login", get(auth::login))
        .route(CALLBACK_PATH, get(auth::callback))
        .route("/auth/logout", post(auth::logout))
        .route("/zoeken", get(files::search))
        .route("/overzicht", get(files::overview))
        .route("/bestanden/{id}", get(files::metadata))
        .route("/bestanden/{id}/download", get(files::download))
        .route("/instellingen", get(settings::show).post(settings::update));

    // The registered redirect URI may point somewhere else entirely
    let redirect_path = state.service.config().client.redirect_uri.path().to_string();
    if !FIXED_PATHS.contains(&redirect_path.as_str()) {
        if redirect_path.starts_with("/bestanden/") {
            warn!(path = %redirect_path, "Redirect URI collides with file routes; use /auth/callback");
        } else {
            router = router.route(&redirect_path, get(auth::callback));
        }
    }

    router
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %redact_query(&request.uri().to_string()),
                )
            }),
        )
        .with_state(state)
}
