//! Instellingen: per-session preferences.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use core_service::UserSettings;

use crate::error::AppError;
use crate::sessions::BrowserSession;
use crate::state::AppState;

/// `GET /instellingen`
pub async fn show(browser: BrowserSession, State(state): State<AppState>) -> Response {
    let result = state
        .service
        .settings(&browser.session)
        .await
        .map(Json)
        .map_err(AppError::from);
    (browser.jar, result).into_response()
}

/// `POST /instellingen`: replace the stored preferences, echoing what was saved.
pub async fn update(
    browser: BrowserSession,
    State(state): State<AppState>,
    Json(settings): Json<UserSettings>,
) -> Response {
    let result = state
        .service
        .update_settings(&browser.session, &settings)
        .await
        .map(|()| Json(settings))
        .map_err(AppError::from);
    (browser.jar, result).into_response()
}
