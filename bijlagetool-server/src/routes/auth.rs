//! Sign-in, the provider callback, and sign-out.

use axum::extract::{RawQuery, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use core_auth::{strip_callback_params, AuthError};
use core_runtime::logging::redact_if_sensitive;
use core_service::{AuthAction, AuthRequest};
use serde::Serialize;
use tracing::{debug, info};

use super::Layout;
use crate::sessions::BrowserSession;
use crate::state::AppState;

/// Query key carrying a failed callback's outcome back to the home page.
const AUTH_ERROR_PARAM: &str = "auth_error";

#[derive(Debug, Serialize)]
pub struct Notice {
    pub code: String,
    pub message: &'static str,
}

impl Notice {
    fn for_code(code: &str) -> Self {
        let message = match code {
            "missing_code" => "De terugkoppeling van Google bevatte geen autorisatiecode.",
            "state_mismatch" => {
                "De aanmelding kon niet worden geverifieerd. Probeer opnieuw in te loggen."
            }
            "exchange_failed" => "Het ophalen van de toegangssleutel is mislukt.",
            "authorization_denied" => "Toegang tot Google Drive is geweigerd.",
            _ => "Inloggen is mislukt.",
        };
        Self {
            code: code.to_string(),
            message,
        }
    }
}

fn auth_error_code(err: &AuthError) -> &'static str {
    match err {
        AuthError::MissingCode => "missing_code",
        AuthError::StateMismatch => "state_mismatch",
        AuthError::ExchangeFailed(_) => "exchange_failed",
        AuthError::AuthorizationDenied(_) => "authorization_denied",
        AuthError::RefreshFailed(_) | AuthError::NotAuthenticated => "not_authenticated",
    }
}

/// Home page state.
#[derive(Debug, Serialize)]
pub struct HomePage {
    #[serde(flatten)]
    pub layout: Layout,
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_url: Option<String>,
    pub scopes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
}

/// Where to send the browser once a callback has been handled.
///
/// Callback parameters are dropped so a reload cannot replay them; anything
/// else in the query survives.
fn after_callback(raw_query: &str, action: &AuthAction) -> String {
    let mut kept: Vec<String> = strip_callback_params(raw_query)
        .split('&')
        .filter(|pair| !pair.is_empty() && !pair.starts_with("auth_error="))
        .map(str::to_string)
        .collect();

    if let AuthAction::Error(err) = action {
        kept.push(format!("{}={}", AUTH_ERROR_PARAM, auth_error_code(err)));
    }

    if kept.is_empty() {
        "/".to_string()
    } else {
        format!("/?{}", kept.join("&"))
    }
}

async fn finish_callback(browser: BrowserSession, state: &AppState, raw_query: &str) -> Response {
    let request = AuthRequest::from_query(raw_query);

    let mut params: Vec<String> = request
        .query_params
        .iter()
        .map(|(key, value)| format!("{}={}", key, redact_if_sensitive(key, value)))
        .collect();
    params.sort();
    debug!(session_id = %browser.session.id(), ?params, "Callback received");

    let action = state.service.authorize(&browser.session, &request).await;

    if let AuthAction::Authenticated { .. } = action {
        info!(session_id = %browser.session.id(), "Callback accepted");
    }

    (browser.jar, Redirect::to(&after_callback(raw_query, &action))).into_response()
}

/// `GET /`: sign-in status, or the OAuth redirect target when the redirect
/// URI points here.
pub async fn home(
    browser: BrowserSession,
    State(state): State<AppState>,
    RawQuery(raw_query): RawQuery,
) -> Response {
    let raw_query = raw_query.unwrap_or_default();
    let request = AuthRequest::from_query(&raw_query);

    if request.is_callback() {
        return finish_callback(browser, &state, &raw_query).await;
    }

    let notice = request.param(AUTH_ERROR_PARAM).map(Notice::for_code);
    let page = match state.service.authorize(&browser.session, &request).await {
        AuthAction::Authenticated { credential, .. } => HomePage {
            layout: Layout::default(),
            authenticated: true,
            auth_url: None,
            scopes: credential.scopes,
            expires_at: credential.expires_at,
            notice,
        },
        AuthAction::ShowAuthLink(directive) => HomePage {
            layout: Layout::default(),
            authenticated: false,
            auth_url: Some(directive.as_str().to_string()),
            scopes: Vec::new(),
            expires_at: None,
            notice,
        },
        AuthAction::Error(err) => HomePage {
            layout: Layout::default(),
            authenticated: false,
            auth_url: None,
            scopes: Vec::new(),
            expires_at: None,
            notice: Some(Notice::for_code(auth_error_code(&err))),
        },
    };

    (browser.jar, Json(page)).into_response()
}

/// `GET /auth/login`: straight to the provider.
pub async fn login(browser: BrowserSession) -> Response {
    let directive = browser.session.begin_authorization().await;
    (browser.jar, Redirect::to(directive.as_str())).into_response()
}

/// `GET /auth/callback`
pub async fn callback(
    browser: BrowserSession,
    State(state): State<AppState>,
    RawQuery(raw_query): RawQuery,
) -> Response {
    let raw_query = raw_query.unwrap_or_default();
    if !AuthRequest::from_query(&raw_query).is_callback() {
        return (browser.jar, Redirect::to("/")).into_response();
    }
    finish_callback(browser, &state, &raw_query).await
}

/// `POST /auth/logout`
pub async fn logout(browser: BrowserSession) -> Response {
    browser.session.clear().await;
    (browser.jar, Redirect::to("/")).into_response()
}
