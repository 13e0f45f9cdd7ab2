//! OAuth 2.0 authorization-code grant with PKCE.
//!
//! Stateless building blocks; [`AuthSession`](crate::AuthSession) owns the
//! state machine around them.
//!
//! - [`build_authorization_request`] turns a client registration and a
//!   pending request state into the provider URL.
//! - [`exchange_code`] trades a one-shot authorization code for a
//!   [`Credential`].
//! - [`refresh_credential`] obtains a fresh access token.
//!
//! # Security
//!
//! - PKCE (RFC 7636, S256) on top of the CSRF state
//! - Nothing secret is logged; error reasons carry only the provider's
//!   error code and description

use crate::error::{AuthError, Result};
use crate::types::{AuthRequestState, Credential};
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use chrono::{DateTime, Duration, Utc};
use core_runtime::config::ClientConfig;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Build the provider authorization URL.
///
/// `client_id`, `redirect_uri` and `state` come first so callers can rely on
/// their position; the fixed parameters request a refresh token and force the
/// consent screen.
///
/// # Examples
///
/// ```
/// use core_auth::{oauth::build_authorization_request, AuthRequestState};
/// use core_runtime::ClientConfig;
///
/// let config = ClientConfig::from_json_str(r#"{"web": {
///     "client_id": "abc",
///     "client_secret": "s",
///     "auth_uri": "https://accounts.google.com/o/oauth2/auth",
///     "token_uri": "https://oauth2.googleapis.com/token",
///     "redirect_uris": ["https://x/"]
/// }}"#).unwrap();
///
/// let url = build_authorization_request(&config, &AuthRequestState::from_parts("S", "v"));
/// assert!(url.as_str().contains("client_id=abc&redirect_uri=https%3A%2F%2Fx%2F&state=S"));
/// ```
pub fn build_authorization_request(config: &ClientConfig, request: &AuthRequestState) -> Url {
    let mut url = config.auth_uri.clone();

    url.query_pairs_mut()
        .append_pair("client_id", &config.client_id)
        .append_pair("redirect_uri", config.redirect_uri.as_str())
        .append_pair("state", request.state())
        .append_pair("response_type", "code")
        .append_pair("scope", &config.scopes.join(" "))
        .append_pair("access_type", "offline")
        .append_pair("prompt", "consent")
        .append_pair("include_granted_scopes", "true")
        .append_pair("code_challenge", &request.code_challenge())
        .append_pair("code_challenge_method", "S256");

    url
}

/// Exchange an authorization code for a credential.
///
/// A single attempt; the caller bounds it with a timeout. The code is
/// single-use at the provider, so a replay comes back as `invalid_grant`.
///
/// # Errors
///
/// `AuthError::ExchangeFailed` for transport errors, non-2xx responses, and
/// unparsable bodies.
#[instrument(skip_all)]
pub async fn exchange_code(
    http_client: &dyn HttpClient,
    config: &ClientConfig,
    code: &str,
    request: &AuthRequestState,
    now: DateTime<Utc>,
) -> Result<Credential> {
    let params = [
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", config.redirect_uri.as_str()),
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
        ("code_verifier", request.verifier()),
    ];

    debug!("Exchanging authorization code for tokens");
    let token = post_token_request(http_client, &config.token_uri, &params)
        .await
        .map_err(AuthError::ExchangeFailed)?;

    info!(expires_in = token.expires_in, "Authorization code exchanged");

    Ok(Credential {
        access_token: token.access_token,
        refresh_token: token.refresh_token,
        token_uri: config.token_uri.clone(),
        client_id: config.client_id.clone(),
        client_secret: config.client_secret.clone(),
        scopes: token
            .scope
            .as_deref()
            .map(split_scopes)
            .unwrap_or_else(|| config.scopes.clone()),
        expires_at: Some(now + Duration::seconds(token.expires_in)),
    })
}

/// Obtain a new access token with the credential's refresh token.
///
/// The provider may omit a new refresh token or scope list; the previous ones
/// are kept in that case.
#[instrument(skip_all)]
pub async fn refresh_credential(
    http_client: &dyn HttpClient,
    credential: &Credential,
    now: DateTime<Utc>,
) -> Result<Credential> {
    let refresh_token = credential
        .refresh_token
        .as_deref()
        .ok_or_else(|| AuthError::RefreshFailed("no refresh token".to_string()))?;

    let params = [
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token),
        ("client_id", credential.client_id.as_str()),
        ("client_secret", credential.client_secret.as_str()),
    ];

    debug!("Refreshing access token");
    let token = post_token_request(http_client, &credential.token_uri, &params)
        .await
        .map_err(AuthError::RefreshFailed)?;

    info!(expires_in = token.expires_in, "Access token refreshed");

    Ok(Credential {
        access_token: token.access_token,
        refresh_token: token
            .refresh_token
            .or_else(|| credential.refresh_token.clone()),
        scopes: token
            .scope
            .as_deref()
            .map(split_scopes)
            .unwrap_or_else(|| credential.scopes.clone()),
        expires_at: Some(now + Duration::seconds(token.expires_in)),
        ..credential.clone()
    })
}

/// POST a form to the token endpoint. The `Err` string is safe to show.
async fn post_token_request(
    http_client: &dyn HttpClient,
    token_uri: &Url,
    params: &[(&str, &str)],
) -> std::result::Result<TokenResponse, String> {
    let body = serde_urlencoded::to_string(params)
        .map_err(|e| format!("failed to encode token request: {}", e))?;

    let request = HttpRequest::new(HttpMethod::Post, token_uri.as_str())
        .header("Accept", "application/json")
        .form(body);

    let response = http_client
        .execute(request)
        .await
        .map_err(|e| e.to_string())?;

    if !response.is_success() {
        let reason = match serde_json::from_slice::<TokenErrorResponse>(&response.body) {
            Ok(err) => err.to_string(),
            Err(_) => format!("token endpoint returned HTTP {}", response.status),
        };
        warn!(status = response.status, reason = %reason, "Token endpoint rejected request");
        return Err(reason);
    }

    serde_json::from_slice::<TokenResponse>(&response.body)
        .map_err(|_| "token endpoint returned an unreadable response".to_string())
}

fn split_scopes(scope: &str) -> Vec<String> {
    scope.split_whitespace().map(str::to_string).collect()
}

/// Successful token endpoint response.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
    scope: Option<String>,
}

fn default_expires_in() -> i64 {
    3600 // Default to 1 hour if not specified
}

/// RFC 6749 section 5.2 error body.
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

impl std::fmt::Display for TokenErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.error_description {
            Some(description) => write!(f, "{}: {}", self.error, description),
            None => write!(f, "{}", self.error),
        }
    }
}
