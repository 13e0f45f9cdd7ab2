use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use core_runtime::logging::redact_query;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use url::Url;

/// Credential produced by a successful token exchange.
///
/// Carries what is needed to call the storage API and to refresh itself:
/// the token endpoint and the client registration travel with the tokens.
///
/// # Security
///
/// The `Debug` implementation redacts tokens and the client secret.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, Utc};
/// use core_auth::Credential;
///
/// let now = Utc::now();
/// let credential = Credential {
///     access_token: "ya29.a0...".to_string(),
///     refresh_token: Some("1//0g...".to_string()),
///     token_uri: "https://oauth2.googleapis.com/token".parse().unwrap(),
///     client_id: "abc".to_string(),
///     client_secret: "secret".to_string(),
///     scopes: vec!["https://www.googleapis.com/auth/drive.readonly".to_string()],
///     expires_at: Some(now + Duration::hours(1)),
/// };
///
/// assert!(!credential.is_expired_at(now));
/// assert!(!format!("{:?}", credential).contains("ya29"));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_uri: Url,
    pub client_id: String,
    pub client_secret: String,
    /// Scopes the provider actually granted
    pub scopes: Vec<String>,
    /// `None` means the provider gave no lifetime
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    /// Whether the access token is past its expiry at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(false, |expires_at| now >= expires_at)
    }

    /// Whether the access token expires within `buffer` of `now`.
    pub fn expires_within(&self, now: DateTime<Utc>, buffer: Duration) -> bool {
        self.expires_at
            .map_or(false, |expires_at| now + buffer >= expires_at)
    }

    /// Time left before expiry; zero once expired.
    pub fn time_until_expiry(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.expires_at
            .map(|expires_at| (expires_at - now).max(Duration::zero()))
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("token_uri", &self.token_uri.as_str())
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("scopes", &self.scopes)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Pending authorization: the CSRF state plus the PKCE code verifier.
///
/// Created when an authorization URL is issued and consumed by the matching
/// callback. Never reused for a second attempt.
#[derive(Clone)]
pub struct AuthRequestState {
    state: String,
    verifier: String,
}

impl AuthRequestState {
    /// Fresh random values.
    ///
    /// - 16 random bytes of state
    /// - 32 random bytes of code verifier (43 characters, within RFC 7636 limits)
    ///
    /// Both are URL-safe base64 without padding.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();

        let mut state_bytes = [0u8; 16];
        rng.fill(&mut state_bytes);

        let mut verifier_bytes = [0u8; 32];
        rng.fill(&mut verifier_bytes);

        Self {
            state: URL_SAFE_NO_PAD.encode(state_bytes),
            verifier: URL_SAFE_NO_PAD.encode(verifier_bytes),
        }
    }

    /// Build from known values. Useful when the state is chosen elsewhere.
    pub fn from_parts(state: impl Into<String>, verifier: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            verifier: verifier.into(),
        }
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn verifier(&self) -> &str {
        &self.verifier
    }

    /// S256 code challenge: BASE64URL(SHA256(code_verifier))
    pub fn code_challenge(&self) -> String {
        let hash = Sha256::digest(self.verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(hash)
    }

    /// Byte-for-byte comparison that does not stop at the first difference.
    pub fn matches(&self, returned_state: &str) -> bool {
        let expected = self.state.as_bytes();
        let actual = returned_state.as_bytes();
        if expected.len() != actual.len() {
            return false;
        }
        expected
            .iter()
            .zip(actual)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl fmt::Debug for AuthRequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthRequestState")
            .field("state", &"[REDACTED]")
            .field("verifier", &"[REDACTED]")
            .finish()
    }
}

/// Where to send the user to grant access.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthorizationDirective {
    pub url: Url,
}

impl AuthorizationDirective {
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

// The URL embeds the CSRF state; keep it out of Debug output.
impl fmt::Debug for AuthorizationDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationDirective")
            .field("url", &redact_query(self.url.as_str()))
            .finish()
    }
}

/// Authentication state of one session.
///
/// ```text
/// Unauthenticated ──begin──> PendingAuthorization ──callback ok──> Authenticated
///        ^                          │                                   │
///        └──── mismatch / failure ──┘<──────────── clear ───────────────┘
/// ```
///
/// A signed-in session that requests a new link stays `Authenticated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    Unauthenticated,
    PendingAuthorization,
    Authenticated,
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthState::Unauthenticated => write!(f, "Unauthenticated"),
            AuthState::PendingAuthorization => write!(f, "Pending authorization"),
            AuthState::Authenticated => write!(f, "Authenticated"),
        }
    }
}
