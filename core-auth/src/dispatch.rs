//! Query-driven entry point for a hosting web surface.
//!
//! The host turns the incoming query string into an [`AuthRequest`] and asks
//! the session what to do. The answer is an [`AuthAction`]; nothing here reads
//! ambient request state.

use crate::error::AuthError;
use crate::session::AuthSession;
use crate::types::{AuthorizationDirective, Credential};
use std::collections::HashMap;
use tracing::{debug, instrument};

/// Query parameters the provider may append to the redirect.
///
/// Hosts strip these from the visible URL once a callback has been handled.
pub const CALLBACK_PARAMS: &[&str] = &[
    "code", "state", "scope", "error", "authuser", "prompt", "hd", "iss",
];

/// Incoming request, reduced to what the flow needs.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AuthRequest {
    pub query_params: HashMap<String, String>,
}

impl AuthRequest {
    pub fn new(query_params: HashMap<String, String>) -> Self {
        Self { query_params }
    }

    /// Parse a raw query string (without the leading `?`).
    ///
    /// A repeated key keeps its first value. Unparsable input yields an
    /// empty request.
    pub fn from_query(raw: &str) -> Self {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(raw).unwrap_or_default();

        let mut query_params = HashMap::new();
        for (key, value) in pairs {
            query_params.entry(key).or_insert(value);
        }
        Self { query_params }
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(String::as_str)
    }

    /// Whether this looks like the provider's redirect back to us.
    pub fn is_callback(&self) -> bool {
        ["code", "state", "error"]
            .iter()
            .any(|name| self.query_params.contains_key(*name))
    }
}

// Callback queries carry the authorization code and state.
impl std::fmt::Debug for AuthRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<&String> = self.query_params.keys().collect();
        keys.sort();
        f.debug_struct("AuthRequest")
            .field("query_keys", &keys)
            .finish()
    }
}

/// What the host should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthAction {
    /// Present the link; the user is not signed in.
    ShowAuthLink(AuthorizationDirective),
    /// A usable credential exists.
    Authenticated {
        credential: Credential,
        /// Produced by this very request's callback.
        from_callback: bool,
    },
    /// The callback failed. The user restarts from a fresh link.
    Error(AuthError),
}

impl AuthAction {
    /// Whether the host must drop [`CALLBACK_PARAMS`] from the visible URL.
    ///
    /// True after any handled callback, successful or not, so a page reload
    /// cannot replay it.
    pub fn clears_query(&self) -> bool {
        matches!(
            self,
            AuthAction::Authenticated {
                from_callback: true,
                ..
            } | AuthAction::Error(_)
        )
    }
}

/// Remove [`CALLBACK_PARAMS`] from a raw query string, keeping the rest in
/// order. Returns an empty string when nothing is left.
pub fn strip_callback_params(raw_query: &str) -> String {
    raw_query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| {
            let key = pair.split_once('=').map_or(*pair, |(key, _)| key);
            !CALLBACK_PARAMS.contains(&key)
        })
        .collect::<Vec<_>>()
        .join("&")
}

impl AuthSession {
    /// Decide the next step for one incoming request.
    ///
    /// - Callback with `error`: the pending authorization is dropped
    /// - Callback with `code`/`state`: the authorization is completed
    /// - Anything else: the current credential, or a fresh link when there is
    ///   no usable one
    #[instrument(skip_all, fields(session_id = %self.id()))]
    pub async fn dispatch(&self, request: &AuthRequest) -> AuthAction {
        if !request.is_callback() {
            return match self.valid_credential().await {
                Ok(credential) => AuthAction::Authenticated {
                    credential,
                    from_callback: false,
                },
                Err(err) => {
                    debug!(reason = %err, "No usable credential, issuing link");
                    AuthAction::ShowAuthLink(self.begin_authorization().await)
                }
            };
        }

        if let Some(reason) = request.param("error") {
            return AuthAction::Error(self.reject_authorization(reason).await);
        }

        match self
            .complete_authorization(request.param("code"), request.param("state"))
            .await
        {
            Ok(credential) => AuthAction::Authenticated {
                credential,
                from_callback: true,
            },
            Err(err) => AuthAction::Error(err),
        }
    }
}
