//! # Authentication Session
//!
//! One user's position in the authorization-code flow, plus the credential
//! it produced.
//!
//! ## Overview
//!
//! An `AuthSession` is created per browser connection and owned by the host.
//! It is never shared between users. All state changes go through a single
//! async mutex, so a callback racing a fresh `begin_authorization` on the same
//! session is serialized.
//!
//! ## Lifecycle
//!
//! ```text
//! begin_authorization()      -> pending state stored, URL returned
//! complete_authorization()   -> pending state consumed, credential stored
//! valid_credential()         -> credential, refreshed if close to expiry
//! clear()                    -> everything dropped
//! ```
//!
//! The pending state is taken out before anything is checked. Whatever the
//! outcome of a callback, the same state can never be used twice.

use crate::error::{AuthError, Result};
use crate::oauth;
use crate::types::{AuthRequestState, AuthState, AuthorizationDirective, Credential};
use bridge_traits::http::HttpClient;
use bridge_traits::time::Clock;
use core_runtime::config::{ClientConfig, DEFAULT_EXCHANGE_TIMEOUT};
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

/// Refresh an access token this many seconds before it expires.
const TOKEN_REFRESH_BUFFER_SECS: i64 = 60;

#[derive(Default)]
struct SessionState {
    pending: Option<AuthRequestState>,
    credential: Option<Credential>,
}

/// Per-user authorization state machine.
pub struct AuthSession {
    id: String,
    config: Arc<ClientConfig>,
    http_client: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
    event_bus: Option<EventBus>,
    exchange_timeout: Duration,
    state: Mutex<SessionState>,
}

impl AuthSession {
    pub fn new(
        config: Arc<ClientConfig>,
        http_client: Arc<dyn HttpClient>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            config,
            http_client,
            clock,
            event_bus: None,
            exchange_timeout: DEFAULT_EXCHANGE_TIMEOUT,
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Upper bound for one token endpoint round trip.
    pub fn with_exchange_timeout(mut self, exchange_timeout: Duration) -> Self {
        self.exchange_timeout = exchange_timeout;
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Public identifier used in events and logs. Not a secret.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Issue a fresh authorization URL.
    ///
    /// Replaces any earlier pending authorization: only the link issued last
    /// can complete. Does not touch an existing credential. Waits for a
    /// callback exchange already running on this session.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn begin_authorization(&self) -> AuthorizationDirective {
        let request = AuthRequestState::generate();
        let url = oauth::build_authorization_request(&self.config, &request);

        let mut state = self.state.lock().await;
        if state.pending.replace(request).is_some() {
            debug!("Replacing earlier pending authorization");
        }
        drop(state);

        info!("Authorization link issued");
        self.emit(AuthEvent::SigningIn {
            session_id: self.id.clone(),
        });

        AuthorizationDirective { url }
    }

    /// Handle the provider's redirect back to us.
    ///
    /// Checks run in order: a code must be present, then the returned state
    /// must equal the pending one, then the code is exchanged once. The
    /// pending state is discarded on every path. A failed attempt leaves an
    /// earlier credential in place.
    ///
    /// # Errors
    ///
    /// - `MissingCode` when `code` is absent or empty
    /// - `StateMismatch` when nothing is pending or the states differ
    /// - `ExchangeFailed` for provider rejections, transport errors and timeouts
    #[instrument(skip(self, code, returned_state), fields(session_id = %self.id))]
    pub async fn complete_authorization(
        &self,
        code: Option<&str>,
        returned_state: Option<&str>,
    ) -> Result<Credential> {
        let mut state = self.state.lock().await;
        let pending = state.pending.take();

        let code = match code.filter(|code| !code.is_empty()) {
            Some(code) => code,
            None => return Err(self.fail(AuthError::MissingCode)),
        };

        let request = match (pending, returned_state) {
            (Some(request), Some(returned)) if request.matches(returned) => request,
            (pending, _) => {
                warn!(
                    had_pending = pending.is_some(),
                    "Callback state does not match pending authorization"
                );
                return Err(self.fail(AuthError::StateMismatch));
            }
        };

        let now = self.clock.now();
        let exchange = oauth::exchange_code(
            self.http_client.as_ref(),
            &self.config,
            code,
            &request,
            now,
        );

        match self.bounded(exchange, AuthError::ExchangeFailed).await {
            Ok(credential) => {
                info!(scopes = ?credential.scopes, "Signed in");
                self.emit(AuthEvent::SignedIn {
                    session_id: self.id.clone(),
                    scopes: credential.scopes.clone(),
                });
                state.credential = Some(credential.clone());
                Ok(credential)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// The provider redirected back with `error=<reason>` instead of a code.
    ///
    /// Drops the pending authorization and returns the error to surface.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn reject_authorization(&self, reason: &str) -> AuthError {
        self.state.lock().await.pending = None;
        self.fail(AuthError::AuthorizationDenied(reason.to_string()))
    }

    /// Pure read of the stored credential, expired or not.
    pub async fn current_credential(&self) -> Option<Credential> {
        self.state.lock().await.credential.clone()
    }

    /// Credential usable for a remote call right now.
    ///
    /// Refreshes when the access token expires within 60 seconds and a
    /// refresh token exists. A failed refresh, or an expired token that cannot
    /// be refreshed, drops the credential.
    ///
    /// # Errors
    ///
    /// - `NotAuthenticated` when there is no usable credential
    /// - `RefreshFailed` when the token endpoint refused the refresh
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn valid_credential(&self) -> Result<Credential> {
        let mut state = self.state.lock().await;
        let credential = state.credential.clone().ok_or(AuthError::NotAuthenticated)?;

        let now = self.clock.now();
        if !credential.expires_within(now, chrono::Duration::seconds(TOKEN_REFRESH_BUFFER_SECS)) {
            return Ok(credential);
        }

        if !credential.can_refresh() {
            if credential.is_expired_at(now) {
                info!("Access token expired and cannot be refreshed");
                state.credential = None;
                self.emit(AuthEvent::SignedOut {
                    session_id: self.id.clone(),
                });
                return Err(AuthError::NotAuthenticated);
            }
            return Ok(credential);
        }

        self.emit(AuthEvent::TokenRefreshing {
            session_id: self.id.clone(),
        });
        let refresh = oauth::refresh_credential(self.http_client.as_ref(), &credential, now);

        match self.bounded(refresh, AuthError::RefreshFailed).await {
            Ok(refreshed) => {
                self.emit(AuthEvent::TokenRefreshed {
                    session_id: self.id.clone(),
                    expires_at: refreshed
                        .expires_at
                        .map(|at| at.timestamp())
                        .unwrap_or_default(),
                });
                state.credential = Some(refreshed.clone());
                Ok(refreshed)
            }
            Err(err) => {
                state.credential = None;
                Err(self.fail(err))
            }
        }
    }

    /// Drop the credential and any pending authorization (logout).
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        let had_pending = state.pending.take().is_some();
        let had_credential = state.credential.take().is_some();
        drop(state);

        if had_pending || had_credential {
            info!(had_credential, "Session cleared");
            self.emit(AuthEvent::SignedOut {
                session_id: self.id.clone(),
            });
        }
    }

    /// A held credential wins over a pending link: file calls keep working
    /// until the new authorization completes.
    pub async fn auth_state(&self) -> AuthState {
        let state = self.state.lock().await;
        if state.credential.is_some() {
            AuthState::Authenticated
        } else if state.pending.is_some() {
            AuthState::PendingAuthorization
        } else {
            AuthState::Unauthenticated
        }
    }

    /// Run a token endpoint call under the exchange timeout.
    async fn bounded<F>(&self, call: F, on_timeout: fn(String) -> AuthError) -> Result<Credential>
    where
        F: Future<Output = Result<Credential>>,
    {
        match timeout(self.exchange_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(on_timeout(format!(
                "timed out after {}s",
                self.exchange_timeout.as_secs_f64()
            ))),
        }
    }

    fn fail(&self, err: AuthError) -> AuthError {
        warn!(error = %err, "Authorization failed");
        self.emit(AuthEvent::AuthError {
            session_id: Some(self.id.clone()),
            message: err.to_string(),
            recoverable: true,
        });
        err
    }

    fn emit(&self, event: AuthEvent) {
        if let Some(bus) = &self.event_bus {
            let _ = bus.emit(CoreEvent::Auth(event));
        }
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("id", &self.id)
            .field("client_id", &self.config.client_id)
            .field("exchange_timeout", &self.exchange_timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::http::{HttpRequest, HttpResponse, HttpStreamResponse};
    use bridge_traits::time::ManualClock;
    use bytes::Bytes;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex as StdMutex;

    /// Plays back queued token endpoint responses in order.
    #[derive(Default)]
    struct ScriptedTokenEndpoint {
        responses: StdMutex<VecDeque<(u16, &'static str)>>,
        delay: Option<Duration>,
        calls: StdMutex<usize>,
    }

    impl ScriptedTokenEndpoint {
        fn with(responses: &[(u16, &'static str)]) -> Self {
            Self {
                responses: StdMutex::new(responses.iter().copied().collect()),
                ..Default::default()
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait::async_trait]
    impl HttpClient for ScriptedTokenEndpoint {
        async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
            *self.calls.lock().unwrap() += 1;
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let (status, body) = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| BridgeError::OperationFailed("unexpected request".into()))?;
            Ok(HttpResponse {
                status,
                headers: HashMap::new(),
                body: Bytes::from_static(body.as_bytes()),
            })
        }

        async fn execute_stream(&self, _request: HttpRequest) -> BridgeResult<HttpStreamResponse> {
            Err(BridgeError::NotAvailable("streaming".to_string()))
        }
    }

    const TOKENS: &str = r#"{"access_token": "ya29.first", "refresh_token": "1//r", "expires_in": 3600}"#;
    const REFRESHED: &str = r#"{"access_token": "ya29.second", "expires_in": 3600}"#;
    const INVALID_GRANT: &str = r#"{"error": "invalid_grant", "error_description": "Bad Request"}"#;

    fn config() -> Arc<ClientConfig> {
        Arc::new(
            ClientConfig::from_json_str(
                r#"{"web": {
                    "client_id": "abc",
                    "client_secret": "shh",
                    "auth_uri": "https://accounts.google.com/o/oauth2/auth",
                    "token_uri": "https://oauth2.googleapis.com/token",
                    "redirect_uris": ["https://x/"]
                }}"#,
            )
            .unwrap(),
        )
    }

    fn session(endpoint: Arc<ScriptedTokenEndpoint>, clock: Arc<ManualClock>) -> AuthSession {
        AuthSession::new(config(), endpoint, clock)
    }

    fn state_of(directive: &AuthorizationDirective) -> String {
        directive
            .url
            .query_pairs()
            .find(|(key, _)| key == "state")
            .map(|(_, value)| value.into_owned())
            .unwrap()
    }

    #[tokio::test]
    async fn test_complete_authorization_stores_credential() {
        let endpoint = Arc::new(ScriptedTokenEndpoint::with(&[(200, TOKENS)]));
        let clock = Arc::new(ManualClock::at_timestamp(1_700_000_000));
        let session = session(endpoint.clone(), clock.clone());

        let directive = session.begin_authorization().await;
        assert_eq!(session.auth_state().await, AuthState::PendingAuthorization);

        let state = state_of(&directive);
        let credential = session
            .complete_authorization(Some("C"), Some(&state))
            .await
            .unwrap();

        assert_eq!(credential.access_token, "ya29.first");
        assert_eq!(
            credential.expires_at,
            Some(clock.now() + chrono::Duration::seconds(3600))
        );
        assert_eq!(session.current_credential().await, Some(credential));
        assert_eq!(session.auth_state().await, AuthState::Authenticated);
        assert_eq!(endpoint.calls(), 1);
    }

    #[tokio::test]
    async fn test_second_completion_with_same_state_is_rejected() {
        let endpoint = Arc::new(ScriptedTokenEndpoint::with(&[(200, TOKENS)]));
        let session = session(endpoint.clone(), Arc::new(ManualClock::at_timestamp(0)));

        let state = state_of(&session.begin_authorization().await);
        session
            .complete_authorization(Some("C"), Some(&state))
            .await
            .unwrap();

        let err = session
            .complete_authorization(Some("C"), Some(&state))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::StateMismatch);
        assert_eq!(endpoint.calls(), 1);
    }

    #[tokio::test]
    async fn test_state_mismatch_discards_pending() {
        let endpoint = Arc::new(ScriptedTokenEndpoint::with(&[(200, TOKENS)]));
        let session = session(endpoint.clone(), Arc::new(ManualClock::at_timestamp(0)));

        let state = state_of(&session.begin_authorization().await);
        let err = session
            .complete_authorization(Some("C"), Some("WRONG"))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::StateMismatch);
        assert_eq!(session.auth_state().await, AuthState::Unauthenticated);

        // The genuine state is gone too
        let err = session
            .complete_authorization(Some("C"), Some(&state))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::StateMismatch);
        assert_eq!(endpoint.calls(), 0);
    }

    #[tokio::test]
    async fn test_only_latest_link_completes() {
        let endpoint = Arc::new(ScriptedTokenEndpoint::with(&[(200, TOKENS)]));
        let session = session(endpoint, Arc::new(ManualClock::at_timestamp(0)));

        let first = state_of(&session.begin_authorization().await);
        let second = state_of(&session.begin_authorization().await);
        assert_ne!(first, second);

        let err = session
            .complete_authorization(Some("C"), Some(&first))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::StateMismatch);
    }

    #[tokio::test]
    async fn test_missing_code_checked_before_state() {
        let endpoint = Arc::new(ScriptedTokenEndpoint::default());
        let session = session(endpoint, Arc::new(ManualClock::at_timestamp(0)));

        session.begin_authorization().await;
        let err = session
            .complete_authorization(None, Some("WRONG"))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::MissingCode);

        let err = session
            .complete_authorization(Some(""), None)
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::MissingCode);
        assert_eq!(session.auth_state().await, AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_callback_without_pending_authorization() {
        let endpoint = Arc::new(ScriptedTokenEndpoint::with(&[(200, TOKENS)]));
        let session = session(endpoint, Arc::new(ManualClock::at_timestamp(0)));

        let err = session
            .complete_authorization(Some("C"), Some("S"))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::StateMismatch);
    }

    #[tokio::test]
    async fn test_provider_rejection_is_exchange_failure() {
        let endpoint = Arc::new(ScriptedTokenEndpoint::with(&[(400, INVALID_GRANT)]));
        let session = session(endpoint, Arc::new(ManualClock::at_timestamp(0)));

        let state = state_of(&session.begin_authorization().await);
        let err = session
            .complete_authorization(Some("C"), Some(&state))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            AuthError::ExchangeFailed("invalid_grant: Bad Request".to_string())
        );
        assert_eq!(session.auth_state().await, AuthState::Unauthenticated);
        assert!(session.current_credential().await.is_none());
    }

    #[tokio::test]
    async fn test_new_link_does_not_demote_signed_in_session() {
        let endpoint = Arc::new(ScriptedTokenEndpoint::with(&[(200, TOKENS)]));
        let session = session(endpoint, Arc::new(ManualClock::at_timestamp(0)));

        let state = state_of(&session.begin_authorization().await);
        session
            .complete_authorization(Some("C"), Some(&state))
            .await
            .unwrap();

        session.begin_authorization().await;
        assert_eq!(session.auth_state().await, AuthState::Authenticated);
        assert!(session.valid_credential().await.is_ok());
    }

    #[tokio::test]
    async fn test_begin_waits_for_running_exchange() {
        let endpoint = Arc::new(ScriptedTokenEndpoint {
            delay: Some(Duration::from_millis(200)),
            ..ScriptedTokenEndpoint::with(&[(200, TOKENS), (200, TOKENS)])
        });
        let session = Arc::new(session(endpoint.clone(), Arc::new(ManualClock::at_timestamp(0))));

        let first_state = state_of(&session.begin_authorization().await);
        let exchange = tokio::spawn({
            let session = session.clone();
            let first_state = first_state.clone();
            async move {
                session
                    .complete_authorization(Some("C"), Some(&first_state))
                    .await
            }
        });

        // Let the exchange take the session lock first
        tokio::time::sleep(Duration::from_millis(20)).await;
        let second_state = state_of(&session.begin_authorization().await);

        // The new link was only issued once the exchange had stored its result
        assert!(session.current_credential().await.is_some());
        assert_eq!(endpoint.calls(), 1);
        assert_eq!(exchange.await.unwrap().unwrap().access_token, "ya29.first");

        session
            .complete_authorization(Some("C2"), Some(&second_state))
            .await
            .unwrap();
        let err = session
            .complete_authorization(Some("C"), Some(&first_state))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::StateMismatch);
        assert_eq!(endpoint.calls(), 2);
    }

    #[tokio::test]
    async fn test_exchange_timeout() {
        let endpoint = Arc::new(ScriptedTokenEndpoint {
            delay: Some(Duration::from_millis(500)),
            ..ScriptedTokenEndpoint::with(&[(200, TOKENS)])
        });
        let session = session(endpoint, Arc::new(ManualClock::at_timestamp(0)))
            .with_exchange_timeout(Duration::from_millis(50));

        let state = state_of(&session.begin_authorization().await);
        let err = session
            .complete_authorization(Some("C"), Some(&state))
            .await
            .unwrap_err();

        match err {
            AuthError::ExchangeFailed(reason) => assert!(reason.starts_with("timed out")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reject_authorization_discards_pending() {
        let session = session(
            Arc::new(ScriptedTokenEndpoint::default()),
            Arc::new(ManualClock::at_timestamp(0)),
        );

        session.begin_authorization().await;
        let err = session.reject_authorization("access_denied").await;

        assert_eq!(err, AuthError::AuthorizationDenied("access_denied".to_string()));
        assert_eq!(session.auth_state().await, AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_valid_credential_refreshes_near_expiry() {
        let endpoint = Arc::new(ScriptedTokenEndpoint::with(&[(200, TOKENS), (200, REFRESHED)]));
        let clock = Arc::new(ManualClock::at_timestamp(1_700_000_000));
        let session = session(endpoint.clone(), clock.clone());

        let state = state_of(&session.begin_authorization().await);
        session
            .complete_authorization(Some("C"), Some(&state))
            .await
            .unwrap();

        // Well before expiry: no network call
        let credential = session.valid_credential().await.unwrap();
        assert_eq!(credential.access_token, "ya29.first");
        assert_eq!(endpoint.calls(), 1);

        clock.advance(chrono::Duration::seconds(3600 - 30));
        let refreshed = session.valid_credential().await.unwrap();
        assert_eq!(refreshed.access_token, "ya29.second");
        assert_eq!(refreshed.refresh_token.as_deref(), Some("1//r"));
        assert_eq!(endpoint.calls(), 2);
        assert_eq!(session.current_credential().await, Some(refreshed));
    }

    #[tokio::test]
    async fn test_failed_refresh_clears_credential() {
        let endpoint = Arc::new(ScriptedTokenEndpoint::with(&[(200, TOKENS), (400, INVALID_GRANT)]));
        let clock = Arc::new(ManualClock::at_timestamp(1_700_000_000));
        let session = session(endpoint, clock.clone());

        let state = state_of(&session.begin_authorization().await);
        session
            .complete_authorization(Some("C"), Some(&state))
            .await
            .unwrap();

        clock.advance(chrono::Duration::hours(2));
        let err = session.valid_credential().await.unwrap_err();

        assert!(matches!(err, AuthError::RefreshFailed(_)));
        assert!(session.current_credential().await.is_none());
        assert_eq!(session.valid_credential().await, Err(AuthError::NotAuthenticated));
    }

    #[tokio::test]
    async fn test_expired_without_refresh_token() {
        let endpoint = Arc::new(ScriptedTokenEndpoint::with(&[(
            200,
            r#"{"access_token": "ya29.only", "expires_in": 600}"#,
        )]));
        let clock = Arc::new(ManualClock::at_timestamp(1_700_000_000));
        let session = session(endpoint.clone(), clock.clone());

        let state = state_of(&session.begin_authorization().await);
        session
            .complete_authorization(Some("C"), Some(&state))
            .await
            .unwrap();

        // Inside the refresh window but not yet expired: still usable
        clock.advance(chrono::Duration::seconds(570));
        assert!(session.valid_credential().await.is_ok());

        clock.advance(chrono::Duration::seconds(60));
        assert_eq!(session.valid_credential().await, Err(AuthError::NotAuthenticated));
        assert!(session.current_credential().await.is_none());
        assert_eq!(endpoint.calls(), 1);
    }

    #[tokio::test]
    async fn test_clear_emits_signed_out() {
        let bus = EventBus::new(16);
        let mut events = bus.subscribe();
        let endpoint = Arc::new(ScriptedTokenEndpoint::with(&[(200, TOKENS)]));
        let session = session(endpoint, Arc::new(ManualClock::at_timestamp(0)))
            .with_event_bus(bus)
            .with_id("session-1");

        let state = state_of(&session.begin_authorization().await);
        session
            .complete_authorization(Some("C"), Some(&state))
            .await
            .unwrap();
        session.clear().await;

        assert_eq!(session.auth_state().await, AuthState::Unauthenticated);

        let mut received = Vec::new();
        while let Ok(event) = events.try_recv() {
            received.push(event);
        }
        assert_eq!(
            received,
            vec![
                CoreEvent::Auth(AuthEvent::SigningIn {
                    session_id: "session-1".to_string()
                }),
                CoreEvent::Auth(AuthEvent::SignedIn {
                    session_id: "session-1".to_string(),
                    scopes: vec!["https://www.googleapis.com/auth/drive.readonly".to_string()],
                }),
                CoreEvent::Auth(AuthEvent::SignedOut {
                    session_id: "session-1".to_string()
                }),
            ]
        );
    }

    #[tokio::test]
    async fn test_error_events_carry_no_secrets() {
        let bus = EventBus::new(16);
        let mut events = bus.subscribe();
        let session = session(
            Arc::new(ScriptedTokenEndpoint::default()),
            Arc::new(ManualClock::at_timestamp(0)),
        )
        .with_event_bus(bus);

        let state = state_of(&session.begin_authorization().await);
        let _ = session
            .complete_authorization(Some("secret-code"), Some("WRONG"))
            .await;

        let mut serialized = String::new();
        while let Ok(event) = events.try_recv() {
            serialized.push_str(&serde_json::to_string(&event).unwrap());
        }
        assert!(serialized.contains("AuthError"));
        assert!(!serialized.contains("secret-code"));
        assert!(!serialized.contains(&state));
    }

    #[test]
    fn test_debug_hides_config_secret() {
        let session = AuthSession::new(
            config(),
            Arc::new(ScriptedTokenEndpoint::default()),
            Arc::new(ManualClock::at_timestamp(0)),
        );
        assert!(!format!("{:?}", session).contains("shh"));
    }
}
