//! Browser sessions, keyed by an opaque cookie token.
//!
//! The cookie token and the [`AuthSession`] id are unrelated random values:
//! the id shows up in logs and events, the token never does.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use core_runtime::events::{CoreEvent, SessionEvent};
use core_service::{AuthSession, CoreService};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::state::AppState;

pub const SESSION_COOKIE: &str = "bijlagetool_session";

/// Live sessions kept before the least recently seen one is dropped.
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

struct Entry {
    session: Arc<AuthSession>,
    last_seen: DateTime<Utc>,
}

/// Outcome of looking up a cookie token.
pub struct ResolvedSession {
    pub token: String,
    pub session: Arc<AuthSession>,
    /// A new session was started; the cookie must be (re)issued.
    pub created: bool,
}

/// All live browser sessions of this process.
#[derive(Clone)]
pub struct SessionRegistry {
    service: CoreService,
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    idle_timeout: Duration,
    max_sessions: usize,
}

impl SessionRegistry {
    pub fn new(service: CoreService) -> Self {
        let idle_timeout = service.config().session_idle_timeout;
        Self {
            service,
            entries: Arc::new(RwLock::new(HashMap::new())),
            idle_timeout,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }

    /// Cap the number of live sessions. Clients that never send the cookie
    /// back get a new session per request; past the cap the least recently
    /// seen session makes room.
    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions.max(1);
        self
    }

    fn now(&self) -> DateTime<Utc> {
        self.service.config().clock.now()
    }

    fn idle_for(&self, entry: &Entry, now: DateTime<Utc>) -> Option<Duration> {
        (now - entry.last_seen)
            .to_std()
            .ok()
            .filter(|idle| *idle >= self.idle_timeout)
    }

    /// Session for `token`, or a fresh one when the token is unknown or idle
    /// for too long.
    pub async fn resolve(&self, token: Option<&str>) -> ResolvedSession {
        let now = self.now();
        let mut expired = None;

        {
            let mut entries = self.entries.write().await;
            if let Some(token) = token {
                if let Some(entry) = entries.get_mut(token) {
                    match self.idle_for(entry, now) {
                        None => {
                            entry.last_seen = now;
                            return ResolvedSession {
                                token: token.to_string(),
                                session: entry.session.clone(),
                                created: false,
                            };
                        }
                        Some(idle) => {
                            expired = entries.remove(token).map(|entry| (entry.session, idle));
                        }
                    }
                }
            }
        }

        if let Some((session, idle)) = expired {
            self.end(&session, idle).await;
        }

        let token = Uuid::new_v4().to_string();
        let session = Arc::new(self.service.new_session());

        let evicted = {
            let mut entries = self.entries.write().await;
            let evicted = if entries.len() >= self.max_sessions {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.last_seen)
                    .map(|(token, _)| token.clone());
                oldest.and_then(|oldest| entries.remove(&oldest)).map(|entry| {
                    let idle = (now - entry.last_seen).to_std().unwrap_or_default();
                    (entry.session, idle)
                })
            } else {
                None
            };
            entries.insert(
                token.clone(),
                Entry {
                    session: session.clone(),
                    last_seen: now,
                },
            );
            evicted
        };

        if let Some((oldest, idle)) = evicted {
            warn!(
                session_id = %oldest.id(),
                max_sessions = self.max_sessions,
                "Session limit reached, dropping least recently seen session"
            );
            self.end(&oldest, idle).await;
        }

        debug!(session_id = %session.id(), "Session created");
        let _ = self
            .service
            .event_bus()
            .emit(CoreEvent::Session(SessionEvent::Created {
                session_id: session.id().to_string(),
            }));

        ResolvedSession {
            token,
            session,
            created: true,
        }
    }

    /// Drop every session idle for longer than the configured timeout.
    pub async fn sweep_expired(&self) -> usize {
        let now = self.now();

        let expired: Vec<(Arc<AuthSession>, Duration)> = {
            let mut entries = self.entries.write().await;
            let idle: Vec<(String, Duration)> = entries
                .iter()
                .filter_map(|(token, entry)| {
                    self.idle_for(entry, now).map(|idle| (token.clone(), idle))
                })
                .collect();

            idle.into_iter()
                .filter_map(|(token, idle)| {
                    entries.remove(&token).map(|entry| (entry.session, idle))
                })
                .collect()
        };

        for (session, idle) in &expired {
            self.end(session, *idle).await;
        }

        if !expired.is_empty() {
            info!(count = expired.len(), "Expired idle sessions");
        }
        expired.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    async fn end(&self, session: &AuthSession, idle: Duration) {
        if let Err(err) = self.service.end_session(session).await {
            warn!(session_id = %session.id(), error = %err, "Failed to clean up session");
        }
        let _ = self
            .service
            .event_bus()
            .emit(CoreEvent::Session(SessionEvent::Expired {
                session_id: session.id().to_string(),
                idle_secs: idle.as_secs(),
            }));
    }
}

/// Periodically drop idle sessions until `shutdown` is cancelled.
pub fn spawn_sweeper(
    registry: SessionRegistry,
    every: Duration,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Session sweeper stopped");
                    break;
                }
                _ = interval.tick() => {
                    registry.sweep_expired().await;
                }
            }
        }
    })
}

fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        // Lax so the cookie survives the top-level redirect back from the provider
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// The caller's session, plus the cookie jar to send back.
///
/// Handlers must return `jar` with their response so a newly created
/// session's cookie reaches the browser.
pub struct BrowserSession {
    pub session: Arc<AuthSession>,
    pub jar: CookieJar,
}

impl FromRequestParts<AppState> for BrowserSession {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar.get(SESSION_COOKIE).map(|cookie| cookie.value().to_string());

        let resolved = state.sessions.resolve(token.as_deref()).await;
        let jar = if resolved.created {
            jar.add(session_cookie(resolved.token, state.secure_cookies))
        } else {
            jar
        };

        Ok(Self {
            session: resolved.session,
            jar,
        })
    }
}
