use core_service::CoreService;

use crate::sessions::SessionRegistry;

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: CoreService,
    pub sessions: SessionRegistry,
    /// Mark cookies `Secure` when the app is served over https.
    pub secure_cookies: bool,
}

impl AppState {
    pub fn new(service: CoreService) -> Self {
        let secure_cookies = service.config().client.redirect_uri.scheme() == "https";
        Self {
            sessions: SessionRegistry::new(service.clone()),
            service,
            secure_cookies,
        }
    }

    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.sessions = self.sessions.with_max_sessions(max_sessions);
        self
    }
}
