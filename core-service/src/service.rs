//! Service façade: one entry point per user action.
//!
//! Every file operation first obtains a usable credential from the caller's
//! [`AuthSession`]. Without one the caller gets
//! [`CoreError::AuthenticationRequired`] carrying a fresh link, never a
//! partial result. A remote 401 drops the session's credential.

use std::sync::Arc;

use core_auth::{AuthAction, AuthError, AuthRequest, AuthSession, Credential};
use core_runtime::config::{AppConfig, ClientConfig};
use core_runtime::events::EventBus;
use provider_google_drive::{query, DriveGateway, FileGateway, FileRecord, FileStream, GatewayError};
use tracing::{info, instrument, warn};

use crate::error::{CoreError, Result};
use crate::settings::UserSettings;

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    config: Arc<AppConfig>,
    client: Arc<ClientConfig>,
    gateway: Arc<dyn FileGateway>,
    event_bus: EventBus,
}

impl CoreService {
    /// Service talking to Google Drive with the configured HTTP client.
    pub fn new(config: AppConfig) -> Self {
        let gateway = Arc::new(DriveGateway::from_config(&config));
        Self::with_gateway(config, gateway)
    }

    /// Service using another [`FileGateway`] implementation.
    pub fn with_gateway(config: AppConfig, gateway: Arc<dyn FileGateway>) -> Self {
        Self {
            client: Arc::new(config.client.clone()),
            config: Arc::new(config),
            gateway,
            event_bus: EventBus::default(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Auth and session notifications for every session of this service.
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// A fresh, unauthenticated session for one user connection.
    pub fn new_session(&self) -> AuthSession {
        AuthSession::new(
            self.client.clone(),
            self.config.http_client.clone(),
            self.config.clock.clone(),
        )
        .with_event_bus(self.event_bus.clone())
        .with_exchange_timeout(self.config.exchange_timeout)
    }

    /// Route one incoming request through the authorization flow.
    pub async fn authorize(&self, session: &AuthSession, request: &AuthRequest) -> AuthAction {
        session.dispatch(request).await
    }

    #[instrument(skip(self, session), fields(session_id = %session.id()))]
    pub async fn search(&self, session: &AuthSession, pattern: &str) -> Result<Vec<FileRecord>> {
        // An empty pattern is a caller mistake whether or not anyone is signed in.
        query::name_contains(pattern)?;

        let credential = self.credential_for(session).await?;
        let result = self.gateway.search(&credential, pattern).await;
        self.settle(session, result).await
    }

    /// Most recent files. `None` uses the configured default page size.
    #[instrument(skip(self, session), fields(session_id = %session.id()))]
    pub async fn list(&self, session: &AuthSession, page_size: Option<u32>) -> Result<Vec<FileRecord>> {
        let page_size = page_size.unwrap_or(self.config.default_page_size);

        let credential = self.credential_for(session).await?;
        let result = self.gateway.list(&credential, page_size).await;
        self.settle(session, result).await
    }

    #[instrument(skip(self, session), fields(session_id = %session.id()))]
    pub async fn metadata(&self, session: &AuthSession, file_id: &str) -> Result<FileRecord> {
        let credential = self.credential_for(session).await?;
        let result = self.gateway.get_metadata(&credential, file_id).await;
        self.settle(session, result).await
    }

    /// Start a transfer. The stream is consumed by the caller; a 401 that
    /// arrives only mid-stream is not seen here.
    #[instrument(skip(self, session), fields(session_id = %session.id()))]
    pub async fn download(&self, session: &AuthSession, file_id: &str) -> Result<FileStream> {
        let credential = self.credential_for(session).await?;
        let result = self.gateway.download(&credential, file_id).await;
        self.settle(session, result).await
    }

    pub async fn settings(&self, session: &AuthSession) -> Result<UserSettings> {
        UserSettings::load(self.config.settings_store.as_ref(), session.id()).await
    }

    pub async fn update_settings(&self, session: &AuthSession, settings: &UserSettings) -> Result<()> {
        settings
            .save(self.config.settings_store.as_ref(), session.id())
            .await
    }

    /// Drop what the service keeps for an ended session.
    pub async fn end_session(&self, session: &AuthSession) -> Result<()> {
        session.clear().await;
        UserSettings::forget(self.config.settings_store.as_ref(), session.id()).await
    }

    async fn credential_for(&self, session: &AuthSession) -> Result<Credential> {
        match session.valid_credential().await {
            Ok(credential) => Ok(credential),
            Err(err) => {
                if let AuthError::RefreshFailed(_) = err {
                    warn!(error = %err, "Could not refresh credential");
                }
                let directive = session.begin_authorization().await;
                Err(CoreError::AuthenticationRequired(directive))
            }
        }
    }

    /// Pass a gateway result through, dropping the credential on 401.
    async fn settle<T>(&self, session: &AuthSession, result: std::result::Result<T, GatewayError>) -> Result<T> {
        match result {
            Err(GatewayError::Unauthorized) => {
                info!("Remote rejected credential, clearing session");
                session.clear().await;
                Err(GatewayError::Unauthorized.into())
            }
            other => other.map_err(CoreError::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_desktop::MemorySettingsStore;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse, HttpStreamResponse};
    use bridge_traits::time::ManualClock;
    use bytes::Bytes;
    use core_auth::AuthState;
    use futures::{StreamExt, TryStreamExt};
    use mockall::mock;
    use mockall::predicate::eq;
    use std::collections::HashMap;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
            async fn execute_stream(&self, request: HttpRequest) -> BridgeResult<HttpStreamResponse>;
        }
    }

    mock! {
        Gateway {}

        #[async_trait]
        impl FileGateway for Gateway {
            async fn search(&self, credential: &Credential, pattern: &str) -> provider_google_drive::Result<Vec<FileRecord>>;
            async fn list(&self, credential: &Credential, page_size: u32) -> provider_google_drive::Result<Vec<FileRecord>>;
            async fn get_metadata(&self, credential: &Credential, file_id: &str) -> provider_google_drive::Result<FileRecord>;
            async fn download(&self, credential: &Credential, file_id: &str) -> provider_google_drive::Result<FileStream>;
        }
    }

    const CLIENT_SECRETS: &str = r#"{"web": {
        "client_id": "abc",
        "client_secret": "shh",
        "auth_uri": "https://accounts.google.com/o/oauth2/auth",
        "token_uri": "https://oauth2.googleapis.com/token",
        "redirect_uris": ["https://x/"]
    }}"#;

    fn token_endpoint() -> MockHttpClient {
        let mut http_client = MockHttpClient::new();
        http_client.expect_execute().returning(|_| {
            Ok(HttpResponse {
                status: 200,
                headers: HashMap::new(),
                body: Bytes::from_static(br#"{"access_token": "ya29.svc", "expires_in": 3600}"#),
            })
        });
        http_client
    }

    fn service(gateway: MockGateway) -> CoreService {
        let config = AppConfig::builder()
            .client(ClientConfig::from_json_str(CLIENT_SECRETS).unwrap())
            .http_client(Arc::new(token_endpoint()))
            .settings_store(Arc::new(MemorySettingsStore::new()))
            .clock(Arc::new(ManualClock::at_timestamp(1_700_000_000)))
            .default_page_size(25)
            .build()
            .unwrap();
        CoreService::with_gateway(config, Arc::new(gateway))
    }

    async fn signed_in(service: &CoreService) -> AuthSession {
        let session = service.new_session();
        let link = session.begin_authorization().await;
        let state = link
            .url
            .query_pairs()
            .find(|(key, _)| key == "state")
            .map(|(_, value)| value.into_owned())
            .unwrap();
        session
            .complete_authorization(Some("C"), Some(&state))
            .await
            .unwrap();
        session
    }

    fn record(id: &str, name: &str) -> FileRecord {
        FileRecord {
            id: id.to_string(),
            name: name.to_string(),
            mime_type: "application/pdf".to_string(),
            modified_at: None,
            size: None,
        }
    }

    #[tokio::test]
    async fn test_search_without_credential_returns_link() {
        let mut gateway = MockGateway::new();
        gateway.expect_search().never();
        gateway.expect_list().never();
        let service = service(gateway);
        let session = service.new_session();

        let err = service.search(&session, "asr").await.unwrap_err();
        assert!(err.requires_authentication());
        match err {
            CoreError::AuthenticationRequired(directive) => {
                assert!(directive.as_str().contains("client_id=abc"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(session.auth_state().await, AuthState::PendingAuthorization);

        let err = service.list(&session, None).await.unwrap_err();
        assert!(err.requires_authentication());
    }

    #[tokio::test]
    async fn test_empty_search_is_invalid_even_when_signed_out() {
        let mut gateway = MockGateway::new();
        gateway.expect_search().never();
        let service = service(gateway);
        let session = service.new_session();

        let err = service.search(&session, "").await.unwrap_err();
        assert!(matches!(err, CoreError::Gateway(GatewayError::InvalidQuery(_))));
        assert_eq!(session.auth_state().await, AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_search_passes_credential_to_gateway() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_search()
            .withf(|credential, pattern| credential.access_token == "ya29.svc" && pattern == "asr")
            .times(1)
            .returning(|_, _| Ok(vec![record("1", "ASR Polis"), record("2", "ASR Schadeformulier")]));
        let service = service(gateway);
        let session = signed_in(&service).await;

        let files = service.search(&session, "asr").await.unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].name, "ASR Polis");
    }

    #[tokio::test]
    async fn test_list_uses_default_page_size() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_list()
            .with(mockall::predicate::always(), eq(25))
            .times(1)
            .returning(|_, _| Ok(vec![]));
        let service = service(gateway);
        let session = signed_in(&service).await;

        assert!(service.list(&session, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unauthorized_clears_session() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_get_metadata()
            .times(1)
            .returning(|_, _| Err(GatewayError::Unauthorized));
        let service = service(gateway);
        let session = signed_in(&service).await;

        let err = service.metadata(&session, "1").await.unwrap_err();

        assert!(err.requires_authentication());
        assert!(session.current_credential().await.is_none());
    }

    #[tokio::test]
    async fn test_other_gateway_errors_keep_session() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_get_metadata()
            .returning(|_, id| Err(GatewayError::NotFound { file_id: id.to_string() }));
        let service = service(gateway);
        let session = signed_in(&service).await;

        let err = service.metadata(&session, "missing").await.unwrap_err();

        assert!(!err.requires_authentication());
        assert_eq!(session.auth_state().await, AuthState::Authenticated);
    }

    #[tokio::test]
    async fn test_download_streams_through() {
        let mut gateway = MockGateway::new();
        gateway.expect_download().returning(|_, _| {
            let chunks: Vec<provider_google_drive::Result<Bytes>> =
                vec![Ok(Bytes::from_static(b"ab")), Ok(Bytes::from_static(b"c"))];
            Ok(futures::stream::iter(chunks).boxed())
        });
        let service = service(gateway);
        let session = signed_in(&service).await;

        let stream = service.download(&session, "file123").await.unwrap();
        let chunks: Vec<Bytes> = stream.try_collect().await.unwrap();
        assert_eq!(chunks.concat(), b"abc".to_vec());
    }

    #[tokio::test]
    async fn test_settings_round_trip_and_end_session() {
        let service = service(MockGateway::new());
        let session = signed_in(&service).await;

        let mut settings = service.settings(&session).await.unwrap();
        settings.notifications = true;
        service.update_settings(&session, &settings).await.unwrap();
        assert!(service.settings(&session).await.unwrap().notifications);

        service.end_session(&session).await.unwrap();
        assert_eq!(service.settings(&session).await.unwrap(), UserSettings::default());
        assert_eq!(session.auth_state().await, AuthState::Unauthenticated);
    }
}
