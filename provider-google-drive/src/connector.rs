//! Google Drive API connector implementation
//!
//! Implements [`FileGateway`] for Google Drive API v3.

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use bridge_traits::time::Clock;
use core_auth::Credential;
use core_runtime::config::{
    AppConfig, DEFAULT_DRIVE_API_BASE, DEFAULT_REQUEST_TIMEOUT, MAX_PAGE_SIZE,
};
use futures::{StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::{GatewayError, Result};
use crate::gateway::{FileGateway, FileStream};
use crate::query;
use crate::types::{DriveErrorResponse, DriveFile, FileRecord, FilesListResponse};

/// Fields to request for file resources
const FILE_FIELDS: &str = "id,name,mimeType,modifiedTime,size";

/// Newest first, for the overview
const RECENT_FIRST: &str = "modifiedTime desc";

/// Content transfers may take far longer than metadata calls.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// Google Drive API connector
///
/// # Features
///
/// - Name search with escaped query literals
/// - Recent-files listing
/// - Streaming downloads
/// - One attempt per call with a bounded timeout
///
/// # Example
///
/// ```ignore
/// use provider_google_drive::{DriveGateway, FileGateway};
///
/// let gateway = DriveGateway::new(http_client, clock);
/// let files = gateway.search(&credential, "polis").await?;
/// ```
pub struct DriveGateway {
    http_client: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
    api_base: String,
    request_timeout: Duration,
}

impl DriveGateway {
    pub fn new(http_client: Arc<dyn HttpClient>, clock: Arc<dyn Clock>) -> Self {
        Self {
            http_client,
            clock,
            api_base: DEFAULT_DRIVE_API_BASE.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Gateway sharing the application's HTTP client, clock and timeouts.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.http_client.clone(), config.clock.clone())
            .with_api_base(config.drive_api_base.clone())
            .with_request_timeout(config.request_timeout)
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Reject credentials that are already expired without a round trip.
    fn ensure_live(&self, credential: &Credential) -> Result<()> {
        if credential.is_expired_at(self.clock.now()) {
            debug!("Credential expired, skipping remote call");
            return Err(GatewayError::Unauthorized);
        }
        Ok(())
    }

    fn file_url(&self, file_id: &str) -> Result<String> {
        if file_id.trim().is_empty() {
            return Err(GatewayError::InvalidQuery(
                "file id must not be empty".to_string(),
            ));
        }
        Ok(format!(
            "{}/files/{}",
            self.api_base,
            urlencoding::encode(file_id)
        ))
    }

    fn get(&self, credential: &Credential, url: String, timeout: Duration) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, url)
            .bearer_token(credential.access_token.as_str())
            .timeout(timeout)
    }

    /// Execute a metadata request and decode its JSON body.
    async fn fetch_json<T: DeserializeOwned>(
        &self,
        credential: &Credential,
        url: String,
        file_id: Option<&str>,
    ) -> Result<T> {
        let request = self
            .get(credential, url, self.request_timeout)
            .header("Accept", "application/json");

        let response = self.http_client.execute(request).await?;
        if !response.is_success() {
            return Err(status_error(response.status, &response.body, file_id));
        }

        serde_json::from_slice(&response.body).map_err(|e| GatewayError::Parse(e.to_string()))
    }

    async fn list_files(
        &self,
        credential: &Credential,
        query: &str,
        page_size: u32,
        order_by: Option<&str>,
    ) -> Result<Vec<FileRecord>> {
        let mut url = format!(
            "{}/files?q={}&pageSize={}&fields={}",
            self.api_base,
            urlencoding::encode(query),
            page_size.clamp(1, MAX_PAGE_SIZE),
            urlencoding::encode(&format!("nextPageToken,incompleteSearch,files({})", FILE_FIELDS))
        );
        if let Some(order_by) = order_by {
            url.push_str(&format!("&orderBy={}", urlencoding::encode(order_by)));
        }

        let response: FilesListResponse = self.fetch_json(credential, url, None).await?;
        if response.incomplete_search {
            warn!("Drive reported an incomplete search");
        }
        if response.next_page_token.is_some() {
            debug!("More results available than requested");
        }

        Ok(response.files.into_iter().map(FileRecord::from).collect())
    }
}

/// Map a non-2xx status to a gateway error, using the API's own message.
fn status_error(status: u16, body: &[u8], file_id: Option<&str>) -> GatewayError {
    let message = serde_json::from_slice::<DriveErrorResponse>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_default();

    warn!(status, message = %message, "Drive API request failed");

    match (status, file_id) {
        (401, _) => GatewayError::Unauthorized,
        (404, Some(file_id)) => GatewayError::NotFound {
            file_id: file_id.to_string(),
        },
        _ => GatewayError::RemoteFailure {
            status,
            message: if message.is_empty() {
                format!("HTTP {}", status)
            } else {
                message
            },
        },
    }
}

#[async_trait]
impl FileGateway for DriveGateway {
    #[instrument(skip(self, credential))]
    async fn search(&self, credential: &Credential, pattern: &str) -> Result<Vec<FileRecord>> {
        let query = query::name_contains(pattern)?;
        self.ensure_live(credential)?;

        let files = self
            .list_files(credential, &query, MAX_PAGE_SIZE, None)
            .await?;

        info!(count = files.len(), "Search completed");
        Ok(files)
    }

    #[instrument(skip(self, credential))]
    async fn list(&self, credential: &Credential, page_size: u32) -> Result<Vec<FileRecord>> {
        self.ensure_live(credential)?;

        let files = self
            .list_files(credential, query::NOT_TRASHED, page_size, Some(RECENT_FIRST))
            .await?;

        info!(count = files.len(), "Listed recent files");
        Ok(files)
    }

    #[instrument(skip(self, credential))]
    async fn get_metadata(&self, credential: &Credential, file_id: &str) -> Result<FileRecord> {
        let url = format!(
            "{}?fields={}",
            self.file_url(file_id)?,
            urlencoding::encode(FILE_FIELDS)
        );
        self.ensure_live(credential)?;

        let file: DriveFile = self.fetch_json(credential, url, Some(file_id)).await?;
        Ok(file.into())
    }

    #[instrument(skip(self, credential))]
    async fn download(&self, credential: &Credential, file_id: &str) -> Result<FileStream> {
        let url = format!("{}?alt=media", self.file_url(file_id)?);
        self.ensure_live(credential)?;

        let request = self.get(credential, url, DOWNLOAD_TIMEOUT);
        let response = self.http_client.execute_stream(request).await?;

        if !response.is_success() {
            let status = response.status;
            let body = response.collect().await.unwrap_or_default();
            return Err(status_error(status, &body, Some(file_id)));
        }

        info!("Download started");
        Ok(response.body.map_err(GatewayError::from).boxed())
    }
}
