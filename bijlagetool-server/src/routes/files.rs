//! Zoeken, Overzicht, and file transfers.

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::Json;
use core_service::FileRecord;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::Layout;
use crate::error::AppError;
use crate::sessions::BrowserSession;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct OverviewParams {
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct DownloadParams {
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FileList {
    #[serde(flatten)]
    pub layout: Layout,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub count: usize,
    pub files: Vec<FileRecord>,
}

impl FileList {
    fn new(query: Option<String>, files: Vec<FileRecord>) -> Self {
        Self {
            layout: Layout::default(),
            query,
            count: files.len(),
            files,
        }
    }
}

/// `GET /zoeken?q=`
pub async fn search(
    browser: BrowserSession,
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Response {
    let result = state
        .service
        .search(&browser.session, &params.q)
        .await
        .map(|files| Json(FileList::new(Some(params.q.trim().to_string()), files)))
        .map_err(AppError::from);
    (browser.jar, result).into_response()
}

/// `GET /overzicht?limit=`
pub async fn overview(
    browser: BrowserSession,
    State(state): State<AppState>,
    Query(params): Query<OverviewParams>,
) -> Response {
    let result = state
        .service
        .list(&browser.session, params.limit)
        .await
        .map(|files| Json(FileList::new(None, files)))
        .map_err(AppError::from);
    (browser.jar, result).into_response()
}

/// `GET /bestanden/{id}`
pub async fn metadata(
    browser: BrowserSession,
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Response {
    let result = state
        .service
        .metadata(&browser.session, &file_id)
        .await
        .map(Json)
        .map_err(AppError::from);
    (browser.jar, result).into_response()
}

/// `GET /bestanden/{id}/download?name=`
///
/// The body is relayed chunk by chunk as it arrives.
pub async fn download(
    browser: BrowserSession,
    State(state): State<AppState>,
    Path(file_id): Path<String>,
    Query(params): Query<DownloadParams>,
) -> Response {
    match state.service.download(&browser.session, &file_id).await {
        Ok(stream) => {
            info!(session_id = %browser.session.id(), file_id = %file_id, "Relaying download");
            let filename = attachment_name(params.name.as_deref().unwrap_or(&file_id));
            (
                browser.jar,
                [
                    (CONTENT_TYPE, "application/octet-stream".to_string()),
                    (
                        CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}\"", filename),
                    ),
                ],
                Body::from_stream(stream),
            )
                .into_response()
        }
        Err(err) => (browser.jar, AppError::from(err)).into_response(),
    }
}

/// File name safe to put inside a quoted header parameter.
fn attachment_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ' ' | '(' | ')') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches(|c| c == '.' || c == ' ').is_empty() {
        "download".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_name() {
        assert_eq!(attachment_name("polis 2023.pdf"), "polis 2023.pdf");
        assert_eq!(attachment_name("a\"b\r\nc.pdf"), "a_b__c.pdf");
        assert_eq!(attachment_name("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(attachment_name("offerte-é.docx"), "offerte-_.docx");
        assert_eq!(attachment_name(" .. "), "download");
    }
}
