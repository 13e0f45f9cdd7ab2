//! Google Drive API response types
//!
//! Data structures for deserializing Google Drive API v3 responses, and the
//! provider-neutral [`FileRecord`] handed to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Google Drive API file resource, limited to the requested fields
///
/// See: https://developers.google.com/drive/api/v3/reference/files#resource
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,

    pub name: String,

    pub mime_type: String,

    /// RFC 3339
    pub modified_time: Option<String>,

    /// Decimal string; omitted for folders and Google Docs
    pub size: Option<String>,
}

/// Google Drive API files.list response
///
/// See: https://developers.google.com/drive/api/v3/reference/files/list
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesListResponse {
    #[serde(default)]
    pub files: Vec<DriveFile>,

    /// Present when more results exist than fit in one page
    pub next_page_token: Option<String>,

    #[serde(default)]
    pub incomplete_search: bool,
}

/// Error envelope returned with non-2xx statuses
#[derive(Debug, Deserialize)]
pub struct DriveErrorResponse {
    pub error: DriveErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct DriveErrorBody {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
}

/// Metadata of one remote file. Always fetched live; never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub modified_at: Option<DateTime<Utc>>,
    pub size: Option<u64>,
}

impl FileRecord {
    pub fn is_folder(&self) -> bool {
        self.mime_type == "application/vnd.google-apps.folder"
    }
}

impl From<DriveFile> for FileRecord {
    fn from(file: DriveFile) -> Self {
        Self {
            modified_at: file
                .modified_time
                .as_deref()
                .and_then(|time| DateTime::parse_from_rfc3339(time).ok())
                .map(|time| time.with_timezone(&Utc)),
            size: file.size.and_then(|size| size.parse().ok()),
            id: file.id,
            name: file.name,
            mime_type: file.mime_type,
        }
    }
}
