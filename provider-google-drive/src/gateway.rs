//! Provider-neutral file access contract.

use async_trait::async_trait;
use bytes::Bytes;
use core_auth::Credential;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::types::FileRecord;

/// Lazy, finite, non-restartable sequence of content chunks.
///
/// Calling `download` again starts a fresh transfer.
pub type FileStream = BoxStream<'static, Result<Bytes>>;

/// Read-only access to a user's remote files.
///
/// Stateless: every call takes the credential to use and makes at most one
/// remote request. Implementations never refresh or retry.
#[async_trait]
pub trait FileGateway: Send + Sync {
    /// Files whose name contains `pattern`, in the order the remote returns
    /// them. An empty pattern fails with `InvalidQuery` before the credential
    /// is looked at.
    async fn search(&self, credential: &Credential, pattern: &str) -> Result<Vec<FileRecord>>;

    /// Most recently modified files, at most `page_size` of them.
    async fn list(&self, credential: &Credential, page_size: u32) -> Result<Vec<FileRecord>>;

    async fn get_metadata(&self, credential: &Credential, file_id: &str) -> Result<FileRecord>;

    async fn download(&self, credential: &Credential, file_id: &str) -> Result<FileStream>;
}
