//! Settings Storage Abstraction
//!
//! Key-value persistence for user preferences. Values are small and
//! non-sensitive; credentials never pass through this trait.

use async_trait::async_trait;

use crate::error::Result;

/// Key-value settings storage trait
///
/// Keys are opaque strings. Callers that keep settings per session namespace
/// their keys (for example `session:<id>:language`).
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::SettingsStore;
///
/// async fn save_preference(store: &dyn SettingsStore) -> Result<()> {
///     store.set_bool("notifications", true).await?;
///     store.set_string("language", "nl").await
/// }
/// ```
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Store a string value
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a string value
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Store a boolean value
    async fn set_bool(&self, key: &str, value: bool) -> Result<()>;

    /// Retrieve a boolean value
    async fn get_bool(&self, key: &str) -> Result<Option<bool>>;

    /// Delete every key that starts with `prefix`
    async fn delete_prefix(&self, prefix: &str) -> Result<()>;
}
