//! In-memory settings store

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::SettingsStore,
};
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::{debug, error};

#[derive(Debug, Clone, PartialEq)]
enum SettingValue {
    String(String),
    Bool(bool),
}

impl SettingValue {
    fn type_name(&self) -> &'static str {
        match self {
            SettingValue::String(_) => "string",
            SettingValue::Bool(_) => "bool",
        }
    }
}

/// Process-local settings store.
///
/// Values keep their type; reading a key back as a different type is an
/// error.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    values: RwLock<BTreeMap<String, SettingValue>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn set_value(&self, key: &str, value: SettingValue) -> Result<()> {
        let value_type = value.type_name();
        self.values.write().await.insert(key.to_string(), value);
        debug!(key = key, value_type = value_type, "Stored setting");
        Ok(())
    }

    fn type_mismatch(key: &str, expected: &str, actual: &SettingValue) -> BridgeError {
        error!(
            key = key,
            expected = expected,
            actual = actual.type_name(),
            "Type mismatch"
        );
        BridgeError::OperationFailed(format!(
            "Type mismatch: expected {}, got {}",
            expected,
            actual.type_name()
        ))
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.set_value(key, SettingValue::String(value.to_string()))
            .await
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        match self.values.read().await.get(key) {
            Some(SettingValue::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(Self::type_mismatch(key, "string", other)),
            None => Ok(None),
        }
    }

    async fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        self.set_value(key, SettingValue::Bool(value)).await
    }

    async fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.values.read().await.get(key) {
            Some(SettingValue::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(Self::type_mismatch(key, "bool", other)),
            None => Ok(None),
        }
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<()> {
        let mut values = self.values.write().await;
        values.retain(|key, _| !key.starts_with(prefix));
        debug!(prefix = prefix, "Deleted settings by prefix");
        Ok(())
    }
}
