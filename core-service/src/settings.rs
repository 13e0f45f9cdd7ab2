//! Per-session user preferences kept in the host's [`SettingsStore`].

use crate::error::{CoreError, Result};
use bridge_traits::storage::SettingsStore;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_LANGUAGE: &str = "nl";

pub const SUPPORTED_LANGUAGES: &[&str] = &["nl", "en"];

/// Preferences shown on the settings page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettings {
    pub notifications: bool,
    pub language: String,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            notifications: false,
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

fn key_prefix(session_id: &str) -> String {
    format!("session.{}.", session_id)
}

impl UserSettings {
    /// Stored preferences for `session_id`, defaults for anything unset.
    pub async fn load(store: &dyn SettingsStore, session_id: &str) -> Result<Self> {
        let prefix = key_prefix(session_id);
        let defaults = Self::default();

        Ok(Self {
            notifications: store
                .get_bool(&format!("{}notifications", prefix))
                .await?
                .unwrap_or(defaults.notifications),
            language: store
                .get_string(&format!("{}language", prefix))
                .await?
                .unwrap_or(defaults.language),
        })
    }

    pub async fn save(&self, store: &dyn SettingsStore, session_id: &str) -> Result<()> {
        self.validate()?;

        let prefix = key_prefix(session_id);
        store
            .set_bool(&format!("{}notifications", prefix), self.notifications)
            .await?;
        store
            .set_string(&format!("{}language", prefix), &self.language)
            .await?;

        debug!(session_id, "Settings saved");
        Ok(())
    }

    /// Drop everything stored for an ended session.
    pub async fn forget(store: &dyn SettingsStore, session_id: &str) -> Result<()> {
        store.delete_prefix(&key_prefix(session_id)).await?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !SUPPORTED_LANGUAGES.contains(&self.language.as_str()) {
            return Err(CoreError::InvalidSetting {
                field: "language".to_string(),
                message: format!("expected one of {}", SUPPORTED_LANGUAGES.join(", ")),
            });
        }
        Ok(())
    }
}
