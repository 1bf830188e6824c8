//! Settings persistence with the password encrypted at rest.

use std::sync::{Arc, RwLock};

use serde_json::Value;

use super::{LocalStore, StorageError, local::SETTINGS_KEY};
use crate::crypto::SecretBox;
use crate::domain::Settings;

/// Holds the current settings and writes them to the local store.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    store: LocalStore,
    secrets: SecretBox,
    current: Arc<RwLock<Settings>>,
}

impl SettingsStore {
    /// Load stored settings layered over `defaults`.
    ///
    /// Fields missing from the stored document keep their default value, so
    /// documents written before a field existed still load.
    pub async fn load(store: LocalStore, secrets: SecretBox, defaults: Settings) -> Self {
        let settings = match read_settings(&store, &secrets, &defaults).await {
            Ok(Some(settings)) => settings,
            Ok(None) => defaults,
            Err(e) => {
                tracing::error!(error = %e, "Failed to parse settings");
                defaults
            }
        };

        Self {
            store,
            secrets,
            current: Arc::new(RwLock::new(settings)),
        }
    }

    #[must_use]
    pub fn get(&self) -> Settings {
        self.current.read().unwrap().clone()
    }

    /// Replace the settings and persist them.
    pub async fn save(&self, settings: Settings) -> Result<(), StorageError> {
        *self.current.write().unwrap() = settings.clone();

        let mut to_store = settings;
        if !to_store.password.is_empty() {
            to_store.password = self.secrets.encrypt(&to_store.password).await;
        }
        self.store.set_json(SETTINGS_KEY, &to_store).await?;
        tracing::info!(name: "settings.saved", webhook_configured = to_store.has_webhook(), "Settings saved");
        Ok(())
    }
}

async fn read_settings(
    store: &LocalStore,
    secrets: &SecretBox,
    defaults: &Settings,
) -> Result<Option<Settings>, StorageError> {
    let Some(raw) = store.get(SETTINGS_KEY).await? else {
        return Ok(None);
    };

    let mut stored: Value = serde_json::from_str(&raw)?;
    if let Some(Value::String(sealed)) = stored.get("password")
        && !sealed.is_empty()
    {
        let plain = secrets.decrypt(sealed).await;
        stored["password"] = Value::String(plain);
    }

    let mut merged = serde_json::to_value(defaults)?;
    if let (Value::Object(base), Value::Object(overrides)) = (&mut merged, stored) {
        for (key, value) in overrides {
            base.insert(key, value);
        }
    }
    Ok(Some(serde_json::from_value(merged)?))
}
