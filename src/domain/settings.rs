//! User settings edited through the settings modal.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("dark") {
            Self::Dark
        } else {
            Self::Light
        }
    }

    #[must_use]
    pub fn is_dark(self) -> bool {
        self == Self::Dark
    }
}

/// Webhook credentials and profile.
///
/// The password is held in plaintext in memory and encrypted only at rest,
/// see [`crate::storage::SettingsStore`].
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub webhook_url: String,
    pub username: String,
    pub password: String,
    #[serde(rename = "firstName")]
    pub display_name: String,
    /// Identifier of the user in the hosted store (their messenger handle).
    #[serde(rename = "telegramUsername")]
    pub external_user_id: String,
    pub theme: Theme,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("webhook_url", &self.webhook_url)
            .field("username", &self.username)
            .field("password", &if self.password.is_empty() { "" } else { "***" })
            .field("display_name", &self.display_name)
            .field("external_user_id", &self.external_user_id)
            .field("theme", &self.theme)
            .finish()
    }
}

impl Settings {
    /// Name shown in the sidebar profile block.
    #[must_use]
    pub fn sidebar_name(&self) -> &str {
        let handle = self.external_user_id.trim();
        if handle.is_empty() { "Пользователь" } else { handle }
    }

    /// The hosted store key for this user, if one is configured.
    #[must_use]
    pub fn hosted_user(&self) -> Option<&str> {
        let handle = self.external_user_id.trim();
        (!handle.is_empty()).then_some(handle)
    }

    #[must_use]
    pub fn has_webhook(&self) -> bool {
        !self.webhook_url.trim().is_empty()
    }
}

/// A folder grouping chats in the sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Project {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: super::chat::new_id(),
            name: name.into(),
            created_at: chrono::Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_use_stored_field_names() {
        let json = r#"{
            "webhookUrl": "hook.example.com",
            "username": "u",
            "password": "p",
            "firstName": "Anna",
            "telegramUsername": "@anna",
            "theme": "dark"
        }"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.display_name, "Anna");
        assert_eq!(settings.external_user_id, "@anna");
        assert!(settings.theme.is_dark());
    }

    #[test]
    fn test_debug_masks_password() {
        let settings = Settings {
            password: "secret".to_string(),
            ..Settings::default()
        };
        let rendered = format!("{settings:?}");
        assert!(!rendered.contains("secret"));
    }

    #[test]
    fn test_sidebar_name_falls_back() {
        let mut settings = Settings::default();
        assert_eq!(settings.sidebar_name(), "Пользователь");
        assert!(settings.hosted_user().is_none());

        settings.external_user_id = " @ivan ".to_string();
        assert_eq!(settings.sidebar_name(), "@ivan");
        assert_eq!(settings.hosted_user(), Some("@ivan"));
    }
}
