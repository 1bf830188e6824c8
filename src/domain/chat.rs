//! Chats, messages and attachments.
//!
//! Field names are serialized in the camelCase layout the stored history has
//! always used, so existing `prisma_chats` documents keep loading.

use axum::body::Bytes;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum number of characters kept from the first message when titling a chat.
pub const TITLE_MAX_CHARS: usize = 30;

/// Generate a fresh identifier for chats, messages and projects.
#[must_use]
pub fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Display timestamp in the `hh:mm AM` style shown next to messages.
#[must_use]
pub fn display_timestamp(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%I:%M %p").to_string()
}

/// Derive a chat title from the first message (or attachment name).
#[must_use]
pub fn title_from(source: &str) -> String {
    if source.chars().count() > TITLE_MAX_CHARS {
        let head: String = source.chars().take(TITLE_MAX_CHARS).collect();
        format!("{head}...")
    } else {
        source.to_string()
    }
}

/// A conversation thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: String,
    pub title: String,
    /// Last activity time; drives the sidebar recency groups.
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

impl Chat {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            title: title.into(),
            date: Utc::now(),
            messages: Vec::new(),
            project_id: None,
        }
    }

    /// Whether the chat title or any message mentions `needle` (already lowercased).
    #[must_use]
    pub fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self
                .messages
                .iter()
                .any(|m| m.content.to_lowercase().contains(needle))
    }

    #[must_use]
    pub fn has_message(&self, message_id: &str) -> bool {
        self.messages.iter().any(|m| m.id == message_id)
    }
}

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "ai", alias = "assistant")]
    Assistant,
}

/// A single message in a chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    /// Older history stored a single attachment; folded into `attachments` on read.
    #[serde(default, skip_serializing)]
    attachment: Option<Attachment>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>, attachments: Vec<Attachment>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            role,
            content: content.into(),
            timestamp: display_timestamp(now),
            created_at: now,
            attachments,
            attachment: None,
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>, attachments: Vec<Attachment>) -> Self {
        Self::new(Role::User, content, attachments)
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content, Vec::new())
    }

    /// Rebuild a message read back from storage.
    #[must_use]
    pub fn restore(
        id: String,
        role: Role,
        content: String,
        timestamp: String,
        created_at: DateTime<Utc>,
        attachments: Vec<Attachment>,
    ) -> Self {
        Self {
            id,
            role,
            content,
            timestamp,
            created_at,
            attachments,
            attachment: None,
        }
    }

    #[must_use]
    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }

    /// Attachments in a uniform shape, including the legacy single field.
    #[must_use]
    pub fn all_attachments(&self) -> Vec<&Attachment> {
        if self.attachments.is_empty() {
            self.attachment.iter().collect()
        } else {
            self.attachments.iter().collect()
        }
    }

    /// Move a legacy single attachment into the list.
    pub fn normalize(&mut self) {
        if let Some(legacy) = self.attachment.take()
            && self.attachments.is_empty()
        {
            self.attachments.push(legacy);
        }
    }
}

/// Kind of attachment, which controls how it is previewed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    File,
    Image,
}

impl AttachmentKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Image => "image",
        }
    }
}

/// Which picker the attachment came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    File,
    Image,
    Camera,
}

impl SourceType {
    /// Parse the `source` form field; unknown values mean "no override".
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "file" => Some(Self::File),
            "image" => Some(Self::Image),
            "camera" => Some(Self::Camera),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    #[default]
    Idle,
    Pending,
    Uploading,
    Completed,
    Error,
}

/// A file or image attached to a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(rename = "type")]
    pub kind: AttachmentKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Base64 data URL used for previews.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    /// Raw file contents for the binary upload; never persisted.
    #[serde(skip)]
    pub bytes: Option<Bytes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<SourceType>,
    #[serde(default)]
    pub upload_status: UploadStatus,
    #[serde(default)]
    pub upload_progress: f32,
}

impl Attachment {
    /// Extension as sent to the webhook (text after the last dot).
    #[must_use]
    pub fn extension(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or_default()
    }

    #[must_use]
    pub fn is_image(&self) -> bool {
        self.kind == AttachmentKind::Image
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_truncation_counts_characters() {
        assert_eq!(title_from("Hello"), "Hello");
        let long = "Привет, расскажи мне про квантовую физику подробно";
        let title = title_from(long);
        assert!(title.ends_with("..."));
        assert_eq!(title.chars().count(), TITLE_MAX_CHARS + 3);
    }

    #[test]
    fn test_role_accepts_legacy_and_new_names() {
        let ai: Role = serde_json::from_str("\"ai\"").unwrap();
        let assistant: Role = serde_json::from_str("\"assistant\"").unwrap();
        assert_eq!(ai, Role::Assistant);
        assert_eq!(assistant, Role::Assistant);
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"ai\"");
    }

    #[test]
    fn test_legacy_single_attachment_is_normalized() {
        let json = r#"{
            "id": "m1",
            "role": "user",
            "content": "see file",
            "timestamp": "10:00 AM",
            "attachment": { "type": "file", "name": "notes.txt", "size": 12 }
        }"#;
        let mut message: Message = serde_json::from_str(json).unwrap();
        assert_eq!(message.all_attachments().len(), 1);

        message.normalize();
        assert_eq!(message.attachments.len(), 1);
        assert_eq!(message.attachments[0].name, "notes.txt");

        let out = serde_json::to_value(&message).unwrap();
        assert!(out.get("attachment").is_none());
        assert_eq!(out["attachments"][0]["type"], "file");
    }

    #[test]
    fn test_chat_search_matches_title_and_content() {
        let mut chat = Chat::new("Recipes");
        chat.messages.push(Message::user("How do I bake Bread?", Vec::new()));

        assert!(chat.matches("recipes"));
        assert!(chat.matches("bread"));
        assert!(!chat.matches("quantum"));
    }

    #[test]
    fn test_raw_bytes_are_not_serialized() {
        let attachment = Attachment {
            kind: AttachmentKind::Image,
            name: "cat.png".to_string(),
            size: Some(3),
            mime_type: Some("image/png".to_string()),
            data: None,
            bytes: Some(Bytes::from_static(b"abc")),
            source_type: Some(SourceType::Image),
            upload_status: UploadStatus::Idle,
            upload_progress: 0.0,
        };
        let value = serde_json::to_value(&attachment).unwrap();
        assert!(value.get("bytes").is_none());
        assert_eq!(value["sourceType"], "image");
        assert_eq!(attachment.extension(), "png");
    }
}
