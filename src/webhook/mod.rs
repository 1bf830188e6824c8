//! Outbound calls to the user's chat webhook.
//!
//! The webhook is an arbitrary HTTP endpoint acting as the LLM gateway. Text
//! messages go out as JSON; messages with attachments go out as
//! `multipart/form-data` with one binary part per file.

mod client;
mod reply;

pub use client::{
    ProgressFn, UPLOAD_CHUNK_SIZE, WebhookClient, WebhookRequest, basic_auth_header, sanitize_url,
};
pub use reply::{EMPTY_RESPONSE, parse_reply};

/// Appended to connection failures shown in the chat.
pub const CONNECTION_HINT: &str = " (Проверьте CORS или URL вебхука)";

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Server returned {status} {reason}")]
    Status { status: u16, reason: String },

    #[error("Failed to fetch")]
    Network(#[source] reqwest::Error),

    #[error("Request timed out")]
    Timeout(#[source] reqwest::Error),

    #[error("HTTP client error: {0}")]
    Client(#[source] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WebhookError {
    fn from_send(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error)
        } else if error.is_connect() || error.is_request() || error.is_body() {
            Self::Network(error)
        } else {
            Self::Client(error)
        }
    }

    /// The endpoint could not be reached at all.
    #[must_use]
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Text shown after `**Ошибка:**` in the chat.
    #[must_use]
    pub fn chat_text(&self) -> String {
        let text = self.to_string();
        if self.is_connection() {
            format!("{}{CONNECTION_HINT}", text.trim_end())
        } else {
            text.trim_end().to_string()
        }
    }
}
