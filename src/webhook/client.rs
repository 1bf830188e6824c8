//! HTTP client for the chat webhook.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use axum::body::Bytes;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::Stream;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use serde::Serialize;

use super::{WebhookError, parse_reply};
use crate::attachments::payload_size;
use crate::domain::Attachment;

/// Size of the pieces attachment bytes are streamed in.
pub const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Receives upload progress as a whole percentage of attachment bytes sent.
///
/// Called at most once per percent step, never with the same value twice.
pub type ProgressFn = Arc<dyn Fn(f32) + Send + Sync>;

/// Normalize the configured webhook URL.
///
/// Returns `None` when nothing is configured. A missing scheme defaults to `https://`.
#[must_use]
pub fn sanitize_url(raw: &str) -> Option<String> {
    let url = raw.trim();
    if url.is_empty() {
        return None;
    }
    let lower = url.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        Some(url.to_string())
    } else {
        Some(format!("https://{url}"))
    }
}

/// `Basic` authorization value, only when both parts are present.
#[must_use]
pub fn basic_auth_header(username: &str, password: &str) -> Option<String> {
    if username.is_empty() || password.is_empty() {
        return None;
    }
    Some(format!("Basic {}", STANDARD.encode(format!("{username}:{password}"))))
}

/// One outgoing chat message.
#[derive(Debug, Clone)]
pub struct WebhookRequest<'a> {
    pub url: &'a str,
    pub username: &'a str,
    pub password: &'a str,
    pub model: &'a str,
    pub message: &'a str,
    pub chat_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileMetadata<'a> {
    file_name: &'a str,
    file_size: String,
    file_type: &'a str,
    mime_type: &'a str,
    file_extension: &'a str,
    binary_key: String,
}

#[derive(Debug, Clone)]
pub struct WebhookClient {
    http: reqwest::Client,
}

impl WebhookClient {
    pub fn new(timeout: Duration) -> Result<Self, WebhookError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(WebhookError::Client)?;
        Ok(Self { http })
    }

    fn post(&self, request: &WebhookRequest<'_>) -> Result<reqwest::RequestBuilder, WebhookError> {
        let url = reqwest::Url::parse(request.url)?;
        let mut builder = self.http.post(url);
        if let Some(auth) = basic_auth_header(request.username, request.password) {
            builder = builder.header(AUTHORIZATION, auth);
        }
        Ok(builder)
    }

    /// Send a text-only message as JSON.
    pub async fn send_json(&self, request: &WebhookRequest<'_>) -> Result<String, WebhookError> {
        let body = serde_json::json!({
            "model": request.model,
            "message": request.message,
            "chat_id": request.chat_id,
            "files": [],
        });

        let builder = self
            .post(request)?
            .header(CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(&body)?);

        tracing::info!(name: "webhook.request.sent", chat_id = %request.chat_id, model = %request.model, kind = "json", "Sending message to webhook");
        self.finish(builder, request.chat_id).await
    }

    /// Send a message with attachments as `multipart/form-data`.
    ///
    /// Attachment bytes are streamed in [`UPLOAD_CHUNK_SIZE`] pieces and
    /// `progress` is called as they are handed to the connection.
    pub async fn send_multipart(
        &self,
        request: &WebhookRequest<'_>,
        attachments: &[Attachment],
        progress: Option<ProgressFn>,
    ) -> Result<String, WebhookError> {
        let metadata: Vec<FileMetadata<'_>> = attachments
            .iter()
            .enumerate()
            .map(|(index, att)| FileMetadata {
                file_name: &att.name,
                file_size: payload_size(att.size),
                file_type: att.kind.as_str(),
                mime_type: att.mime_type.as_deref().unwrap_or_default(),
                file_extension: att.extension(),
                binary_key: format!("data{index}"),
            })
            .collect();

        let total: u64 = attachments
            .iter()
            .filter_map(|a| a.bytes.as_ref())
            .map(|b| b.len() as u64)
            .sum();
        let tracker = Arc::new(UploadTracker::new(total, progress));

        let mut form = Form::new()
            .text("model", request.model.to_string())
            .text("message", request.message.to_string())
            .text("chat_id", request.chat_id.to_string())
            .text("files", serde_json::to_string(&metadata)?);

        for (index, att) in attachments.iter().enumerate() {
            let Some(bytes) = att.bytes.clone() else {
                continue;
            };
            let length = bytes.len() as u64;
            let body = reqwest::Body::wrap_stream(chunked(bytes, Arc::clone(&tracker)));
            let mut part = Part::stream_with_length(body, length).file_name(att.name.clone());
            if let Some(mime) = att.mime_type.as_deref() {
                part = part.mime_str(mime).map_err(WebhookError::Client)?;
            }
            form = form.part(format!("data{index}"), part);
        }

        let builder = self.post(request)?.multipart(form);

        tracing::info!(
            name: "webhook.request.sent",
            chat_id = %request.chat_id,
            model = %request.model,
            kind = "multipart",
            files = attachments.len(),
            bytes = total,
            "Sending message with attachments to webhook"
        );
        self.finish(builder, request.chat_id).await
    }

    async fn finish(
        &self,
        builder: reqwest::RequestBuilder,
        chat_id: &str,
    ) -> Result<String, WebhookError> {
        let response = builder.send().await.map_err(WebhookError::from_send)?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(name: "webhook.response.error", chat_id = %chat_id, status = status.as_u16(), "Webhook returned an error status");
            return Err(WebhookError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let body = response.text().await.map_err(WebhookError::from_send)?;
        tracing::info!(name: "webhook.response.received", chat_id = %chat_id, status = status.as_u16(), bytes = body.len(), "Webhook replied");
        Ok(parse_reply(&body))
    }
}

struct UploadTracker {
    sent: AtomicU64,
    reported: AtomicU32,
    total: u64,
    progress: Option<ProgressFn>,
}

impl UploadTracker {
    fn new(total: u64, progress: Option<ProgressFn>) -> Self {
        Self {
            sent: AtomicU64::new(0),
            reported: AtomicU32::new(0),
            total,
            progress,
        }
    }

    fn advance(&self, bytes: usize) {
        let sent = self.sent.fetch_add(bytes as u64, Ordering::Relaxed) + bytes as u64;
        let Some(progress) = &self.progress else {
            return;
        };
        if self.total == 0 {
            return;
        }
        let percent = (sent.min(self.total) * 100 / self.total) as u32;
        if self.reported.fetch_max(percent, Ordering::Relaxed) < percent {
            progress(percent as f32);
        }
    }
}

fn chunked(
    bytes: Bytes,
    tracker: Arc<UploadTracker>,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static {
    let chunks: Vec<Bytes> = (0..bytes.len())
        .step_by(UPLOAD_CHUNK_SIZE)
        .map(|start| bytes.slice(start..bytes.len().min(start + UPLOAD_CHUNK_SIZE)))
        .collect();

    futures::stream::iter(chunks.into_iter().map(move |chunk| {
        tracker.advance(chunk.len());
        Ok(chunk)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::sync::Mutex;

    #[test]
    fn test_sanitize_url() {
        assert_eq!(sanitize_url(""), None);
        assert_eq!(sanitize_url("   "), None);
        assert_eq!(
            sanitize_url(" hook.example.com/x ").as_deref(),
            Some("https://hook.example.com/x")
        );
        assert_eq!(
            sanitize_url("HTTP://local:5678").as_deref(),
            Some("HTTP://local:5678")
        );
        assert_eq!(
            sanitize_url("https://secure.example").as_deref(),
            Some("https://secure.example")
        );
    }

    #[test]
    fn test_basic_auth_requires_both_parts() {
        assert_eq!(basic_auth_header("", "p"), None);
        assert_eq!(basic_auth_header("u", ""), None);
        assert_eq!(
            basic_auth_header("user", "pass").as_deref(),
            Some("Basic dXNlcjpwYXNz")
        );
        let unicode = basic_auth_header("юзер", "пароль").unwrap();
        let decoded = STANDARD.decode(unicode.trim_start_matches("Basic ")).unwrap();
        assert_eq!(String::from_utf8(decoded).unwrap(), "юзер:пароль");
    }

    #[tokio::test]
    async fn test_chunked_stream_reports_progress() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let tracker = Arc::new(UploadTracker::new(
            (UPLOAD_CHUNK_SIZE * 2) as u64,
            Some(Arc::new(move |pct| sink.lock().unwrap().push(pct))),
        ));

        let bytes = Bytes::from(vec![7u8; UPLOAD_CHUNK_SIZE * 2]);
        let chunks: Vec<_> = chunked(bytes, tracker).collect().await;

        assert_eq!(chunks.len(), 2);
        assert_eq!(*seen.lock().unwrap(), vec![50.0, 100.0]);
    }

    #[tokio::test]
    async fn test_progress_reports_each_percent_once() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        // 75 MiB in 64 KiB chunks is 1200 chunks.
        let total = 5 * 15 * 1024 * 1024;
        let tracker = Arc::new(UploadTracker::new(
            total as u64,
            Some(Arc::new(move |pct| sink.lock().unwrap().push(pct))),
        ));

        let bytes = Bytes::from(vec![0u8; total]);
        let chunks: Vec<_> = chunked(bytes, tracker).collect().await;
        assert_eq!(chunks.len(), 1200);

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 100);
        assert!(calls.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(calls.last().copied(), Some(100.0));
    }
}
