//! Workspace events pushed to the browser over Server-Sent Events.

use std::convert::Infallible;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::storage::StorageMode;

/// Something in the workspace changed that open pages should react to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkspaceEvent {
    MessageAdded { chat_id: String, message_id: String },
    RequestStarted { chat_id: String },
    RequestFinished { chat_id: String, ok: bool },
    UploadProgress { percent: f32 },
    ChatsChanged,
    StorageMode { mode: StorageMode },
}

impl WorkspaceEvent {
    /// SSE event name, used by `hx-trigger="sse:<name>"` on the page.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::MessageAdded { .. } => "message.added",
            Self::RequestStarted { .. } => "request.started",
            Self::RequestFinished { .. } => "request.finished",
            Self::UploadProgress { .. } => "upload.progress",
            Self::ChatsChanged => "chats.changed",
            Self::StorageMode { .. } => "storage.mode",
        }
    }
}

/// Fan-out of workspace events to every connected page.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<WorkspaceEvent>,
}

impl EventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event; having no listeners is fine.
    pub fn emit(&self, event: WorkspaceEvent) {
        tracing::trace!(event = event.name(), "Workspace event");
        let _ = self.tx.send(event);
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<WorkspaceEvent> {
        self.tx.subscribe()
    }

    /// Stream of events for one SSE client. Lagged receivers skip ahead.
    pub fn stream(&self) -> impl Stream<Item = WorkspaceEvent> + Send + use<> {
        BroadcastStream::new(self.tx.subscribe()).filter_map(|item| async move {
            match item {
                Ok(event) => Some(event),
                Err(e) => {
                    tracing::debug!(error = %e, "SSE client lagged behind");
                    None
                }
            }
        })
    }
}

pub fn build_sse_response<S>(stream: S) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send>
where
    S: Stream<Item = WorkspaceEvent> + Send + 'static,
{
    let stream = stream.map(|event| {
        let json = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
        Ok(Event::default().event(event.name()).data(json))
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_and_payload() {
        let event = WorkspaceEvent::MessageAdded {
            chat_id: "c1".to_string(),
            message_id: "m1".to_string(),
        };
        assert_eq!(event.name(), "message.added");

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "message_added");
        assert_eq!(json["chat_id"], "c1");

        let mode = WorkspaceEvent::StorageMode {
            mode: StorageMode::Offline,
        };
        assert_eq!(serde_json::to_value(&mode).unwrap()["mode"], "offline");
    }

    #[tokio::test]
    async fn test_subscribers_receive_emitted_events() {
        let bus = EventBus::new(8);
        let stream = bus.stream();
        futures::pin_mut!(stream);

        bus.emit(WorkspaceEvent::ChatsChanged);
        assert_eq!(stream.next().await, Some(WorkspaceEvent::ChatsChanged));
    }

    #[tokio::test]
    async fn test_stream_outlives_bus_handle() {
        let bus = EventBus::new(8);
        let handle = bus.clone();
        let stream = handle.stream();
        drop(handle);
        futures::pin_mut!(stream);

        bus.emit(WorkspaceEvent::ChatsChanged);
        assert_eq!(stream.next().await, Some(WorkspaceEvent::ChatsChanged));
    }
}
