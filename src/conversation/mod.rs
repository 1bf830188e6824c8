//! Message sending and realtime reconciliation.
//!
//! Sending is optimistic: the user's message is appended and persisted
//! before the webhook is called, and the reply (or error) is appended when
//! the background request finishes.

mod sync;

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::domain::{Attachment, Message};
use crate::events::{EventBus, WorkspaceEvent};
use crate::storage::{Change, Persistence, SettingsStore};
use crate::webhook::{ProgressFn, WebhookClient, WebhookRequest, sanitize_url};
use crate::workspace::Workspace;

pub use sync::RealtimeSync;

/// Chat title used when a message has neither text nor a named file.
pub const FALLBACK_TITLE: &str = "File Upload";

/// What happened to a send request.
#[derive(Debug)]
pub enum SendOutcome {
    /// Nothing to send, or a send/upload is already running.
    Ignored,
    /// No webhook URL configured; the settings dialog should open.
    SettingsRequired,
    /// The user message was appended and the webhook call is running.
    Dispatched {
        chat_id: String,
        task: JoinHandle<()>,
    },
}

#[derive(Debug, Clone)]
pub struct ConversationService {
    workspace: Workspace,
    settings: SettingsStore,
    persistence: Arc<Persistence>,
    webhook: WebhookClient,
    events: EventBus,
}

impl ConversationService {
    #[must_use]
    pub fn new(
        workspace: Workspace,
        settings: SettingsStore,
        persistence: Arc<Persistence>,
        webhook: WebhookClient,
        events: EventBus,
    ) -> Self {
        Self {
            workspace,
            settings,
            persistence,
            webhook,
            events,
        }
    }

    /// Send `text` together with the current drafts.
    pub async fn send_message(&self, text: &str) -> SendOutcome {
        let drafts = self.workspace.drafts();
        let has_text = !text.trim().is_empty();
        if (!has_text && drafts.is_empty()) || self.workspace.is_loading() {
            return SendOutcome::Ignored;
        }

        let settings = self.settings.get();
        let Some(url) = sanitize_url(&settings.webhook_url) else {
            tracing::info!("Webhook URL missing, asking for settings");
            return SendOutcome::SettingsRequired;
        };

        if self.workspace.is_uploading() || !self.workspace.begin_request() {
            return SendOutcome::Ignored;
        }

        let title_source = if has_text {
            text
        } else {
            drafts.first().map_or(FALLBACK_TITLE, |d| d.name.as_str())
        };
        let (chat_id, created) = self.workspace.create_chat_if_needed(title_source);
        if created {
            self.events.emit(WorkspaceEvent::ChatsChanged);
        }

        let message = Message::user(text, drafts.iter().map(without_bytes).collect());
        let message_id = message.id.clone();
        self.workspace.add_message(&chat_id, message);
        self.events.emit(WorkspaceEvent::MessageAdded {
            chat_id: chat_id.clone(),
            message_id: message_id.clone(),
        });

        self.workspace.clear_notice();
        if !drafts.is_empty() {
            self.workspace.mark_drafts_uploading();
        }
        self.events.emit(WorkspaceEvent::RequestStarted {
            chat_id: chat_id.clone(),
        });

        self.persistence
            .persist(Change::MessageAppended {
                chat_id: chat_id.clone(),
                message_id,
            })
            .await;

        let service = self.clone();
        let task_chat_id = chat_id.clone();
        let text = text.to_string();
        let task = tokio::spawn(async move {
            service
                .deliver(
                    &url,
                    &settings.username,
                    &settings.password,
                    &task_chat_id,
                    &text,
                    drafts,
                )
                .await;
        });

        SendOutcome::Dispatched { chat_id, task }
    }

    async fn deliver(
        &self,
        url: &str,
        username: &str,
        password: &str,
        chat_id: &str,
        text: &str,
        drafts: Vec<Attachment>,
    ) {
        let model = self.workspace.selected_model();
        let request = WebhookRequest {
            url,
            username,
            password,
            model: model.id,
            message: text,
            chat_id,
        };

        let result = if drafts.is_empty() {
            self.webhook.send_json(&request).await
        } else {
            self.webhook
                .send_multipart(&request, &drafts, Some(self.progress_sink()))
                .await
        };

        let ok = result.is_ok();
        let reply = match result {
            Ok(reply) => {
                if !drafts.is_empty() {
                    self.workspace.clear_drafts();
                }
                Message::assistant(reply)
            }
            Err(e) => {
                tracing::error!(name: "webhook.request.failed", chat_id = %chat_id, error = %e, "Error sending message");
                if !drafts.is_empty() {
                    self.workspace.mark_drafts_failed();
                }
                Message::assistant(format!("**Ошибка:** {}", e.chat_text()))
            }
        };

        let message_id = reply.id.clone();
        self.workspace.add_message(chat_id, reply);
        self.workspace.finish_request();

        self.events.emit(WorkspaceEvent::MessageAdded {
            chat_id: chat_id.to_string(),
            message_id: message_id.clone(),
        });
        self.events.emit(WorkspaceEvent::RequestFinished {
            chat_id: chat_id.to_string(),
            ok,
        });

        self.persistence
            .persist(Change::MessageAppended {
                chat_id: chat_id.to_string(),
                message_id,
            })
            .await;
    }

    fn progress_sink(&self) -> ProgressFn {
        let workspace = self.workspace.clone();
        let events = self.events.clone();
        Arc::new(move |percent| {
            workspace.set_draft_progress(percent);
            events.emit(WorkspaceEvent::UploadProgress { percent });
        })
    }
}

/// Copy of a draft for the message history, without the raw bytes.
fn without_bytes(draft: &Attachment) -> Attachment {
    Attachment {
        bytes: None,
        ..draft.clone()
    }
}
