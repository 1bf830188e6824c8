//! Prisma AI chat client
//!
//! An HTML-first chat client for a webhook LLM gateway. The server keeps the
//! workspace (chats, project folders, drafts) in memory, persists it to a
//! local data directory and optionally mirrors it to a hosted store with
//! realtime sync.
//!
//! # Architecture
//!
//! - **Server**: Axum handlers rendering HTML pages and fragments for htmx
//! - **Live updates**: one SSE stream per browser tab, fed by the [`events`] bus
//! - **Webhook**: JSON or multipart requests with upload progress
//! - **Storage**: local key-value documents, SurrealDB for hosted history
//!
//! # Modules
//!
//! - [`domain`]: chats, messages, attachments, settings and the model catalog
//! - [`workspace`]: in-memory state and sidebar grouping
//! - [`conversation`]: sending messages and realtime reconciliation
//! - [`webhook`]: outbound client and reply parsing
//! - [`storage`]: local store, encrypted settings and the hosted store
//! - [`api`]: HTTP handlers
//! - [`ui`]: HTML renderers

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::unused_async)]

pub mod api;
pub mod attachments;
pub mod config;
pub mod conversation;
pub mod crypto;
pub mod domain;
pub mod error;
pub mod events;
pub mod server;
pub mod storage;
pub mod telemetry;
pub mod ui;
pub mod webhook;
pub mod workspace;

use std::sync::Arc;

use crate::config::AppConfig;
use conversation::{ConversationService, RealtimeSync};
use events::EventBus;
use storage::{Persistence, SettingsStore};
use workspace::Workspace;

/// Application state shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Global Configuration
    pub config: Arc<AppConfig>,
    /// Chats, projects, drafts and request flags.
    pub workspace: Workspace,
    /// Current settings, encrypted at rest.
    pub settings: SettingsStore,
    /// Local snapshot and hosted mirror.
    pub persistence: Arc<Persistence>,
    /// Message sending.
    pub conversation: ConversationService,
    /// Hosted realtime feed, restarted when settings change.
    pub sync: RealtimeSync,
    /// Live update bus feeding `/events`.
    pub events: EventBus,
}
