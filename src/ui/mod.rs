//! HTML rendering.
//!
//! Pages are plain `format!` templates enhanced with htmx: forms are boosted,
//! and the message list, draft previews and send button re-fetch themselves
//! when the server pushes an SSE event. User content goes through
//! [`tera::escape_html`].
//!
//! # Structure
//!
//! - [`layout`]: document shell and page composition
//! - [`sidebar`]: chat navigation, search and project folders
//! - [`chat`]: header, welcome screen, message list and input bar
//! - [`settings`]: settings dialog

pub mod chat;
pub mod layout;
pub mod settings;
pub mod sidebar;

use crate::domain::{Attachment, Chat, ModelOption, Settings};
use crate::storage::StorageMode;
use crate::workspace::SidebarView;

pub use layout::render_page;

/// Everything needed to render the full page.
#[derive(Debug, Clone)]
pub struct PageView {
    pub settings: Settings,
    pub sidebar: SidebarView,
    pub current_chat: Option<Chat>,
    pub model: &'static ModelOption,
    pub drafts: Vec<Attachment>,
    pub notice: Option<String>,
    pub loading: bool,
    pub settings_open: bool,
    pub storage_mode: StorageMode,
}
