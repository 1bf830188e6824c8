//! Application state owner.
//!
//! The workspace holds everything the page renders: chats and projects, the
//! current selection, the chosen model, draft attachments, the upload notice
//! and the in-flight flag. It is shared between handlers and background
//! tasks through cheap clones.
//!
//! # Example
//!
//! ```rust
//! use prisma_chat::domain::Message;
//! use prisma_chat::workspace::Workspace;
//!
//! let workspace = Workspace::new();
//! let (chat_id, created) = workspace.create_chat_if_needed("Hello!");
//! assert!(created);
//! workspace.add_message(&chat_id, Message::user("Hello!", Vec::new()));
//!
//! assert_eq!(workspace.chat(&chat_id).unwrap().messages.len(), 1);
//! ```

mod sidebar;
mod state;

pub use sidebar::{ChatSummary, ProjectFolder, Recency, SidebarView, build_sidebar, search};
pub use state::{NOTICE_TTL, PendingUpload, Workspace};
