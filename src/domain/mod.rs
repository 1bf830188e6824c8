//! Plain records shared by the workspace, storage and UI layers.

pub mod catalog;
pub mod chat;
pub mod settings;

pub use catalog::{
    DEFAULT_MODEL_ID, MODEL_OPTIONS, ModelOption, SUGGESTION_CARDS, SuggestionCard, find_model,
};
pub use chat::{
    Attachment, AttachmentKind, Chat, Message, Role, SourceType, UploadStatus, display_timestamp,
    title_from,
};
pub use settings::{Project, Settings, Theme};
