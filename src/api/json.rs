use axum::{
    Json,
    extract::{Path, State},
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::AppState;
use crate::domain::{Chat, MODEL_OPTIONS, ModelOption};
use crate::error::AppError;
use crate::storage::StorageMode;

/// GET /healthz
pub async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummaryDto {
    pub id: String,
    pub title: String,
    pub date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub message_count: usize,
}

impl From<&Chat> for ChatSummaryDto {
    fn from(chat: &Chat) -> Self {
        Self {
            id: chat.id.clone(),
            title: chat.title.clone(),
            date: chat.date,
            project_id: chat.project_id.clone(),
            message_count: chat.messages.len(),
        }
    }
}

/// GET /api/chats - Chats, most recent first.
pub async fn list_chats(State(state): State<AppState>) -> Json<Vec<ChatSummaryDto>> {
    Json(state.workspace.chats().iter().map(ChatSummaryDto::from).collect())
}

/// GET /api/chats/{id} - One chat with its messages.
pub async fn get_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Chat>, AppError> {
    state
        .workspace
        .chat(&id)
        .map(Json)
        .ok_or(AppError::NotFound("Chat"))
}

#[derive(Debug, Serialize)]
pub struct ModelsDto {
    pub selected: &'static str,
    pub models: &'static [ModelOption],
}

/// GET /api/models
pub async fn list_models(State(state): State<AppState>) -> Json<ModelsDto> {
    Json(ModelsDto {
        selected: state.workspace.selected_model().id,
        models: MODEL_OPTIONS,
    })
}

#[derive(Debug, Serialize)]
pub struct StatusDto {
    pub storage: StorageMode,
    pub hosted_configured: bool,
    pub webhook_configured: bool,
    pub loading: bool,
    pub uploading: bool,
    pub chats: usize,
    pub projects: usize,
}

/// GET /api/status
pub async fn status(State(state): State<AppState>) -> Json<StatusDto> {
    Json(StatusDto {
        storage: state.persistence.mode(),
        hosted_configured: state.persistence.hosted_configured(),
        webhook_configured: state.settings.get().has_webhook(),
        loading: state.workspace.is_loading(),
        uploading: state.workspace.is_uploading(),
        chats: state.workspace.chats().len(),
        projects: state.workspace.projects().len(),
    })
}
