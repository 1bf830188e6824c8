use axum::{
    Form,
    extract::{Path, State},
    response::Redirect,
};
use serde::Deserialize;

use super::{back_to_current, see_other};
use crate::AppState;
use crate::error::AppError;
use crate::events::WorkspaceEvent;
use crate::storage::Change;

/// POST /chats/new - Leave the current chat; the next message starts a new one.
pub async fn new_chat(State(state): State<AppState>) -> Redirect {
    state.workspace.new_chat();
    see_other("/")
}

#[derive(Debug, Deserialize)]
pub struct RenameChatForm {
    pub title: String,
}

/// POST /chats/{id}/rename - Blank titles leave the chat as it was.
pub async fn rename_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<RenameChatForm>,
) -> Result<Redirect, AppError> {
    if state.workspace.chat(&id).is_none() {
        return Err(AppError::NotFound("Chat"));
    }
    if !state.workspace.rename_chat(&id, &form.title) {
        return Ok(back_to_current(&state));
    }
    state.events.emit(WorkspaceEvent::ChatsChanged);
    state.persistence.persist(Change::ChatUpserted(id)).await;
    Ok(back_to_current(&state))
}

/// POST /chats/{id}/delete
pub async fn delete_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Redirect, AppError> {
    if !state.workspace.delete_chat(&id) {
        return Err(AppError::NotFound("Chat"));
    }
    tracing::info!(name: "chat.deleted", chat_id = %id, "Chat deleted");
    state.events.emit(WorkspaceEvent::ChatsChanged);
    state.persistence.persist(Change::ChatRemoved(id)).await;
    Ok(back_to_current(&state))
}

#[derive(Debug, Deserialize)]
pub struct MoveChatForm {
    #[serde(default)]
    pub project_id: String,
}

/// POST /chats/{id}/project - Move into a project, or out with an empty id.
pub async fn move_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<MoveChatForm>,
) -> Result<Redirect, AppError> {
    if state.workspace.chat(&id).is_none() {
        return Err(AppError::NotFound("Chat"));
    }
    let project_id = Some(form.project_id.trim()).filter(|p| !p.is_empty());
    if !state.workspace.assign_chat(&id, project_id) {
        return Err(AppError::NotFound("Project"));
    }
    state.events.emit(WorkspaceEvent::ChatsChanged);
    state.persistence.persist(Change::ChatUpserted(id)).await;
    Ok(back_to_current(&state))
}
