use axum::{
    Form,
    extract::{Path, State},
    response::Redirect,
};
use serde::Deserialize;

use super::back_to_current;
use crate::AppState;
use crate::error::AppError;
use crate::events::WorkspaceEvent;
use crate::storage::Change;

#[derive(Debug, Deserialize)]
pub struct ProjectForm {
    pub name: String,
}

/// POST /projects
pub async fn create_project(
    State(state): State<AppState>,
    Form(form): Form<ProjectForm>,
) -> Result<Redirect, AppError> {
    let project = state
        .workspace
        .create_project(&form.name)
        .ok_or_else(|| AppError::BadRequest("project name must not be empty".to_string()))?;
    tracing::info!(name: "project.created", project_id = %project.id, "Project created");
    state.events.emit(WorkspaceEvent::ChatsChanged);
    state.persistence.persist(Change::ProjectUpserted(project.id)).await;
    Ok(back_to_current(&state))
}

/// POST /projects/{id}/rename
pub async fn rename_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<ProjectForm>,
) -> Result<Redirect, AppError> {
    if !state.workspace.projects().iter().any(|p| p.id == id) {
        return Err(AppError::NotFound("Project"));
    }
    if !state.workspace.rename_project(&id, &form.name) {
        return Err(AppError::BadRequest("project name must not be empty".to_string()));
    }
    state.events.emit(WorkspaceEvent::ChatsChanged);
    state.persistence.persist(Change::ProjectUpserted(id)).await;
    Ok(back_to_current(&state))
}

/// POST /projects/{id}/delete - Chats in the folder are kept, unassigned.
pub async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Redirect, AppError> {
    if !state.workspace.delete_project(&id) {
        return Err(AppError::NotFound("Project"));
    }
    state.events.emit(WorkspaceEvent::ChatsChanged);
    state.persistence.persist(Change::ProjectRemoved(id)).await;
    Ok(back_to_current(&state))
}
