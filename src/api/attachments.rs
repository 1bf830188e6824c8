use axum::{
    extract::{Multipart, Path, State},
    response::{Html, Redirect},
};

use super::back_to_current;
use crate::AppState;
use crate::attachments::{Notice, READ_FAILED, process_selected_files, read_selection};
use crate::error::AppError;
use crate::ui::chat::render_drafts;

/// GET /attachments - Upload notice and draft previews fragment.
pub async fn drafts_fragment(State(state): State<AppState>) -> Html<String> {
    let notice = state.workspace.upload_notice();
    Html(render_drafts(&state.workspace.drafts(), notice.as_deref()))
}

/// POST /attachments - Add picked files to the drafts.
pub async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> Redirect {
    if state.workspace.is_uploading() {
        return back_to_current(&state);
    }

    let (files, source) = match read_selection(&mut multipart).await {
        Ok(selection) => selection,
        Err(e) => {
            tracing::error!(error = %e, "File read error");
            state.workspace.raise_notice(READ_FAILED);
            return back_to_current(&state);
        }
    };

    let picked = files.len();
    let selection = process_selected_files(files, source);
    tracing::debug!(picked, accepted = selection.attachments.len(), "Processed file selection");

    match selection.notice {
        Notice::Keep => {}
        Notice::Clear => state.workspace.clear_notice(),
        Notice::Show(text) => state.workspace.raise_notice(text),
    }
    state.workspace.add_drafts(selection.attachments);
    back_to_current(&state)
}

/// POST /attachments/{index}/delete - Remove a draft unless it is uploading.
pub async fn remove(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Redirect, AppError> {
    if index >= state.workspace.drafts().len() {
        return Err(AppError::NotFound("Attachment"));
    }
    if !state.workspace.remove_draft(index) {
        return Err(AppError::BadRequest("attachment is uploading".to_string()));
    }
    Ok(back_to_current(&state))
}
