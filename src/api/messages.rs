use axum::{
    Form,
    extract::State,
    response::{Html, Redirect},
};
use serde::Deserialize;

use super::{back_to_current, see_other};
use crate::AppState;
use crate::conversation::SendOutcome;
use crate::ui::chat::render_send_button;

#[derive(Debug, Deserialize)]
pub struct MessageForm {
    #[serde(default)]
    pub message: String,
}

/// POST /messages - Send the text and drafts; the reply arrives over SSE.
pub async fn send(State(state): State<AppState>, Form(form): Form<MessageForm>) -> Redirect {
    match state.conversation.send_message(&form.message).await {
        SendOutcome::Dispatched { chat_id, .. } => see_other(&format!("/chats/{chat_id}")),
        SendOutcome::SettingsRequired => see_other("/settings"),
        SendOutcome::Ignored => back_to_current(&state),
    }
}

/// GET /composer/send - Send button fragment, re-enabled once a reply lands.
pub async fn send_button_fragment(State(state): State<AppState>) -> Html<String> {
    Html(render_send_button(
        &state.workspace.drafts(),
        state.workspace.is_loading(),
    ))
}
