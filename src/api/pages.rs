use axum::{
    Form,
    extract::{Path, Query, State},
    response::{Html, Redirect},
};
use serde::Deserialize;

use super::{back_to_current, page_view};
use crate::AppState;
use crate::domain::{Settings, Theme};
use crate::error::AppError;
use crate::ui::{self, chat::render_message_list, sidebar::render_sidebar};

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// GET / - The current chat, or the welcome screen.
pub async fn index(State(state): State<AppState>, Query(query): Query<SearchQuery>) -> Html<String> {
    Html(ui::render_page(&page_view(&state, &query.q, false)))
}

/// GET /chats/{id} - Select a chat and show it.
pub async fn chat_page(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<SearchQuery>,
) -> Result<Html<String>, AppError> {
    if !state.workspace.select_chat(&id) {
        return Err(AppError::NotFound("Chat"));
    }
    Ok(Html(ui::render_page(&page_view(&state, &query.q, false))))
}

/// GET /chats/{id}/messages - Message list fragment.
pub async fn messages_fragment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>, AppError> {
    let chat = state.workspace.chat(&id).ok_or(AppError::NotFound("Chat"))?;
    let loading = state.workspace.is_loading()
        && state.workspace.current_chat_id().as_deref() == Some(id.as_str());
    Ok(Html(render_message_list(&chat, loading)))
}

/// GET /sidebar - Sidebar fragment, refreshed when chats or the storage mode change.
pub async fn sidebar_fragment(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Html<String> {
    let view = page_view(&state, &query.q, false);
    Html(render_sidebar(
        &view.sidebar,
        view.current_chat.as_ref().map(|c| c.id.as_str()),
        view.settings.sidebar_name(),
        view.storage_mode,
    ))
}

/// GET /settings - Page with the settings dialog open.
pub async fn settings_page(State(state): State<AppState>) -> Html<String> {
    Html(ui::render_page(&page_view(&state, "", true)))
}

#[derive(Debug, Deserialize)]
pub struct SettingsForm {
    #[serde(default)]
    pub theme: String,
    #[serde(default)]
    pub webhook_url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub external_user_id: String,
}

impl From<SettingsForm> for Settings {
    fn from(form: SettingsForm) -> Self {
        Self {
            webhook_url: form.webhook_url.trim().to_string(),
            username: form.username,
            password: form.password,
            display_name: form.display_name,
            external_user_id: form.external_user_id.trim().to_string(),
            theme: Theme::parse(&form.theme),
        }
    }
}

/// POST /settings - Save settings and reconnect hosted history.
pub async fn save_settings(
    State(state): State<AppState>,
    Form(form): Form<SettingsForm>,
) -> Result<Redirect, AppError> {
    let settings = Settings::from(form);
    state.settings.save(settings.clone()).await?;
    state.persistence.activate(&settings).await;
    state.sync.restart().await;
    Ok(back_to_current(&state))
}

#[derive(Debug, Deserialize)]
pub struct ModelForm {
    pub model_id: String,
}

/// POST /model - Pick the model sent with the next messages.
pub async fn select_model(
    State(state): State<AppState>,
    Form(form): Form<ModelForm>,
) -> Result<Redirect, AppError> {
    if !state.workspace.select_model(&form.model_id) {
        return Err(AppError::BadRequest(format!("unknown model {}", form.model_id)));
    }
    tracing::debug!(model = %form.model_id, "Model selected");
    Ok(back_to_current(&state))
}
