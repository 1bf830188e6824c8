//! HTTP handlers.
//!
//! Forms post to the handlers below and are answered with `303 See Other`,
//! so the browser (or htmx with `hx-boost`) lands back on a page. Fragments
//! re-fetched on SSE events live next to the pages that embed them.

pub mod attachments;
pub mod chats;
pub mod events;
pub mod json;
pub mod messages;
pub mod pages;
pub mod projects;

use axum::{
    Router,
    response::Redirect,
    routing::{get, post},
};
use chrono::Local;

use crate::AppState;
use crate::ui::PageView;
use crate::workspace::build_sidebar;

/// Page, form and JSON routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(pages::index))
        .route("/sidebar", get(pages::sidebar_fragment))
        .route("/chats/{id}", get(pages::chat_page))
        .route("/chats/{id}/messages", get(pages::messages_fragment))
        .route("/settings", get(pages::settings_page).post(pages::save_settings))
        .route("/model", post(pages::select_model))
        .route("/chats/new", post(chats::new_chat))
        .route("/chats/{id}/rename", post(chats::rename_chat))
        .route("/chats/{id}/delete", post(chats::delete_chat))
        .route("/chats/{id}/project", post(chats::move_chat))
        .route("/projects", post(projects::create_project))
        .route("/projects/{id}/rename", post(projects::rename_project))
        .route("/projects/{id}/delete", post(projects::delete_project))
        .route(
            "/attachments",
            get(attachments::drafts_fragment).post(attachments::upload),
        )
        .route("/attachments/{index}/delete", post(attachments::remove))
        .route("/messages", post(messages::send))
        .route("/composer/send", get(messages::send_button_fragment))
        .route("/healthz", get(json::healthz))
        .route("/api/chats", get(json::list_chats))
        .route("/api/chats/{id}", get(json::get_chat))
        .route("/api/models", get(json::list_models))
        .route("/api/status", get(json::status))
}

/// Long-lived routes that must not sit behind the request timeout.
pub fn events_router() -> Router<AppState> {
    Router::new().route("/events", get(events::stream_events))
}

fn see_other(path: &str) -> Redirect {
    Redirect::to(path)
}

/// Where to land after a form post: the current chat, or the start page.
fn back_to_current(state: &AppState) -> Redirect {
    match state.workspace.current_chat_id() {
        Some(id) => see_other(&format!("/chats/{id}")),
        None => see_other("/"),
    }
}

fn page_view(state: &AppState, query: &str, settings_open: bool) -> PageView {
    let settings = state.settings.get();
    let chats = state.workspace.chats();
    let projects = state.workspace.projects();
    PageView {
        sidebar: build_sidebar(&chats, &projects, query, Local::now()),
        current_chat: state.workspace.current_chat(),
        model: state.workspace.selected_model(),
        drafts: state.workspace.drafts(),
        notice: state.workspace.upload_notice(),
        loading: state.workspace.is_loading(),
        storage_mode: state.persistence.mode(),
        settings_open,
        settings,
    }
}
