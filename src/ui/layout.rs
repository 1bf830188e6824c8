//! Document shell.

use tera::escape_html;

use super::{PageView, chat, settings, sidebar};
use crate::domain::Theme;

/// Wrap page content in the HTML document.
#[must_use]
pub fn html_shell(title: &str, theme: Theme, content: &str) -> String {
    let class = if theme.is_dark() { "dark" } else { "" };
    let title = escape_html(title);
    format!(
        r#"<!DOCTYPE html>
<html lang="ru" class="{class}">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="description" content="Prisma AI chat">
    <title>{title} - Prisma AI</title>

    <script src="/static/vendor/htmx.min.js"></script>
    <script src="/static/vendor/htmx-sse.js"></script>
    <link rel="stylesheet" href="/static/app.css">
</head>
<body class="h-screen flex overflow-hidden" hx-boost="true">
    <div id="live" class="flex flex-1 h-full" hx-ext="sse" sse-connect="/events">
        {content}
    </div>
</body>
</html>"#
    )
}

/// Render the full page.
#[must_use]
pub fn render_page(view: &PageView) -> String {
    let current_id = view.current_chat.as_ref().map(|c| c.id.as_str());
    let side = sidebar::render_sidebar(
        &view.sidebar,
        current_id,
        view.settings.sidebar_name(),
        view.storage_mode,
    );

    let banner = if view.settings.has_webhook() {
        String::new()
    } else {
        r#"<div class="onboarding-banner" role="status">Перед началом работы нажмите значок настроек и укажите Webhook и свои данные. Без этого бот не сможет отвечать.</div>"#.to_string()
    };

    let body = match &view.current_chat {
        Some(chat) => chat::render_message_list(chat, view.loading),
        None => chat::render_welcome(),
    };

    let dialog = if view.settings_open {
        settings::render_settings_modal(&view.settings)
    } else {
        String::new()
    };

    let content = format!(
        r#"{side}
        <main class="flex-1 flex flex-col h-full relative">
            {banner}
            {header}
            <div class="chat-area flex-1 overflow-y-auto">
                {body}
            </div>
            {input}
        </main>
        {dialog}"#,
        header = chat::render_header(view.model),
        input = chat::render_input_area(&view.drafts, view.notice.as_deref(), view.loading),
    );

    let title = view
        .current_chat
        .as_ref()
        .map_or("Новый чат", |c| c.title.as_str());
    html_shell(title, view.settings.theme, &content)
}
