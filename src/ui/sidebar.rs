//! Sidebar: new chat, search, project folders and recency groups.

use std::fmt::Write as _;

use tera::escape_html;

use crate::domain::Project;
use crate::storage::StorageMode;
use crate::workspace::{ChatSummary, SidebarView};

#[must_use]
pub fn render_sidebar(
    view: &SidebarView,
    current_chat_id: Option<&str>,
    user_name: &str,
    mode: StorageMode,
) -> String {
    let mut html = String::from(r#"<aside id="sidebar" class="sidebar flex flex-col w-64 h-full" hx-get="/sidebar" hx-trigger="sse:chats.changed, sse:storage.mode" hx-swap="outerHTML">"#);

    html.push_str(
        r#"
    <div class="sidebar-brand">Prisma AI</div>
    <form method="post" action="/chats/new">
        <button type="submit" class="new-chat">Новый чат</button>
    </form>"#,
    );

    let _ = write!(
        html,
        r#"
    <form method="get" action="/" class="search">
        <input type="search" name="q" value="{}" placeholder="Поиск..." autocomplete="off">
    </form>"#,
        escape_html(&view.query)
    );

    html.push_str(r#"<nav class="chat-nav flex-1 overflow-y-auto">"#);

    html.push_str(
        r#"
    <section class="projects">
        <form method="post" action="/projects" class="new-project">
            <input type="text" name="name" placeholder="Новый проект" required>
            <button type="submit">+</button>
        </form>"#,
    );
    for folder in &view.folders {
        let id = escape_html(&folder.project.id);
        let name = escape_html(&folder.project.name);
        let _ = write!(
            html,
            r#"
        <details class="project-folder" open>
            <summary>{name}</summary>
            <form method="post" action="/projects/{id}/rename" class="rename-project">
                <input type="text" name="name" value="{name}" required>
                <button type="submit">Переименовать</button>
            </form>
            <form method="post" action="/projects/{id}/delete" class="delete-project">
                <button type="submit">Удалить проект</button>
            </form>
            <ul>"#
        );
        for chat in &folder.chats {
            html.push_str(&render_chat_item(chat, current_chat_id, &view.projects));
        }
        html.push_str("</ul></details>");
    }
    html.push_str("</section>");

    for (bucket, chats) in &view.groups {
        let _ = write!(
            html,
            r#"
    <section class="chat-group">
        <h3>{}</h3>
        <ul>"#,
            bucket.label()
        );
        for chat in chats {
            html.push_str(&render_chat_item(chat, current_chat_id, &view.projects));
        }
        html.push_str("</ul></section>");
    }

    if view.nothing_found() {
        html.push_str(r#"<p class="nothing-found">Ничего не найдено</p>"#);
    }
    html.push_str("</nav>");

    let _ = write!(
        html,
        r#"
    <footer class="sidebar-footer">
        <span class="user-name">{}</span>
        <span class="storage-mode storage-{mode}" title="История: {mode}">{mode}</span>
        <a href="/settings" class="open-settings" title="Настройки">Настройки</a>
    </footer>
</aside>"#,
        escape_html(user_name),
        mode = mode.as_str(),
    );

    html
}

fn render_chat_item(chat: &ChatSummary, current_chat_id: Option<&str>, projects: &[Project]) -> String {
    let id = escape_html(&chat.id);
    let title = escape_html(&chat.title);

    if current_chat_id != Some(chat.id.as_str()) {
        return format!(r#"<li class="chat-item"><a href="/chats/{id}">{title}</a></li>"#);
    }

    let mut options = String::from(r#"<option value="">Без проекта</option>"#);
    for project in projects {
        let selected = if chat.project_id.as_deref() == Some(project.id.as_str()) {
            " selected"
        } else {
            ""
        };
        let _ = write!(
            options,
            r#"<option value="{}"{selected}>{}</option>"#,
            escape_html(&project.id),
            escape_html(&project.name)
        );
    }

    format!(
        r#"<li class="chat-item active">
            <a href="/chats/{id}" aria-current="page">{title}</a>
            <form method="post" action="/chats/{id}/rename" class="rename-chat">
                <input type="text" name="title" value="{title}" title="Редактировать название" required>
                <button type="submit">OK</button>
            </form>
            <form method="post" action="/chats/{id}/project" class="move-chat">
                <select name="project_id" onchange="this.form.requestSubmit()">{options}</select>
            </form>
            <form method="post" action="/chats/{id}/delete" class="delete-chat">
                <button type="submit" title="Удалить">Удалить</button>
            </form>
        </li>"#
    )
}
