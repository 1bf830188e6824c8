//! Welcome screen shown when no chat is selected.

use std::fmt::Write as _;

use tera::escape_html;

use crate::domain::SUGGESTION_CARDS;

#[must_use]
pub fn render_welcome() -> String {
    let mut cards = String::new();
    for card in SUGGESTION_CARDS {
        let _ = write!(
            cards,
            r#"<form method="post" action="/messages" class="suggestion-card">
                <input type="hidden" name="message" value="{title}">
                <button type="submit">
                    <span class="suggestion-title">{title}</span>
                    <span class="suggestion-subtitle">{subtitle}</span>
                </button>
            </form>"#,
            title = escape_html(card.title),
            subtitle = escape_html(card.subtitle),
        );
    }

    format!(
        r#"<div class="welcome h-full flex flex-col items-center justify-center">
            <h1>Чем я могу вам помочь сегодня?</h1>
            <div class="suggestions grid grid-cols-1 md:grid-cols-2 gap-4">{cards}</div>
        </div>"#
    )
}
