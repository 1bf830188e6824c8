//! Message bubbles.

use std::fmt::Write as _;

use tera::escape_html;

use crate::attachments::display_size;
use crate::domain::{Attachment, Chat, Message};

/// The message list of `chat`, refreshed on SSE events.
#[must_use]
pub fn render_message_list(chat: &Chat, loading: bool) -> String {
    let id = escape_html(&chat.id);
    let mut html = format!(
        r#"<section id="messages" class="message-list" hx-get="/chats/{id}/messages" hx-trigger="sse:message.added, sse:request.finished" hx-swap="outerHTML">"#
    );

    for message in &chat.messages {
        html.push_str(&render_message(message));
    }

    if loading {
        html.push_str(
            r#"<div class="message ai loading" aria-live="polite"><div class="typing-indicator"><span></span><span></span><span></span></div></div>"#,
        );
    }
    html.push_str("</section>");
    html
}

#[must_use]
pub fn render_message(message: &Message) -> String {
    let (class, author) = if message.is_assistant() {
        ("ai", "ChatGPT")
    } else {
        ("user", "Вы")
    };

    let mut attachments = String::new();
    for attachment in message.all_attachments() {
        attachments.push_str(&render_attachment(attachment));
    }
    if !attachments.is_empty() {
        attachments = format!(r#"<div class="attachments">{attachments}</div>"#);
    }

    let content = if message.content.is_empty() {
        String::new()
    } else {
        format!(
            r#"<div class="message-content whitespace-pre-wrap">{}</div>"#,
            escape_html(&message.content)
        )
    };

    format!(
        r#"<article class="message {class}" id="message-{id}">
            <header><span class="author">{author}</span> <time>{timestamp}</time></header>
            {attachments}{content}
        </article>"#,
        id = escape_html(&message.id),
        timestamp = escape_html(&message.timestamp),
    )
}

fn render_attachment(attachment: &Attachment) -> String {
    let name = escape_html(&attachment.name);
    if attachment.is_image()
        && let Some(data) = attachment.data.as_deref()
    {
        return format!(r#"<img class="attachment-image" src="{}" alt="{name}">"#, escape_html(data));
    }

    let mut card = format!(
        r#"<div class="attachment-file"><span class="file-name" title="{name}">{name}</span>"#
    );
    let size = display_size(attachment.size);
    if !size.is_empty() {
        let _ = write!(card, r#"<span class="file-size">{size}</span>"#);
    }
    card.push_str("</div>");
    card
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AttachmentKind, UploadStatus};

    fn file(kind: AttachmentKind, data: Option<&str>) -> Attachment {
        Attachment {
            kind,
            name: "report.pdf".to_string(),
            size: Some(2048),
            mime_type: Some("application/pdf".to_string()),
            data: data.map(str::to_string),
            bytes: None,
            source_type: None,
            upload_status: UploadStatus::Idle,
            upload_progress: 0.0,
        }
    }

    #[test]
    fn test_bubbles_escape_content_and_label_authors() {
        let mut chat = Chat::new("t");
        chat.messages.push(Message::user("<b>hi</b>", Vec::new()));
        chat.messages.push(Message::assistant("**Ошибка:** Failed"));

        let html = render_message_list(&chat, true);
        assert!(html.contains("&lt;b&gt;hi&lt;&#x2F;b&gt;"));
        assert!(html.contains("Вы"));
        assert!(html.contains("ChatGPT"));
        assert!(html.contains("typing-indicator"));
        assert!(html.contains(&format!("/chats/{}/messages", chat.id)));
    }

    #[test]
    fn test_attachments_render_as_image_or_card() {
        let message = Message::user(
            "",
            vec![
                file(AttachmentKind::File, None),
                file(AttachmentKind::Image, Some("data:image/png;base64,AAA")),
            ],
        );
        let html = render_message(&message);
        assert!(html.contains("report.pdf"));
        assert!(html.contains("2 KB"));
        assert!(html.contains(r#"src="data:image&#x2F;png;base64,AAA""#));
        assert!(!html.contains("message-content"));
    }
}
