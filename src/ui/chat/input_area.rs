//! Input bar: message box, attachment pickers and draft previews.

use std::fmt::Write as _;

use tera::escape_html;

use crate::attachments::{ALLOWED_EXTENSIONS, ALLOWED_IMAGE_EXTENSIONS, draft_size};
use crate::domain::{Attachment, UploadStatus};
use crate::workspace::NOTICE_TTL;

#[must_use]
pub fn render_input_area(drafts: &[Attachment], notice: Option<&str>, loading: bool) -> String {
    let required = if drafts.is_empty() { " required" } else { "" };

    format!(
        r#"<div class="input-area sticky bottom-0">
            {drafts}
            <div class="input-bar flex items-end gap-2">
                {menu}
                <form method="post" action="/messages" class="message-form flex-1 flex gap-2">
                    <textarea name="message" rows="1" placeholder="Спросите о чем угодно"{required}></textarea>
                    {send}
                </form>
            </div>
            <p class="disclaimer">Это разработка компании Призма AI. ИИ может делать ошибки. Пожалуйста, проверьте важную информацию.</p>
        </div>"#,
        drafts = render_drafts(drafts, notice),
        menu = render_attachment_menu(),
        send = render_send_button(drafts, loading),
    )
}

/// Send button, refreshed when a request starts or finishes.
#[must_use]
pub fn render_send_button(drafts: &[Attachment], loading: bool) -> String {
    let uploading = drafts.iter().any(|d| d.upload_status == UploadStatus::Uploading);
    let disabled = if loading || uploading { " disabled" } else { "" };
    format!(
        r#"<span id="send" hx-get="/composer/send" hx-trigger="sse:request.started, sse:request.finished" hx-swap="outerHTML"><button type="submit" class="send"{disabled}>Отправить</button></span>"#
    )
}

fn render_attachment_menu() -> String {
    let files = ALLOWED_EXTENSIONS.join(",");
    let images = ALLOWED_IMAGE_EXTENSIONS.join(",");
    format!(
        r#"<details class="attachment-menu">
            <summary title="Прикрепить">+</summary>
            <div class="menu">
                {file}
                {image}
                {camera}
                <p class="limits">Допустимые типы файлов: PDF, MD (Markdown), TXT, RTF, DOC, DOCX, XML, JSON, CSV, XLS, XLSX, JPG, JPEG, PNG, WEBP, BMP, GIF, SVG. <br>
                Максимальный размер каждого файла: 15 МБ. <br>
                Не более 5 файлов за раз.</p>
            </div>
        </details>"#,
        file = picker("file", "Добавить файл", &files, " multiple"),
        image = picker("image", "Добавить изображение", &images, " multiple"),
        camera = picker("camera", "Сделать снимок", "image/*", r#" capture="environment""#),
    )
}

fn picker(source: &str, label: &str, accept: &str, extra: &str) -> String {
    format!(
        r#"<form method="post" action="/attachments" enctype="multipart/form-data" class="picker picker-{source}">
            <input type="hidden" name="source" value="{source}">
            <label>{label}<input type="file" name="files" accept="{accept}"{extra} hidden onchange="this.form.requestSubmit()"></label>
        </form>"#
    )
}

/// Upload notice and draft previews, refreshed while an upload is running.
///
/// A visible notice schedules one more refresh so it disappears once it
/// expires. Images being uploaded are shown without their data URL, since
/// this fragment is re-fetched on every progress step.
#[must_use]
pub fn render_drafts(drafts: &[Attachment], notice: Option<&str>) -> String {
    let uploading = drafts.iter().any(|d| d.upload_status == UploadStatus::Uploading);
    let expire = if notice.is_some() {
        format!(", load delay:{}s", NOTICE_TTL.as_secs())
    } else {
        String::new()
    };
    let mut html = format!(
        r#"<div id="drafts" class="drafts flex gap-2" hx-get="/attachments" hx-trigger="sse:request.started, sse:upload.progress, sse:request.finished{expire}" hx-swap="outerHTML">"#
    );
    if let Some(text) = notice {
        let _ = write!(
            html,
            r#"<p class="upload-notice" role="alert">{}</p>"#,
            escape_html(text)
        );
    }

    for (index, draft) in drafts.iter().enumerate() {
        let name = escape_html(&draft.name);
        let inline = draft.upload_status != UploadStatus::Uploading;
        let preview = match (draft.is_image() && inline, draft.data.as_deref()) {
            (true, Some(data)) => format!(r#"<img src="{}" alt="{name}">"#, escape_html(data)),
            _ => format!(
                r#"<span class="file-name" title="{name}">{name}</span><span class="file-size">{}</span>"#,
                draft_size(draft.size)
            ),
        };
        let status = match draft.upload_status {
            UploadStatus::Uploading => format!(
                r#"<progress max="100" value="{:.0}"></progress>"#,
                draft.upload_progress
            ),
            UploadStatus::Error => r#"<span class="upload-error">!</span>"#.to_string(),
            UploadStatus::Completed => r#"<span class="upload-done">✓</span>"#.to_string(),
            UploadStatus::Idle | UploadStatus::Pending => String::new(),
        };
        let _ = write!(
            html,
            r#"<div class="draft status-{status_class}">
                {preview}{status}
                <form method="post" action="/attachments/{index}/delete">
                    <button type="submit" title="Удалить"{disabled}>×</button>
                </form>
            </div>"#,
            status_class = status_class(draft.upload_status),
            disabled = if uploading { " disabled" } else { "" },
        );
    }

    html.push_str("</div>");
    html
}

fn status_class(status: UploadStatus) -> &'static str {
    match status {
        UploadStatus::Idle => "idle",
        UploadStatus::Pending => "pending",
        UploadStatus::Uploading => "uploading",
        UploadStatus::Completed => "completed",
        UploadStatus::Error => "error",
    }
}
