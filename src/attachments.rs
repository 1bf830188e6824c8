//! Draft attachment intake: validation, type inference and size labels.
//!
//! Files arrive from the input bar's pickers (or drag and drop) and become
//! [`Attachment`] drafts that ride along with the next message.

use axum::body::Bytes;
use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::domain::{Attachment, AttachmentKind, SourceType, UploadStatus};

/// Maximum size of a single file (15 MiB).
pub const MAX_FILE_SIZE: u64 = 15 * 1024 * 1024;

/// Maximum number of files accepted in one selection.
pub const MAX_FILES: usize = 5;

/// Extensions accepted by the file picker and the server.
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    ".pdf", ".md", ".txt", ".rtf", ".doc", ".docx", ".xml", ".json", ".csv", ".xls", ".xlsx",
    ".jpg", ".jpeg", ".png", ".webp", ".bmp", ".gif", ".svg",
];

/// Extensions offered by the image picker.
pub const ALLOWED_IMAGE_EXTENSIONS: &[&str] =
    &[".jpg", ".jpeg", ".png", ".webp", ".bmp", ".gif", ".svg"];

pub const TOO_MANY_FILES: &str = "Не более 5 файлов за раз.";
pub const UNSUPPORTED_FILE: &str =
    "Этот тип файла или размер не поддерживается. Пожалуйста, выберите другой файл.";
pub const READ_FAILED: &str = "Ошибка при чтении файла.";

const FALLBACK_MIME: &str = "application/octet-stream";

#[derive(Debug, thiserror::Error)]
pub enum AttachmentError {
    #[error("Failed to read uploaded file: {0}")]
    Read(#[from] MultipartError),
}

/// A file picked in the browser, as received from the multipart form.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    pub mime_type: Option<String>,
    pub bytes: Bytes,
}

/// What the input bar's error notice should do after a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Keep,
    Clear,
    Show(&'static str),
}

/// Outcome of processing a selection.
#[derive(Debug)]
pub struct Selection {
    pub attachments: Vec<Attachment>,
    pub notice: Notice,
}

/// Read the attachment form: any number of file parts plus an optional
/// `source` field naming the picker (`file`, `image` or `camera`).
///
/// Empty file parts (a picker submitted with nothing chosen) are skipped.
pub async fn read_selection(
    multipart: &mut Multipart,
) -> Result<(Vec<SelectedFile>, Option<SourceType>), AttachmentError> {
    let mut files = Vec::new();
    let mut source = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("source") {
            source = SourceType::parse(&field.text().await?);
            continue;
        }
        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let mime_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;
        if name.is_empty() && bytes.is_empty() {
            continue;
        }
        files.push(SelectedFile {
            name,
            mime_type,
            bytes,
        });
    }

    Ok((files, source))
}

/// Validate a batch of files and turn the acceptable ones into drafts.
#[must_use]
pub fn process_selected_files(files: Vec<SelectedFile>, source: Option<SourceType>) -> Selection {
    if files.is_empty() {
        return Selection {
            attachments: Vec::new(),
            notice: Notice::Keep,
        };
    }

    if files.len() > MAX_FILES {
        return Selection {
            attachments: Vec::new(),
            notice: Notice::Show(TOO_MANY_FILES),
        };
    }

    let total = files.len();
    let valid: Vec<SelectedFile> = files.into_iter().filter(is_acceptable).collect();

    let notice = if valid.len() < total {
        Notice::Show(UNSUPPORTED_FILE)
    } else {
        Notice::Clear
    };

    let attachments = valid
        .into_iter()
        .map(|file| build_attachment(file, source))
        .collect();

    Selection {
        attachments,
        notice,
    }
}

fn is_acceptable(file: &SelectedFile) -> bool {
    if file.bytes.len() as u64 > MAX_FILE_SIZE {
        tracing::debug!(file = %file.name, size = file.bytes.len(), "Rejected oversized file");
        return false;
    }
    let allowed = ALLOWED_EXTENSIONS.contains(&dotted_extension(&file.name).as_str());
    if !allowed {
        tracing::debug!(file = %file.name, "Rejected file with unsupported extension");
    }
    allowed
}

/// `.ext` in lowercase, taken after the last dot of the name.
#[must_use]
pub fn dotted_extension(name: &str) -> String {
    let ext = name.rsplit('.').next().unwrap_or_default();
    format!(".{}", ext.to_lowercase())
}

fn build_attachment(file: SelectedFile, source: Option<SourceType>) -> Attachment {
    let mime_type = file
        .mime_type
        .filter(|m| !m.trim().is_empty())
        .or_else(|| mime_guess::from_path(&file.name).first_raw().map(str::to_string))
        .unwrap_or_else(|| FALLBACK_MIME.to_string());

    let mut kind = AttachmentKind::File;
    let mut source_type = source.unwrap_or(SourceType::File);
    if mime_type.starts_with("image/") {
        kind = AttachmentKind::Image;
        if source.is_none() {
            source_type = SourceType::Image;
        }
    }
    if source == Some(SourceType::Camera) {
        kind = AttachmentKind::Image;
    }

    let data = format!("data:{mime_type};base64,{}", STANDARD.encode(&file.bytes));

    Attachment {
        kind,
        name: file.name,
        size: Some(file.bytes.len() as u64),
        mime_type: Some(mime_type),
        data: Some(data),
        bytes: Some(file.bytes),
        source_type: Some(source_type),
        upload_status: UploadStatus::Idle,
        upload_progress: 0.0,
    }
}

/// Size label sent to the webhook in the file metadata (`1.5 kB`).
#[must_use]
pub fn payload_size(bytes: Option<u64>) -> String {
    match bytes {
        None | Some(0) => "0 kB".to_string(),
        Some(n) => scaled(n, &["B", "kB", "MB", "GB"], 2),
    }
}

/// Size label shown on message bubbles (`1.5 KB`); empty when unknown.
#[must_use]
pub fn display_size(bytes: Option<u64>) -> String {
    match bytes {
        None | Some(0) => String::new(),
        Some(n) => scaled(n, &["B", "KB", "MB", "GB"], 1),
    }
}

/// Size label on draft previews, always in kilobytes.
#[must_use]
pub fn draft_size(bytes: Option<u64>) -> String {
    bytes.map_or_else(String::new, |n| format!("{:.1} KB", n as f64 / 1024.0))
}

fn scaled(bytes: u64, units: &[&str], decimals: usize) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < units.len() {
        value /= 1024.0;
        unit += 1;
    }
    let fixed = format!("{value:.decimals$}");
    let trimmed = if fixed.contains('.') {
        fixed.trim_end_matches('0').trim_end_matches('.')
    } else {
        fixed.as_str()
    };
    format!("{trimmed} {}", units[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, size: usize, mime: Option<&str>) -> SelectedFile {
        SelectedFile {
            name: name.to_string(),
            mime_type: mime.map(str::to_string),
            bytes: Bytes::from(vec![b'x'; size]),
        }
    }

    #[test]
    fn test_empty_selection_is_noop() {
        let selection = process_selected_files(Vec::new(), None);
        assert!(selection.attachments.is_empty());
        assert_eq!(selection.notice, Notice::Keep);
    }

    #[test]
    fn test_more_than_five_files_rejected_entirely() {
        let files = (0..6).map(|i| file(&format!("f{i}.txt"), 4, None)).collect();
        let selection = process_selected_files(files, None);
        assert!(selection.attachments.is_empty());
        assert_eq!(selection.notice, Notice::Show(TOO_MANY_FILES));
    }

    #[test]
    fn test_invalid_files_are_skipped_with_notice() {
        let files = vec![
            file("report.PDF", 10, Some("application/pdf")),
            file("script.exe", 10, None),
        ];
        let selection = process_selected_files(files, None);
        assert_eq!(selection.attachments.len(), 1);
        assert_eq!(selection.attachments[0].name, "report.PDF");
        assert_eq!(selection.notice, Notice::Show(UNSUPPORTED_FILE));
    }

    #[test]
    fn test_all_invalid_files_produce_nothing() {
        let selection = process_selected_files(vec![file("noext", 3, None)], None);
        assert!(selection.attachments.is_empty());
        assert_eq!(selection.notice, Notice::Show(UNSUPPORTED_FILE));
    }

    #[test]
    fn test_oversized_file_rejected() {
        let big = SelectedFile {
            name: "big.txt".to_string(),
            mime_type: None,
            bytes: Bytes::from(vec![0u8; (MAX_FILE_SIZE + 1) as usize]),
        };
        let selection = process_selected_files(vec![big], None);
        assert!(selection.attachments.is_empty());
    }

    #[test]
    fn test_type_inference() {
        let selection = process_selected_files(
            vec![file("cat.png", 3, Some("image/png")), file("a.txt", 3, None)],
            None,
        );
        assert_eq!(selection.notice, Notice::Clear);

        let image = &selection.attachments[0];
        assert_eq!(image.kind, AttachmentKind::Image);
        assert_eq!(image.source_type, Some(SourceType::Image));
        assert!(image.data.as_deref().unwrap().starts_with("data:image/png;base64,"));

        let text = &selection.attachments[1];
        assert_eq!(text.kind, AttachmentKind::File);
        assert_eq!(text.mime_type.as_deref(), Some("text/plain"));
        assert_eq!(text.upload_status, UploadStatus::Idle);
    }

    #[test]
    fn test_camera_source_is_always_image() {
        let selection =
            process_selected_files(vec![file("shot.jpg", 3, None)], Some(SourceType::Camera));
        let shot = &selection.attachments[0];
        assert_eq!(shot.kind, AttachmentKind::Image);
        assert_eq!(shot.source_type, Some(SourceType::Camera));
    }

    #[test]
    fn test_size_labels() {
        assert_eq!(payload_size(None), "0 kB");
        assert_eq!(payload_size(Some(0)), "0 kB");
        assert_eq!(payload_size(Some(512)), "512 B");
        assert_eq!(payload_size(Some(1536)), "1.5 kB");
        assert_eq!(payload_size(Some(1024 * 1024)), "1 MB");
        assert_eq!(payload_size(Some(1_234_567)), "1.18 MB");

        assert_eq!(display_size(None), "");
        assert_eq!(display_size(Some(2048)), "2 KB");
        assert_eq!(display_size(Some(1_100_000)), "1 MB");

        assert_eq!(draft_size(Some(1536)), "1.5 KB");
    }
}
