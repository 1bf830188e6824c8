//! Chat header with the model dropdown.

use std::fmt::Write as _;

use tera::escape_html;

use crate::domain::{MODEL_OPTIONS, ModelOption};

#[must_use]
pub fn render_header(selected: &ModelOption) -> String {
    let mut items = String::new();
    for model in MODEL_OPTIONS {
        let is_selected = model.id == selected.id;
        let _ = write!(
            items,
            r#"<li><form method="post" action="/model">
                <input type="hidden" name="model_id" value="{id}">
                <button type="submit" class="model-option{class}">{label}{check}</button>
            </form></li>"#,
            id = model.id,
            label = escape_html(model.label),
            class = if is_selected { " selected" } else { "" },
            check = if is_selected { " <span>✓</span>" } else { "" },
        );
    }

    format!(
        r#"<header class="chat-header h-12 flex items-center justify-center sticky top-0">
            <details class="model-dropdown">
                <summary>{label}</summary>
                <ul class="model-menu">{items}</ul>
            </details>
        </header>"#,
        label = escape_html(selected.label),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::find_model;

    #[test]
    fn test_header_marks_selected_model() {
        let html = render_header(find_model("9"));
        assert!(html.contains("<summary>Claude Opus 4.5</summary>"));
        assert_eq!(html.matches('✓').count(), 1);
        assert_eq!(html.matches("name=\"model_id\"").count(), MODEL_OPTIONS.len());
    }
}
