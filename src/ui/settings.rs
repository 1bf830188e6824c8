//! Settings dialog.

use tera::escape_html;

use crate::domain::{Settings, Theme};

#[must_use]
pub fn render_settings_modal(settings: &Settings) -> String {
    let checked = |theme: Theme| if settings.theme == theme { " checked" } else { "" };

    format!(
        r#"<dialog id="settings" class="settings-modal" open aria-labelledby="settings-title">
    <form method="post" action="/settings" class="settings-form">
        <h2 id="settings-title">Настройки</h2>

        <fieldset class="theme">
            <legend>Тема оформления</legend>
            <label><input type="radio" name="theme" value="light"{light}> Светлая</label>
            <label><input type="radio" name="theme" value="dark"{dark}> Темная</label>
        </fieldset>

        <label for="webhook_url">webhook</label>
        <input id="webhook_url" type="text" name="webhook_url" value="{webhook_url}" placeholder="https://prismaar.store/webhook/...">
        <p class="hint">Пожалуйста, введите адрес вашего вебхука.</p>

        <label for="username">Имя пользователя</label>
        <input id="username" type="text" name="username" value="{username}" autocomplete="username">

        <label for="password">Пароль</label>
        <input id="password" type="password" name="password" value="{password}" autocomplete="current-password">

        <label for="display_name">Имя</label>
        <input id="display_name" type="text" name="display_name" value="{display_name}">

        <label for="external_user_id">Имя пользователя в Telegram</label>
        <input id="external_user_id" type="text" name="external_user_id" value="{external_user_id}" placeholder="Пользователь">

        <div class="actions">
            <a href="/" class="cancel">Отмена</a>
            <button type="submit" class="save">Сохранить</button>
        </div>
    </form>
</dialog>"#,
        light = checked(Theme::Light),
        dark = checked(Theme::Dark),
        webhook_url = escape_html(&settings.webhook_url),
        username = escape_html(&settings.username),
        password = escape_html(&settings.password),
        display_name = escape_html(&settings.display_name),
        external_user_id = escape_html(&settings.external_user_id),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modal_prefills_fields() {
        let settings = Settings {
            webhook_url: "https://hook.example.com/\"x\"".to_string(),
            password: "s3cret".to_string(),
            theme: Theme::Dark,
            ..Settings::default()
        };
        let html = render_settings_modal(&settings);
        assert!(html.contains("https:&#x2F;&#x2F;hook.example.com&#x2F;&quot;x&quot;"));
        assert!(html.contains(r#"value="s3cret""#));
        assert!(html.contains(r#"value="dark" checked"#));
        assert!(!html.contains(r#"value="light" checked"#));
    }
}
