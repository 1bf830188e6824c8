//! End-to-end tests of the HTTP surface.
//!
//! Each test gets its own data directory and, where a reply is needed, a
//! local axum server standing in for the webhook gateway.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::{Json, Router, http::StatusCode, routing::post};
use axum_test::TestServer;
use axum_test::multipart::{MultipartForm, Part};
use prisma_chat::AppState;
use prisma_chat::attachments::UNSUPPORTED_FILE;
use prisma_chat::config::{
    AppConfig, HostedConfig, LoggingConfig, ServerConfig, StorageBackend, StorageConfig,
    UiConfig, WebhookConfig,
};
use prisma_chat::server::{build_router, build_state};
use serde_json::{Value, json};
use tempfile::TempDir;
use tera::escape_html;

// =============================================================================
// Test Utilities
// =============================================================================

fn test_config(data_dir: &Path, backend: StorageBackend) -> AppConfig {
    AppConfig {
        server: ServerConfig {
            port: 0,
            host: "127.0.0.1".to_string(),
            request_timeout_secs: 30,
        },
        storage: StorageConfig {
            backend,
            data_dir: data_dir.to_path_buf(),
            hosted: HostedConfig {
                url: "mem://".to_string(),
                namespace: "test".to_string(),
                database: "test".to_string(),
                username: None,
                password: None,
            },
        },
        webhook: WebhookConfig {
            url: String::new(),
            username: String::new(),
            password: String::new(),
            timeout_secs: 5,
        },
        ui: UiConfig {
            static_dir: data_dir.join("static"),
        },
        logging: LoggingConfig { json: false },
    }
}

async fn setup(dir: &TempDir, backend: StorageBackend) -> (TestServer, AppState) {
    let state = build_state(Arc::new(test_config(dir.path(), backend)))
        .await
        .expect("Failed to build state");
    let server = TestServer::new(build_router(state.clone())).expect("Failed to start server");
    (server, state)
}

/// Mock gateway echoing the message back.
async fn spawn_webhook() -> String {
    let app = Router::new().route(
        "/webhook",
        post(|Json(body): Json<Value>| async move {
            Json(json!({ "output": format!("Ответ: {}", body["message"].as_str().unwrap_or_default()) }))
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/webhook")
}

async fn save_settings(server: &TestServer, webhook_url: &str, user: &str) {
    server
        .post("/settings")
        .form(&[
            ("theme", "dark"),
            ("webhook_url", webhook_url),
            ("username", ""),
            ("password", "hunter2"),
            ("display_name", "Анна"),
            ("external_user_id", user),
        ])
        .await
        .assert_status(StatusCode::SEE_OTHER);
}

async fn wait_for_reply(state: &AppState) {
    for _ in 0..500 {
        if !state.workspace.is_loading() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("webhook request did not finish");
}

fn location(response: &axum_test::TestResponse) -> String {
    response.header("location").to_str().unwrap().to_string()
}

// =============================================================================
// Pages
// =============================================================================

#[tokio::test]
async fn test_index_shows_welcome_and_onboarding() {
    let dir = TempDir::new().unwrap();
    let (server, _) = setup(&dir, StorageBackend::Local).await;

    let response = server.get("/").await;
    response.assert_status_ok();
    let html = response.text();
    assert!(html.contains("Чем я могу вам помочь сегодня?"));
    assert!(html.contains("onboarding-banner"));
    assert!(html.contains(r#"sse-connect="/events""#));

    server.get("/healthz").await.assert_text("ok");
    server.get("/chats/missing").await.assert_status_not_found();
}

#[tokio::test]
async fn test_send_without_webhook_opens_settings() {
    let dir = TempDir::new().unwrap();
    let (server, state) = setup(&dir, StorageBackend::Local).await;

    let response = server.post("/messages").form(&[("message", "Привет")]).await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/settings");
    assert!(state.workspace.chats().is_empty());

    let html = server.get("/settings").await.text();
    assert!(html.contains("Настройки"));
    assert!(html.contains("Имя пользователя в Telegram"));
}

// =============================================================================
// Conversation
// =============================================================================

#[tokio::test]
async fn test_message_round_trip_through_webhook() {
    let dir = TempDir::new().unwrap();
    let (server, state) = setup(&dir, StorageBackend::Local).await;
    let webhook = spawn_webhook().await;
    save_settings(&server, &webhook, "").await;

    let response = server.post("/messages").form(&[("message", "Как дела?")]).await;
    response.assert_status(StatusCode::SEE_OTHER);
    let chat_url = location(&response);
    assert!(chat_url.starts_with("/chats/"));

    wait_for_reply(&state).await;

    let fragment = server.get(&format!("{chat_url}/messages")).await.text();
    assert!(fragment.contains(&escape_html("Как дела?")));
    assert!(fragment.contains("Ответ: Как дела?"));

    let chats: Value = server.get("/api/chats").await.json();
    assert_eq!(chats.as_array().unwrap().len(), 1);
    assert_eq!(chats[0]["title"], "Как дела?");
    assert_eq!(chats[0]["messageCount"], 2);

    // History and settings are on disk, the password only in encrypted form.
    let stored_chats = std::fs::read_to_string(dir.path().join("prisma_chats.json")).unwrap();
    assert!(stored_chats.contains("Ответ: Как дела?"));
    let stored_settings =
        std::fs::read_to_string(dir.path().join("prisma_settings.json")).unwrap();
    assert!(!stored_settings.contains("hunter2"));
}

#[tokio::test]
async fn test_send_button_re_enables_after_reply() {
    let dir = TempDir::new().unwrap();
    let (server, state) = setup(&dir, StorageBackend::Local).await;

    let app = Router::new().route(
        "/webhook",
        post(|| async {
            tokio::time::sleep(Duration::from_millis(300)).await;
            Json(json!({ "output": "Готово" }))
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    save_settings(&server, &format!("http://{addr}/webhook"), "").await;

    let response = server.post("/messages").form(&[("message", "Первое")]).await;
    let page = server.get(&location(&response)).await.text();
    assert!(page.contains(r#"class="send" disabled"#));
    let fragment = server.get("/composer/send").await.text();
    assert!(fragment.contains("disabled"));
    assert!(fragment.contains("sse:request.finished"));

    wait_for_reply(&state).await;

    let fragment = server.get("/composer/send").await.text();
    assert!(!fragment.contains("disabled"));

    // A second message goes through without reloading the page.
    server
        .post("/messages")
        .form(&[("message", "Второе")])
        .await
        .assert_status(StatusCode::SEE_OTHER);
    wait_for_reply(&state).await;
    let chats = state.workspace.chats();
    assert_eq!(chats[0].messages.len(), 4);
}

#[tokio::test]
async fn test_history_survives_restart() {
    let dir = TempDir::new().unwrap();
    let webhook = spawn_webhook().await;
    {
        let (server, state) = setup(&dir, StorageBackend::Local).await;
        save_settings(&server, &webhook, "").await;
        server.post("/messages").form(&[("message", "Запомни меня")]).await;
        wait_for_reply(&state).await;
    }

    let (server, state) = setup(&dir, StorageBackend::Local).await;
    let chats = state.workspace.chats();
    assert_eq!(chats.len(), 1);
    assert_eq!(chats[0].messages.len(), 2);
    assert_eq!(state.settings.get().password, "hunter2");

    let html = server.get("/").await.text();
    assert!(html.contains("Запомни меня"));
    assert!(!html.contains("onboarding-banner"));
}

// =============================================================================
// Sidebar management
// =============================================================================

#[tokio::test]
async fn test_chat_and_project_management() {
    let dir = TempDir::new().unwrap();
    let (server, state) = setup(&dir, StorageBackend::Local).await;

    let (chat_id, _) = state.workspace.create_chat_if_needed("Черновик");

    server
        .post("/projects")
        .form(&[("name", "Работа")])
        .await
        .assert_status(StatusCode::SEE_OTHER);
    let project_id = state.workspace.projects()[0].id.clone();

    server
        .post(&format!("/chats/{chat_id}/rename"))
        .form(&[("title", "План")])
        .await
        .assert_status(StatusCode::SEE_OTHER);
    server
        .post(&format!("/chats/{chat_id}/project"))
        .form(&[("project_id", project_id.as_str())])
        .await
        .assert_status(StatusCode::SEE_OTHER);

    let chat = state.workspace.chat(&chat_id).unwrap();
    assert_eq!(chat.title, "План");
    assert_eq!(chat.project_id.as_deref(), Some(project_id.as_str()));

    server
        .post(&format!("/chats/{chat_id}/project"))
        .form(&[("project_id", "nope")])
        .await
        .assert_status_not_found();
    server
        .post(&format!("/chats/{chat_id}/rename"))
        .form(&[("title", "   ")])
        .await
        .assert_status(StatusCode::SEE_OTHER);
    assert_eq!(state.workspace.chat(&chat_id).unwrap().title, "План");

    server
        .post(&format!("/projects/{project_id}/delete"))
        .await
        .assert_status(StatusCode::SEE_OTHER);
    assert!(state.workspace.chat(&chat_id).unwrap().project_id.is_none());

    let html = server.get("/?q=zzz").await.text();
    assert!(html.contains("Ничего не найдено"));

    server
        .post(&format!("/chats/{chat_id}/delete"))
        .await
        .assert_status(StatusCode::SEE_OTHER);
    assert!(state.workspace.chats().is_empty());
    server
        .post(&format!("/chats/{chat_id}/delete"))
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn test_model_selection() {
    let dir = TempDir::new().unwrap();
    let (server, _) = setup(&dir, StorageBackend::Local).await;

    server
        .post("/model")
        .form(&[("model_id", "9")])
        .await
        .assert_status(StatusCode::SEE_OTHER);
    let models: Value = server.get("/api/models").await.json();
    assert_eq!(models["selected"], "9");

    server
        .post("/model")
        .form(&[("model_id", "999")])
        .await
        .assert_status_bad_request();
}

// =============================================================================
// Attachments
// =============================================================================

#[tokio::test]
async fn test_attachment_drafts() {
    let dir = TempDir::new().unwrap();
    let (server, state) = setup(&dir, StorageBackend::Local).await;

    let form = MultipartForm::new()
        .add_text("source", "file")
        .add_part(
            "files",
            Part::bytes(b"hello".to_vec())
                .file_name("notes.txt")
                .mime_type("text/plain"),
        )
        .add_part(
            "files",
            Part::bytes(b"MZ".to_vec())
                .file_name("setup.exe")
                .mime_type("application/octet-stream"),
        );
    server
        .post("/attachments")
        .multipart(form)
        .await
        .assert_status(StatusCode::SEE_OTHER);

    let drafts = state.workspace.drafts();
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].name, "notes.txt");

    let fragment = server.get("/attachments").await.text();
    assert!(fragment.contains("notes.txt"));
    assert!(fragment.contains(UNSUPPORTED_FILE));
    assert!(fragment.contains("load delay:4s"));
    assert!(server.get("/").await.text().contains(UNSUPPORTED_FILE));

    server
        .post("/attachments/3/delete")
        .await
        .assert_status_not_found();
    server
        .post("/attachments/0/delete")
        .await
        .assert_status(StatusCode::SEE_OTHER);
    assert!(state.workspace.drafts().is_empty());
}

// =============================================================================
// Hosted history
// =============================================================================

#[tokio::test]
async fn test_hosted_mode_follows_user_id() {
    let dir = TempDir::new().unwrap();
    let (server, _) = setup(&dir, StorageBackend::Hosted).await;

    let status: Value = server.get("/api/status").await.json();
    assert_eq!(status["storage"], "local");
    assert_eq!(status["hosted_configured"], true);

    save_settings(&server, "hook.example.com", "alice").await;
    let status: Value = server.get("/api/status").await.json();
    assert_eq!(status["storage"], "online");
    assert_eq!(status["webhook_configured"], true);

    save_settings(&server, "hook.example.com", "").await;
    let status: Value = server.get("/api/status").await.json();
    assert_eq!(status["storage"], "local");
}
