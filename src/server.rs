use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    Router,
    extract::{DefaultBodyLimit, Request},
    http::StatusCode,
    middleware::Next,
    response::IntoResponse,
};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::AppState;
use crate::api;
use crate::attachments::{MAX_FILE_SIZE, MAX_FILES};
use crate::config::{AppConfig, StorageBackend};
use crate::conversation::{ConversationService, RealtimeSync};
use crate::crypto::SecretBox;
use crate::events::EventBus;
use crate::storage::{LocalStore, Persistence, SettingsStore};
use crate::webhook::WebhookClient;
use crate::workspace::Workspace;

/// Request body limit: a full selection of maximum-size files plus form overhead.
pub const MAX_BODY_BYTES: usize = (MAX_FILES as u64 * MAX_FILE_SIZE) as usize + 5 * 1024 * 1024;

const EVENT_CAPACITY: usize = 256;

/// Build the shared state: stores, restored history and services.
pub async fn build_state(config: Arc<AppConfig>) -> anyhow::Result<AppState> {
    let local = LocalStore::open(&config.storage.data_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to open data directory {}",
                config.storage.data_dir.display()
            )
        })?;

    let secrets = SecretBox::new(local.clone());
    let settings =
        SettingsStore::load(local.clone(), secrets, config.webhook.default_settings()).await;

    let events = EventBus::new(EVENT_CAPACITY);
    let workspace = Workspace::new();

    let hosted = (config.storage.backend == StorageBackend::Hosted)
        .then(|| config.storage.hosted.clone());
    let persistence = Arc::new(Persistence::new(
        local,
        None,
        hosted,
        workspace.clone(),
        events.clone(),
    ));
    persistence.restore(&settings.get()).await;

    let webhook = WebhookClient::new(Duration::from_secs(config.webhook.timeout_secs))
        .context("Failed to build webhook client")?;

    let conversation = ConversationService::new(
        workspace.clone(),
        settings.clone(),
        Arc::clone(&persistence),
        webhook,
        events.clone(),
    );

    let sync = RealtimeSync::new(Arc::clone(&persistence), workspace.clone(), events.clone());
    sync.restart().await;

    Ok(AppState {
        config,
        workspace,
        settings,
        persistence,
        conversation,
        sync,
        events,
    })
}

/// Assemble the router: pages, forms and JSON behind the request timeout,
/// the SSE stream outside it, and static assets.
pub fn build_router(state: AppState) -> Router {
    let timeout_duration = Duration::from_secs(state.config.server.request_timeout_secs);
    let static_dir = state.config.ui.static_dir.clone();

    api::router()
        .layer(axum::middleware::from_fn(
            move |req: Request, next: Next| {
                let duration = timeout_duration;
                async move {
                    match tokio::time::timeout(duration, next.run(req)).await {
                        Ok(res) => res,
                        Err(_) => {
                            (StatusCode::REQUEST_TIMEOUT, "Request timed out").into_response()
                        }
                    }
                }
            },
        ))
        .merge(api::events_router())
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    info!(
        name: "config.loaded",
        backend = ?config.storage.backend,
        data_dir = %config.storage.data_dir.display(),
        "Configuration loaded"
    );

    let state = build_state(Arc::clone(&config)).await?;
    info!(
        name: "storage.ready",
        mode = state.persistence.mode().as_str(),
        chats = state.workspace.chats().len(),
        "History ready"
    );

    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
