use axum::{extract::State, response::IntoResponse};

use crate::AppState;
use crate::events::build_sse_response;

/// GET /events - Live workspace updates for htmx's SSE extension.
pub async fn stream_events(State(state): State<AppState>) -> impl IntoResponse {
    tracing::debug!("SSE client connected");
    build_sse_response(state.events.stream())
}
