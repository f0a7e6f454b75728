use crate::AppState;
use crate::router::handle_fetch;
use crate::{push, sync};
use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/__worker/status", get(handle_status))
        .route("/__worker/message", post(handle_message))
        .route("/__worker/queue", post(handle_enqueue))
        .route("/__worker/sync/{tag}", post(handle_sync))
        .route("/__worker/push", post(push::handle_push))
        // Everything else is the fetch interception path
        .fallback(handle_fetch)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn handle_status(State(state): State<AppState>) -> impl IntoResponse {
    let entries = match state.index.entry_count(&state.config.cache_name).await {
        Ok(count) => count,
        Err(e) => {
            error!("Failed to count cache entries: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Cache index error").into_response();
        }
    };
    let namespaces = match state.index.list_namespaces().await {
        Ok(namespaces) => namespaces,
        Err(e) => {
            error!("Failed to list cache namespaces: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Cache index error").into_response();
        }
    };

    Json(json!({
        "phase": state.phase().as_str(),
        "cache_name": state.config.cache_name,
        "entries": entries,
        "namespaces": namespaces,
    }))
    .into_response()
}

#[derive(Debug, Deserialize)]
struct ControlMessage {
    #[serde(rename = "type")]
    kind: String,
}

async fn handle_message(
    State(state): State<AppState>,
    Json(message): Json<ControlMessage>,
) -> impl IntoResponse {
    info!("📨 Control message received: {}", message.kind);

    match message.kind.as_str() {
        "SKIP_WAITING" => match state.skip_waiting().await {
            Ok(()) => (
                StatusCode::OK,
                Json(json!({"status": "ok", "phase": state.phase().as_str()})),
            )
                .into_response(),
            Err(e) => {
                error!("❌ Skip-waiting failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to activate").into_response()
            }
        },
        other => {
            warn!("Ignoring unknown message type: {}", other);
            StatusCode::NO_CONTENT.into_response()
        }
    }
}

async fn handle_enqueue(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> impl IntoResponse {
    match state.sync_queue.enqueue(payload).await {
        Ok(id) => {
            info!("📥 Queued sync payload {}", id);
            (StatusCode::OK, Json(json!({"id": id}))).into_response()
        }
        Err(e) => {
            error!("❌ Failed to enqueue sync payload: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to enqueue").into_response()
        }
    }
}

async fn handle_sync(State(state): State<AppState>, Path(tag): Path<String>) -> impl IntoResponse {
    // run_sync swallows failures by contract: the tag is always acknowledged
    sync::run_sync(&state, &tag).await;
    (StatusCode::ACCEPTED, Json(json!({"tag": tag})))
}
