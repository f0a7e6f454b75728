//! Push payload rendering
//!
//! The gateway does not display notifications; it turns a received push
//! payload (or the configured default text) into the notification descriptor
//! the client should show.

use crate::AppState;
use appshell_core::Notification;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use tracing::info;

pub async fn handle_push(State(state): State<AppState>, body: String) -> impl IntoResponse {
    info!("📬 Push received ({} bytes)", body.len());

    let payload = if body.is_empty() {
        None
    } else {
        Some(body.as_str())
    };
    let notification = Notification::from_push(
        &state.config.app_name,
        payload,
        &state.config.default_push_body,
        "/",
        Utc::now().timestamp_millis(),
    );

    (StatusCode::OK, Json(notification))
}
