//! JSON-RPC request handlers.

use crate::server::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use mlbridge::transport::{process_request, BridgeRequest, BridgeResponse};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

/// Health check endpoint.
pub async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "classes": state.runtime.class_names().len(),
        "objects": state.runtime.object_count().ok(),
    }))
}

/// Main JSON-RPC handler.
///
/// Bridge methods (`invoke`, `construct`, `call_static`) go to the shared
/// runtime. `health_check` and `list_classes` are answered here.
pub async fn handle_rpc(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BridgeRequest>,
) -> impl IntoResponse {
    debug!("RPC call: {}({:?})", request.method, request.params);

    let response = match request.method.as_str() {
        "health_check" => BridgeResponse::success(request.id, json!({"status": "ok"})),
        "list_classes" => {
            BridgeResponse::success(request.id, json!(state.runtime.class_names()))
        }
        _ => process_request(request, &*state.runtime).await,
    };

    (StatusCode::OK, Json(response))
}
