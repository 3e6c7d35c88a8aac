use axum::{extract::State, http::HeaderMap, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// Case-variant header names tenants use for the event type.
const EVENT_TYPE_HEADERS: [&str; 3] = [
    "X-Avinode-EventType",
    "X-Avinode-Event-Type",
    "X-Event-Type",
];

/// POST /v1/webhooks/avinode
/// Inbound marketplace events. Only seller responses trigger work; every
/// delivery is acknowledged with `{"ok": true}`, even ignored or failed
/// ones, to prevent upstream retry storms.
pub async fn handle_avinode_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    state.metrics.webhook_events_total.inc();

    let header_type = EVENT_TYPE_HEADERS
        .iter()
        .find_map(|name| headers.get(*name).and_then(|v| v.to_str().ok()))
        .map(str::to_string);

    match state
        .webhooks
        .process_delivery(&body, header_type.as_deref())
        .await
    {
        Ok(synced) => Json(json!({ "ok": true, "synced": synced })),
        Err(e) => {
            tracing::error!("Webhook processing failed: {}", e);
            Json(json!({ "ok": true, "synced": [] }))
        }
    }
}
