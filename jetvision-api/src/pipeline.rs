use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use jetvision_core::identity::Role;
use jetvision_core::request::{AvinodeStatus, FlightRequest, RequestStatus};

use crate::error::{pipeline_error, AppError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message_id: String,
    pub lift_id: Option<String>,
    pub message: String,
}

/// POST /v1/requests/{id}/sync
/// Manual Pipeline Synchronizer run, the same entry point the polling
/// worker and webhook ingestion use.
pub async fn sync_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FlightRequest>, AppError> {
    match state.synchronizer.sync_flight_request(id).await {
        Ok(updated) => {
            state.metrics.syncs_total.inc();
            Ok(Json(updated))
        }
        Err(e) => {
            state.metrics.sync_failures_total.inc();
            Err(pipeline_error(e))
        }
    }
}

/// POST /v1/requests/{id}/trip
/// Manager pushes the request onto the marketplace as a trip. The response
/// deep links are stored so later syncs can rediscover the trip resource.
pub async fn create_trip(
    State(state): State<AppState>,
    Extension(role): Extension<Role>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    if role != Role::Manager {
        return Err(AppError::AuthorizationError(
            "Only managers create marketplace trips".to_string(),
        ));
    }

    let mut request = state
        .requests
        .get(id)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or_else(|| AppError::NotFoundError(format!("Flight request {} not found", id)))?;

    if request.status != RequestStatus::UnderReview {
        return Err(AppError::ConflictError(
            "Trips are created while the request is under review".to_string(),
        ));
    }
    if request.avinode_trip_id.is_some() {
        return Err(AppError::ConflictError(
            "A marketplace trip already exists for this request".to_string(),
        ));
    }

    let mut segments = vec![json!({
        "startAirport": { "icao": request.departure },
        "endAirport": { "icao": request.arrival },
        "dateTime": {
            "date": request.departure_date,
            "time": request.departure_time,
            "departure": true
        },
        "paxCount": request.passengers,
    })];
    if let Some(return_date) = &request.return_date {
        segments.push(json!({
            "startAirport": { "icao": request.arrival },
            "endAirport": { "icao": request.departure },
            "dateTime": {
                "date": return_date,
                "time": request.return_time,
                "departure": true
            },
            "paxCount": request.passengers,
        }));
    }
    let payload = json!({
        "externalId": request.id,
        "segments": segments,
    });

    let created = state
        .avinode
        .create_trip(&payload)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    request.avinode_trip_id = created.trip_id.clone();
    request.avinode_trip_href = created.trip_href.clone();
    request.avinode_search_link = created.search_link.clone();
    request.avinode_view_link = created.view_link.clone();
    request.avinode_status = request.avinode_status.advance(AvinodeStatus::SentToAvinode);
    state
        .requests
        .update(&request)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(Json(json!({
        "tripId": created.trip_id,
        "tripHref": created.trip_href,
        "searchLink": created.search_link,
        "viewLink": created.view_link,
        "avinodeStatus": request.avinode_status,
    })))
}

/// POST /v1/requests/{id}/chat
/// Relay an operator chat message through the marketplace trip-message
/// thread. Some tenant API variants reject the nested chat path; the client
/// falls back to a flat tripmsgs post internally.
pub async fn send_chat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<ChatRequest>,
) -> Result<Json<Value>, AppError> {
    let request = state
        .requests
        .get(id)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or_else(|| AppError::NotFoundError(format!("Flight request {} not found", id)))?;

    let trip_id = request.avinode_trip_id.ok_or_else(|| {
        AppError::ValidationError("Request has no marketplace trip".to_string())
    })?;

    let response = state
        .avinode
        .send_chat(
            &input.message_id,
            &trip_id,
            input.lift_id.as_deref(),
            &input.message,
        )
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(Json(response))
}

/// GET /v1/health
/// Liveness plus an 8-second-capped marketplace connectivity probe.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let avinode_reachable = state.avinode.ping().await;
    Json(json!({
        "status": "ok",
        "avinode": if avinode_reachable { "reachable" } else { "unreachable" },
    }))
}
