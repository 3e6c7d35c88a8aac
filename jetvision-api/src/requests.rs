use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use jetvision_core::identity::Role;
use jetvision_core::notification::Notification;
use jetvision_core::request::{
    AvinodeStatus, FlightRequest, NewFlightRequest, RequestStatus,
};
use jetvision_pipeline::pricing;
use jetvision_pipeline::status::validate_transition;
use jetvision_pipeline::sync::resolve_trip_resource_id;

use crate::error::{status_error, AppError};
use crate::middleware::auth::StaffClaims;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectQuoteRequest {
    pub quote_id: String,
    pub operator: Option<String>,
    pub amount: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalPricingRequest {
    /// Overrides the selected quote amount when the manager reprices.
    pub base_price: Option<f64>,
    pub iso_commission: f64,
    pub jetvision_cost: f64,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub decision: String,
}

// ============================================================================
// Helpers
// ============================================================================

fn store_error(err: jetvision_core::BoxError) -> AppError {
    AppError::InternalServerError(err.to_string())
}

async fn load(state: &AppState, id: Uuid) -> Result<FlightRequest, AppError> {
    state
        .requests
        .get(id)
        .await
        .map_err(store_error)?
        .ok_or_else(|| AppError::NotFoundError(format!("Flight request {} not found", id)))
}

/// Fire-and-forget role-targeted notification: a row for the in-app list
/// plus a Kafka event for downstream delivery. Failures are logged and never
/// block the transition that produced them.
pub(crate) async fn notify(
    state: &AppState,
    request_id: Uuid,
    recipient_role: Role,
    kind: &str,
    message: String,
) {
    let notification = Notification::new(request_id, recipient_role, kind, message);
    if let Err(e) = state.notifications.create(&notification).await {
        tracing::warn!(
            "Notification write failed for request {}: {}",
            request_id,
            e
        );
    }
    if let Err(e) = state
        .kafka
        .publish_request_event(kind, request_id, recipient_role)
        .await
    {
        tracing::warn!(
            "Notification event publish failed for request {}: {}",
            request_id,
            e
        );
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/requests
/// ISO submits a new flight request; it enters the pipeline as `pending`.
pub async fn create_request(
    State(state): State<AppState>,
    Extension(claims): Extension<StaffClaims>,
    Extension(role): Extension<Role>,
    Json(input): Json<NewFlightRequest>,
) -> Result<(StatusCode, Json<FlightRequest>), AppError> {
    if role != Role::Iso {
        return Err(AppError::AuthorizationError(
            "Only ISO agents submit flight requests".to_string(),
        ));
    }
    if input.passengers <= 0 {
        return Err(AppError::ValidationError(
            "Passenger count must be positive".to_string(),
        ));
    }

    let request = FlightRequest::new(claims.sub.clone(), claims.name.clone(), input);
    state.requests.create(&request).await.map_err(store_error)?;

    notify(
        &state,
        request.id,
        Role::Manager,
        "request_submitted",
        format!(
            "New flight request {} → {} from {}",
            request.departure, request.arrival, request.iso_name
        ),
    )
    .await;

    Ok((StatusCode::CREATED, Json(request)))
}

/// GET /v1/requests
/// Managers see the full pipeline; ISOs see their own requests.
pub async fn list_requests(
    State(state): State<AppState>,
    Extension(claims): Extension<StaffClaims>,
    Extension(role): Extension<Role>,
) -> Result<Json<Vec<FlightRequest>>, AppError> {
    let requests = match role {
        Role::Manager => state.requests.list().await.map_err(store_error)?,
        Role::Iso => state
            .requests
            .list_for_iso(&claims.sub)
            .await
            .map_err(store_error)?,
    };
    Ok(Json(requests))
}

/// GET /v1/requests/{id}
pub async fn get_request(
    State(state): State<AppState>,
    Extension(claims): Extension<StaffClaims>,
    Extension(role): Extension<Role>,
    Path(id): Path<Uuid>,
) -> Result<Json<FlightRequest>, AppError> {
    let request = load(&state, id).await?;
    if role == Role::Iso && request.iso_id != claims.sub {
        return Err(AppError::NotFoundError(format!(
            "Flight request {} not found",
            id
        )));
    }
    Ok(Json(request))
}

/// GET /v1/requests/{id}/transitions
/// The pipeline moves this caller may make from the request's current
/// state. The UI renders exactly these as actions.
pub async fn available_transitions_for(
    State(state): State<AppState>,
    Extension(role): Extension<Role>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<RequestStatus>>, AppError> {
    let request = load(&state, id).await?;
    Ok(Json(jetvision_pipeline::status::available_transitions(
        request.status,
        role,
    )))
}

/// POST /v1/requests/{id}/review
/// Manager starts working the request: pending → under_review.
pub async fn start_review(
    State(state): State<AppState>,
    Extension(role): Extension<Role>,
    Path(id): Path<Uuid>,
) -> Result<Json<FlightRequest>, AppError> {
    let mut request = load(&state, id).await?;
    validate_transition(request.status, RequestStatus::UnderReview, role)
        .map_err(status_error)?;
    request.update_status(RequestStatus::UnderReview);
    state.requests.update(&request).await.map_err(store_error)?;
    Ok(Json(request))
}

/// POST /v1/requests/{id}/rfqs/confirm
/// Manager confirms RFQs went out on the marketplace:
/// under_review → rfq_submitted.
pub async fn confirm_rfqs(
    State(state): State<AppState>,
    Extension(role): Extension<Role>,
    Path(id): Path<Uuid>,
) -> Result<Json<FlightRequest>, AppError> {
    let mut request = load(&state, id).await?;
    validate_transition(request.status, RequestStatus::RfqSubmitted, role)
        .map_err(status_error)?;
    if request.avinode_trip_id.is_none() {
        return Err(AppError::ValidationError(
            "Create the marketplace trip before confirming RFQs".to_string(),
        ));
    }
    request.update_status(RequestStatus::RfqSubmitted);
    request.avinode_status = request.avinode_status.advance(AvinodeStatus::RfqSent);
    state.requests.update(&request).await.map_err(store_error)?;
    Ok(Json(request))
}

/// POST /v1/requests/{id}/quote
/// Manager selects one seller's quote from the synchronized set:
/// rfq_submitted → quote_received.
pub async fn select_quote(
    State(state): State<AppState>,
    Extension(role): Extension<Role>,
    Path(id): Path<Uuid>,
    Json(input): Json<SelectQuoteRequest>,
) -> Result<Json<FlightRequest>, AppError> {
    let mut request = load(&state, id).await?;
    validate_transition(request.status, RequestStatus::QuoteReceived, role)
        .map_err(status_error)?;
    if !request.avinode_quote_ids.contains(&input.quote_id) {
        return Err(AppError::ValidationError(format!(
            "Quote {} is not part of the synchronized set",
            input.quote_id
        )));
    }
    if input.amount <= 0.0 {
        return Err(AppError::ValidationError(
            "Quote amount must be positive".to_string(),
        ));
    }

    request.selected_quote_id = Some(input.quote_id);
    request.selected_operator = input.operator;
    request.selected_quote_amount = Some(input.amount);
    request.update_status(RequestStatus::QuoteReceived);
    state.requests.update(&request).await.map_err(store_error)?;
    Ok(Json(request))
}

/// POST /v1/requests/{id}/proposal
/// Manager enters pricing: quote_received → proposal_ready. Notifies the
/// owning ISO that the proposal is ready to send.
pub async fn build_proposal(
    State(state): State<AppState>,
    Extension(role): Extension<Role>,
    Path(id): Path<Uuid>,
    Json(input): Json<ProposalPricingRequest>,
) -> Result<Json<FlightRequest>, AppError> {
    let mut request = load(&state, id).await?;
    validate_transition(request.status, RequestStatus::ProposalReady, role)
        .map_err(status_error)?;

    let base = input
        .base_price
        .or(request.selected_quote_amount)
        .ok_or_else(|| {
            AppError::ValidationError("No base price available for the proposal".to_string())
        })?;

    request.iso_commission = Some(input.iso_commission);
    request.jetvision_cost = Some(input.jetvision_cost);
    request.total_price = Some(pricing::proposal_total(
        base,
        input.iso_commission,
        input.jetvision_cost,
    ));
    request.proposal_notes = input.notes;
    request.update_status(RequestStatus::ProposalReady);
    state.requests.update(&request).await.map_err(store_error)?;

    notify(
        &state,
        request.id,
        Role::Iso,
        "proposal_ready",
        format!(
            "Proposal for {} → {} is ready to send ({} {})",
            request.departure,
            request.arrival,
            request.total_price.unwrap_or_default(),
            pricing::display_currency(request.avinode_best_quote_currency.as_deref()),
        ),
    )
    .await;

    Ok(Json(request))
}

/// POST /v1/requests/{id}/proposal/sent
/// ISO reports the proposal went to the client:
/// proposal_ready → proposal_sent.
pub async fn mark_proposal_sent(
    State(state): State<AppState>,
    Extension(role): Extension<Role>,
    Path(id): Path<Uuid>,
) -> Result<Json<FlightRequest>, AppError> {
    let mut request = load(&state, id).await?;
    validate_transition(request.status, RequestStatus::ProposalSent, role)
        .map_err(status_error)?;
    if request.total_price.is_none() {
        return Err(AppError::ValidationError(
            "Proposal pricing is incomplete".to_string(),
        ));
    }
    request.proposal_sent_at = Some(Utc::now());
    request.update_status(RequestStatus::ProposalSent);
    state.requests.update(&request).await.map_err(store_error)?;
    Ok(Json(request))
}

/// POST /v1/requests/{id}/decision
/// ISO records the client's real-world decision:
/// proposal_sent → accepted | declined.
pub async fn record_decision(
    State(state): State<AppState>,
    Extension(role): Extension<Role>,
    Path(id): Path<Uuid>,
    Json(input): Json<DecisionRequest>,
) -> Result<Json<FlightRequest>, AppError> {
    let target = match input.decision.as_str() {
        "accepted" => RequestStatus::Accepted,
        "declined" => RequestStatus::Declined,
        other => {
            return Err(AppError::ValidationError(format!(
                "Unknown decision '{}'",
                other
            )))
        }
    };

    let mut request = load(&state, id).await?;
    validate_transition(request.status, target, role).map_err(status_error)?;
    request.client_decision_at = Some(Utc::now());
    if target == RequestStatus::Accepted {
        request.avinode_status = request.avinode_status.advance(AvinodeStatus::Booked);
    }
    request.update_status(target);
    state.requests.update(&request).await.map_err(store_error)?;

    notify(
        &state,
        request.id,
        Role::Manager,
        "client_decision",
        format!(
            "Client {} the proposal for {} → {}",
            input.decision, request.departure, request.arrival
        ),
    )
    .await;

    Ok(Json(request))
}

/// POST /v1/requests/{id}/cancel
/// ISO cancels the deal from any non-terminal state. A linked marketplace
/// trip is cancelled remotely as well.
pub async fn cancel_request(
    State(state): State<AppState>,
    Extension(role): Extension<Role>,
    Path(id): Path<Uuid>,
) -> Result<Json<FlightRequest>, AppError> {
    let mut request = load(&state, id).await?;
    validate_transition(request.status, RequestStatus::Cancelled, role)
        .map_err(status_error)?;

    if request.avinode_trip_id.is_some() {
        let trip_ref = resolve_trip_resource_id(&request).ok_or_else(|| {
            AppError::InternalServerError("Stored trip reference is unusable".to_string())
        })?;
        state
            .avinode
            .cancel_trip(&trip_ref)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
        request.avinode_status = request.avinode_status.advance(AvinodeStatus::Cancelled);
    }

    request.update_status(RequestStatus::Cancelled);
    state.requests.update(&request).await.map_err(store_error)?;

    notify(
        &state,
        request.id,
        Role::Manager,
        "request_cancelled",
        format!(
            "Request {} → {} was cancelled",
            request.departure, request.arrival
        ),
    )
    .await;

    Ok(Json(request))
}
