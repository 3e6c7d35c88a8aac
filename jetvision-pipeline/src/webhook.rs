//! Inbound marketplace webhook processing.
//!
//! Only `TripRequestSellerResponse` events trigger work; every other event
//! type hits the default ignore arm. A single delivery may batch multiple
//! events, and events referencing trips this tenant never created are
//! expected and dropped silently.

use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use jetvision_core::repository::FlightRequestRepository;

use crate::sync::{PipelineError, PipelineSynchronizer};

/// Known marketplace event types, with a default arm for everything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEventKind {
    TripRequestSellerResponse,
    Other(String),
}

impl WebhookEventKind {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "TripRequestSellerResponse" => WebhookEventKind::TripRequestSellerResponse,
            other => WebhookEventKind::Other(other.to_string()),
        }
    }
}

/// One parsed event out of a webhook delivery.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    pub kind: WebhookEventKind,
    pub rfq_id: Option<String>,
    pub trip_id: Option<String>,
}

fn nonempty_str(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_event(event: &Value, header_event_type: Option<&str>) -> WebhookEvent {
    let kind_raw = header_event_type
        .map(str::to_string)
        .or_else(|| nonempty_str(&event["eventType"]))
        .or_else(|| nonempty_str(&event["event_type"]))
        .or_else(|| nonempty_str(&event["type"]))
        .unwrap_or_default();
    let kind = WebhookEventKind::parse(&kind_raw);

    let resource_type = nonempty_str(&event["resourceType"])
        .or_else(|| nonempty_str(&event["resource_type"]))
        .map(|s| s.to_ascii_lowercase())
        .unwrap_or_default();

    // An RFQ id is only trusted when the event explicitly concerns an RFQ
    // resource; other resource ids would pollute the request's RFQ set.
    let rfq_id = if resource_type == "rfqs" {
        nonempty_str(&event["resourceId"])
            .or_else(|| nonempty_str(&event["resource_id"]))
            .or_else(|| nonempty_str(&event["rfqId"]))
            .or_else(|| nonempty_str(&event["resource"]["id"]))
    } else {
        None
    };

    let trip_id = nonempty_str(&event["tripId"])
        .or_else(|| nonempty_str(&event["trip_id"]))
        .or_else(|| nonempty_str(&event["trip"]["id"]))
        .or_else(|| nonempty_str(&event["links"]["trip"]["id"]));

    WebhookEvent {
        kind,
        rfq_id,
        trip_id,
    }
}

/// Parse a delivery body: a single event object or an array of them.
pub fn parse_delivery(body: &Value, header_event_type: Option<&str>) -> Vec<WebhookEvent> {
    match body.as_array() {
        Some(events) => events
            .iter()
            .map(|event| parse_event(event, header_event_type))
            .collect(),
        None => vec![parse_event(body, header_event_type)],
    }
}

/// Resolves webhook events to local flight requests and re-synchronizes them.
pub struct WebhookProcessor {
    requests: Arc<dyn FlightRequestRepository>,
    synchronizer: Arc<PipelineSynchronizer>,
}

impl WebhookProcessor {
    pub fn new(
        requests: Arc<dyn FlightRequestRepository>,
        synchronizer: Arc<PipelineSynchronizer>,
    ) -> Self {
        Self {
            requests,
            synchronizer,
        }
    }

    /// Process every event in a delivery, returning the ids of all flight
    /// requests synced. Duplicate events within one delivery collapse.
    pub async fn process_delivery(
        &self,
        body: &Value,
        header_event_type: Option<&str>,
    ) -> Result<Vec<Uuid>, PipelineError> {
        let mut synced: Vec<Uuid> = Vec::new();
        for event in parse_delivery(body, header_event_type) {
            match &event.kind {
                WebhookEventKind::TripRequestSellerResponse => {
                    if let Some(id) = self.handle_seller_response(&event).await? {
                        if !synced.contains(&id) {
                            synced.push(id);
                        }
                    }
                }
                WebhookEventKind::Other(kind) => {
                    tracing::debug!("Ignoring webhook event type {:?}", kind);
                }
            }
        }
        Ok(synced)
    }

    async fn handle_seller_response(
        &self,
        event: &WebhookEvent,
    ) -> Result<Option<Uuid>, PipelineError> {
        let Some(trip_id) = &event.trip_id else {
            tracing::debug!("Seller response event without a trip id, dropping");
            return Ok(None);
        };

        let request = self
            .requests
            .find_by_trip_ref(trip_id)
            .await
            .map_err(|e| PipelineError::Store(e.to_string()))?;
        let Some(request) = request else {
            // Marketplace activity for trips this tenant never created.
            tracing::debug!("No local request for trip {}, dropping event", trip_id);
            return Ok(None);
        };

        if let Some(rfq_id) = &event.rfq_id {
            let appended = self
                .requests
                .append_rfq_id(request.id, rfq_id)
                .await
                .map_err(|e| PipelineError::Store(e.to_string()))?;
            if appended {
                tracing::info!(
                    request_id = %request.id,
                    rfq_id = %rfq_id,
                    "Webhook attached new RFQ"
                );
            }
        }

        let updated = self.synchronizer.sync_flight_request(request.id).await?;
        Ok(Some(updated.id))
    }
}
