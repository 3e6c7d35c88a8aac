//! The authoritative reconciliation routine between local flight-request
//! state and marketplace truth.
//!
//! Triggered by explicit user action, the polling worker, and inbound
//! webhooks. All three paths funnel into [`PipelineSynchronizer`], and
//! re-running it against unchanged remote state produces the same persisted
//! fields apart from the last-sync timestamp.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use jetvision_avinode::extract;
use jetvision_core::marketplace::MarketplaceApi;
use jetvision_core::repository::FlightRequestRepository;
use jetvision_core::request::{AvinodeStatus, FlightRequest, SyncUpdate};

use crate::sla;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Flight request not found: {0}")]
    NotFound(Uuid),

    #[error("Marketplace call failed: {0}")]
    Marketplace(String),

    #[error("Datastore operation failed: {0}")]
    Store(String),
}

/// Reconciles one flight request with the marketplace.
pub struct PipelineSynchronizer {
    requests: Arc<dyn FlightRequestRepository>,
    marketplace: Arc<dyn MarketplaceApi>,
}

/// A marketplace trip id in the long-form resource format: a long opaque
/// token, safe to use directly against the trips endpoint. Short legacy
/// references instead go through link parsing.
pub fn is_long_form_trip_id(id: &str) -> bool {
    let id = id.trim();
    id.len() >= 20
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Extract the trip resource id from a marketplace deep link
/// (`.../trips/{id}/...`).
pub fn trip_id_from_link(link: &str) -> Option<String> {
    let marker = "/trips/";
    let start = link.find(marker)? + marker.len();
    let rest = &link[start..];
    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(rest.len());
    if end == 0 {
        None
    } else {
        Some(rest[..end].to_string())
    }
}

/// Resolve the trip resource id to use for RFQ discovery: the stored trip id
/// when already long-form, else parsed out of the trip href or search link,
/// else whatever short id is stored as a last resort.
pub fn resolve_trip_resource_id(request: &FlightRequest) -> Option<String> {
    if let Some(id) = &request.avinode_trip_id {
        if is_long_form_trip_id(id) {
            return Some(id.clone());
        }
    }
    for link in [&request.avinode_trip_href, &request.avinode_search_link]
        .into_iter()
        .flatten()
    {
        if let Some(id) = trip_id_from_link(link) {
            return Some(id);
        }
    }
    request
        .avinode_trip_id
        .as_ref()
        .filter(|id| !id.trim().is_empty())
        .cloned()
}

struct QuoteAggregate {
    quote_ids: Vec<String>,
    quote_count: i32,
    best: Option<(f64, Option<String>, String)>,
    first_quote_at: Option<DateTime<Utc>>,
}

impl PipelineSynchronizer {
    pub fn new(
        requests: Arc<dyn FlightRequestRepository>,
        marketplace: Arc<dyn MarketplaceApi>,
    ) -> Self {
        Self {
            requests,
            marketplace,
        }
    }

    /// Run one full synchronization cycle for a request and return the
    /// updated record.
    pub async fn sync_flight_request(
        &self,
        request_id: Uuid,
    ) -> Result<FlightRequest, PipelineError> {
        let request = self
            .requests
            .get(request_id)
            .await
            .map_err(|e| PipelineError::Store(e.to_string()))?
            .ok_or(PipelineError::NotFound(request_id))?;

        let mut rfq_ids = request.avinode_rfq_ids.clone();
        let mut messages: Vec<Value> = Vec::new();

        // RFQ-id discovery through the trip resource. Failures here are
        // non-fatal: sync continues with whatever is already known.
        if rfq_ids.is_empty() {
            if let Some(trip_ref) = resolve_trip_resource_id(&request) {
                match self.marketplace.fetch_trip(&trip_ref).await {
                    Ok(trip) => {
                        for id in extract::trip_rfq_ids(&trip) {
                            if !rfq_ids.contains(&id) {
                                rfq_ids.push(id);
                            }
                        }
                        for message_id in extract::trip_message_ids(&trip) {
                            match self.marketplace.fetch_trip_message(&message_id).await {
                                Ok(message) => messages.push(message),
                                Err(e) => tracing::warn!(
                                    "Skipping trip message {}: {}",
                                    message_id,
                                    e
                                ),
                            }
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            "RFQ discovery failed for request {}: {}",
                            request_id,
                            e
                        );
                    }
                }
            }
        }

        let aggregate = self.aggregate_quotes(&rfq_ids, &messages).await?;

        let (best_quote_amount, best_quote_currency) =
            self.refine_best_quote(aggregate.best).await;

        let now = Utc::now();
        let update = SyncUpdate {
            quote_count: aggregate.quote_count,
            quote_ids: aggregate.quote_ids,
            best_quote_amount,
            best_quote_currency,
            first_quote_at: aggregate.first_quote_at,
            sla_due_at: sla::sla_due(request.created_at),
            sla_status: sla::sla_status(request.created_at, aggregate.quote_count > 0, now),
            avinode_status: request.avinode_status.advance(if aggregate.quote_count > 0 {
                AvinodeStatus::QuotesReceived
            } else if !rfq_ids.is_empty() {
                AvinodeStatus::RfqSent
            } else {
                AvinodeStatus::SentToAvinode
            }),
            rfq_ids,
            last_sync_at: now,
        };

        self.requests
            .update_sync(request_id, &update)
            .await
            .map_err(|e| PipelineError::Store(e.to_string()))?;

        tracing::info!(
            request_id = %request_id,
            quote_count = update.quote_count,
            sla_status = update.sla_status.as_str(),
            "Pipeline sync complete"
        );

        self.requests
            .get(request_id)
            .await
            .map_err(|e| PipelineError::Store(e.to_string()))?
            .ok_or(PipelineError::NotFound(request_id))
    }

    /// Fetch every RFQ (concurrently; they share no mutable state) and fold
    /// the extracted quotes into counts, the quote-id list, the earliest
    /// quote timestamp, and the minimum-amount best quote.
    async fn aggregate_quotes(
        &self,
        rfq_ids: &[String],
        messages: &[Value],
    ) -> Result<QuoteAggregate, PipelineError> {
        let fetches = rfq_ids.iter().map(|id| self.marketplace.fetch_rfq(id));
        let results = futures_util::future::join_all(fetches).await;

        let mut aggregate = QuoteAggregate {
            quote_ids: Vec::new(),
            quote_count: 0,
            best: None,
            first_quote_at: None,
        };

        for (rfq_id, result) in rfq_ids.iter().zip(results) {
            let rfq = result.map_err(|e| {
                PipelineError::Marketplace(format!("fetching RFQ {}: {}", rfq_id, e))
            })?;
            for quote in extract::extract_rfq_quotes(&rfq, messages) {
                let (Some(quote_id), Some(amount)) = (quote.quote_id, quote.quoted_amount)
                else {
                    continue;
                };
                aggregate.quote_count += 1;
                if !aggregate.quote_ids.contains(&quote_id) {
                    aggregate.quote_ids.push(quote_id.clone());
                }
                if let Some(created_on) = quote.created_on {
                    aggregate.first_quote_at = Some(match aggregate.first_quote_at {
                        Some(existing) if existing <= created_on => existing,
                        _ => created_on,
                    });
                }
                let is_better = aggregate
                    .best
                    .as_ref()
                    .map(|(best_amount, _, _)| amount < *best_amount)
                    .unwrap_or(true);
                if is_better {
                    aggregate.best = Some((amount, quote.currency, quote_id));
                }
            }
        }
        Ok(aggregate)
    }

    /// Re-fetch the winning quote resource and prefer its canonical price
    /// over the lift-embedded one, which can lag behind. A failed refresh
    /// keeps the embedded value rather than discarding the whole sync.
    async fn refine_best_quote(
        &self,
        best: Option<(f64, Option<String>, String)>,
    ) -> (Option<f64>, Option<String>) {
        let Some((amount, currency, quote_id)) = best else {
            return (None, None);
        };
        match self.marketplace.fetch_quote(&quote_id).await {
            Ok(quote) => {
                if let Some((canonical_amount, canonical_currency)) =
                    extract::canonical_quote_price(&quote)
                {
                    return (
                        Some(canonical_amount),
                        canonical_currency.or(currency),
                    );
                }
                (Some(amount), currency)
            }
            Err(e) => {
                tracing::warn!("Best-quote refresh failed for {}: {}", quote_id, e);
                (Some(amount), currency)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{lift, rfq_with_lifts, sample_request, CannedMarketplace, InMemoryRequests};
    use serde_json::json;

    fn synchronizer(
        repo: Arc<InMemoryRequests>,
        marketplace: CannedMarketplace,
    ) -> PipelineSynchronizer {
        PipelineSynchronizer::new(repo, Arc::new(marketplace))
    }

    #[test]
    fn test_long_form_trip_id_detection() {
        assert!(is_long_form_trip_id("atrip-1234567890abcdef"));
        assert!(!is_long_form_trip_id("12345"));
        assert!(!is_long_form_trip_id("atrip 1234567890abcdef"));
    }

    #[test]
    fn test_trip_id_from_link() {
        assert_eq!(
            trip_id_from_link("https://sandbox.avinode.com/api/trips/atrip-9f2/rfqs").as_deref(),
            Some("atrip-9f2")
        );
        assert_eq!(
            trip_id_from_link("https://marketplace.avinode.com/trips/abc123").as_deref(),
            Some("abc123")
        );
        assert_eq!(trip_id_from_link("https://example.com/nothing"), None);
    }

    #[test]
    fn test_resolve_trip_resource_id_prefers_long_form() {
        let mut request = sample_request();
        request.avinode_trip_id = Some("atrip-1234567890abcdef".to_string());
        request.avinode_trip_href = Some("https://x.test/trips/other-id".to_string());
        assert_eq!(
            resolve_trip_resource_id(&request).as_deref(),
            Some("atrip-1234567890abcdef")
        );

        request.avinode_trip_id = Some("42".to_string());
        assert_eq!(
            resolve_trip_resource_id(&request).as_deref(),
            Some("other-id")
        );
    }

    #[tokio::test]
    async fn test_best_quote_is_minimum_by_amount() {
        let mut request = sample_request();
        request.avinode_rfq_ids = vec!["rfq-1".to_string(), "rfq-2".to_string()];
        let id = request.id;

        let repo = Arc::new(InMemoryRequests::with(request));
        let mut marketplace = CannedMarketplace::default();
        marketplace.rfqs.insert(
            "rfq-1".to_string(),
            rfq_with_lifts(
                "rfq-1",
                vec![
                    lift("Alpha Jets", "q-a", 50000.0),
                    lift("Bravo Air", "q-b", 42000.0),
                ],
            ),
        );
        marketplace.rfqs.insert(
            "rfq-2".to_string(),
            rfq_with_lifts("rfq-2", vec![lift("Charlie Aviation", "q-c", 60000.0)]),
        );

        let sync = synchronizer(repo, marketplace);
        let updated = sync.sync_flight_request(id).await.unwrap();

        assert_eq!(updated.avinode_quote_count, 3);
        assert_eq!(updated.avinode_best_quote_amount, Some(42000.0));
        assert_eq!(updated.avinode_quote_ids, vec!["q-a", "q-b", "q-c"]);
        assert_eq!(
            updated.avinode_status,
            jetvision_core::request::AvinodeStatus::QuotesReceived
        );
        assert_eq!(
            updated.avinode_sla_status,
            Some(jetvision_core::request::SlaStatus::Met)
        );
    }

    #[tokio::test]
    async fn test_canonical_quote_overrides_stale_embedded_price() {
        let mut request = sample_request();
        request.avinode_rfq_ids = vec!["rfq-1".to_string()];
        let id = request.id;

        let repo = Arc::new(InMemoryRequests::with(request));
        let mut marketplace = CannedMarketplace::default();
        marketplace.rfqs.insert(
            "rfq-1".to_string(),
            rfq_with_lifts("rfq-1", vec![lift("Alpha Jets", "q-a", 50000.0)]),
        );
        marketplace.quotes.insert(
            "q-a".to_string(),
            json!({"sellerPrice": {"amount": 48500, "currency": "EUR"}}),
        );

        let sync = synchronizer(repo, marketplace);
        let updated = sync.sync_flight_request(id).await.unwrap();

        assert_eq!(updated.avinode_best_quote_amount, Some(48500.0));
        assert_eq!(updated.avinode_best_quote_currency.as_deref(), Some("EUR"));
    }

    #[tokio::test]
    async fn test_sync_is_idempotent() {
        let mut request = sample_request();
        request.avinode_rfq_ids = vec!["rfq-1".to_string()];
        let id = request.id;

        let repo = Arc::new(InMemoryRequests::with(request));
        let mut marketplace = CannedMarketplace::default();
        marketplace.rfqs.insert(
            "rfq-1".to_string(),
            rfq_with_lifts(
                "rfq-1",
                vec![
                    lift("Alpha Jets", "q-a", 50000.0),
                    lift("Bravo Air", "q-b", 42000.0),
                ],
            ),
        );

        let sync = synchronizer(repo.clone(), marketplace);
        let first = sync.sync_flight_request(id).await.unwrap();
        let second = sync.sync_flight_request(id).await.unwrap();

        let mut a = first.clone();
        let mut b = second.clone();
        a.avinode_last_sync_at = None;
        b.avinode_last_sync_at = None;
        a.updated_at = b.updated_at;
        assert_eq!(serde_json::to_value(&a).unwrap(), serde_json::to_value(&b).unwrap());
    }

    #[tokio::test]
    async fn test_discovery_from_search_link() {
        let mut request = sample_request();
        request.avinode_search_link =
            Some("https://marketplace.avinode.com/trips/atrip-77/search".to_string());
        let id = request.id;

        let repo = Arc::new(InMemoryRequests::with(request));
        let mut marketplace = CannedMarketplace::default();
        marketplace.trips.insert(
            "atrip-77".to_string(),
            json!({"id": "atrip-77", "rfqs": [{"id": "rfq-9"}]}),
        );
        marketplace.rfqs.insert(
            "rfq-9".to_string(),
            rfq_with_lifts("rfq-9", vec![lift("Delta Wings", "q-9", 35000.0)]),
        );

        let sync = synchronizer(repo, marketplace);
        let updated = sync.sync_flight_request(id).await.unwrap();

        assert_eq!(updated.avinode_rfq_ids, vec!["rfq-9"]);
        assert_eq!(updated.avinode_quote_count, 1);
    }

    #[tokio::test]
    async fn test_discovery_failure_is_non_fatal() {
        let mut request = sample_request();
        request.avinode_trip_id = Some("atrip-unknown-unknown-1".to_string());
        let id = request.id;

        let repo = Arc::new(InMemoryRequests::with(request));
        let sync = synchronizer(repo, CannedMarketplace::default());
        let updated = sync.sync_flight_request(id).await.unwrap();

        assert_eq!(updated.avinode_quote_count, 0);
        assert!(updated.avinode_rfq_ids.is_empty());
        assert_eq!(
            updated.avinode_status,
            jetvision_core::request::AvinodeStatus::SentToAvinode
        );
        assert!(updated.avinode_last_sync_at.is_some());
    }

    #[tokio::test]
    async fn test_rfq_fetch_error_propagates() {
        let mut request = sample_request();
        request.avinode_rfq_ids = vec!["rfq-missing".to_string()];
        let id = request.id;

        let repo = Arc::new(InMemoryRequests::with(request));
        let sync = synchronizer(repo, CannedMarketplace::default());
        let result = sync.sync_flight_request(id).await;
        assert!(matches!(result, Err(PipelineError::Marketplace(_))));
    }

    #[tokio::test]
    async fn test_first_quote_at_is_earliest() {
        let mut request = sample_request();
        request.avinode_rfq_ids = vec!["rfq-1".to_string()];
        let id = request.id;

        let mut early = lift("Alpha Jets", "q-a", 50000.0);
        early["latestQuote"]["createdOn"] = json!("2025-05-01T09:00:00Z");
        let mut late = lift("Bravo Air", "q-b", 42000.0);
        late["latestQuote"]["createdOn"] = json!("2025-05-01T11:30:00Z");

        let repo = Arc::new(InMemoryRequests::with(request));
        let mut marketplace = CannedMarketplace::default();
        marketplace
            .rfqs
            .insert("rfq-1".to_string(), rfq_with_lifts("rfq-1", vec![late, early]));

        let sync = synchronizer(repo, marketplace);
        let updated = sync.sync_flight_request(id).await.unwrap();

        assert_eq!(
            updated.avinode_first_quote_at.unwrap().to_rfc3339(),
            "2025-05-01T09:00:00+00:00"
        );
    }

    #[tokio::test]
    async fn test_unknown_request_errors() {
        let repo = Arc::new(InMemoryRequests::default());
        let sync = synchronizer(repo, CannedMarketplace::default());
        let result = sync.sync_flight_request(Uuid::new_v4()).await;
        assert!(matches!(result, Err(PipelineError::NotFound(_))));
    }
}
