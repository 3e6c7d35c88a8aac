//! In-memory stand-ins for the datastore and the marketplace, used by the
//! synchronizer and webhook tests.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use jetvision_core::marketplace::MarketplaceApi;
use jetvision_core::repository::FlightRequestRepository;
use jetvision_core::request::{FlightRequest, NewFlightRequest, SyncUpdate};
use jetvision_core::BoxError;

pub fn sample_request() -> FlightRequest {
    FlightRequest::new(
        "iso-1".to_string(),
        "Dana Smith".to_string(),
        NewFlightRequest {
            client_name: "Acme Holdings".to_string(),
            client_email: "travel@acme.test".to_string(),
            client_phone: Some("+1-555-0100".to_string()),
            departure: "KTEB".to_string(),
            arrival: "KVNY".to_string(),
            departure_date: "2025-06-01".to_string(),
            departure_time: Some("09:00".to_string()),
            return_date: None,
            return_time: None,
            passengers: 6,
            special_requests: None,
        },
    )
}

/// An answered seller lift carrying an embedded latest quote.
pub fn lift(operator: &str, quote_id: &str, amount: f64) -> Value {
    json!({
        "status": "Quoted",
        "sellerCompany": { "displayName": operator },
        "latestQuote": {
            "id": quote_id,
            "price": { "amount": amount, "currency": "USD" }
        }
    })
}

pub fn rfq_with_lifts(rfq_id: &str, lifts: Vec<Value>) -> Value {
    json!({ "id": rfq_id, "sellerLift": lifts })
}

#[derive(Default)]
pub struct InMemoryRequests {
    pub items: Mutex<HashMap<Uuid, FlightRequest>>,
}

impl InMemoryRequests {
    pub fn with(request: FlightRequest) -> Self {
        let repo = Self::default();
        repo.items.lock().unwrap().insert(request.id, request);
        repo
    }
}

#[async_trait]
impl FlightRequestRepository for InMemoryRequests {
    async fn create(&self, request: &FlightRequest) -> Result<(), BoxError> {
        self.items
            .lock()
            .unwrap()
            .insert(request.id, request.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<FlightRequest>, BoxError> {
        Ok(self.items.lock().unwrap().get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<FlightRequest>, BoxError> {
        Ok(self.items.lock().unwrap().values().cloned().collect())
    }

    async fn list_for_iso(&self, iso_id: &str) -> Result<Vec<FlightRequest>, BoxError> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.iso_id == iso_id)
            .cloned()
            .collect())
    }

    async fn list_active_sourcing(&self) -> Result<Vec<FlightRequest>, BoxError> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.is_active_sourcing())
            .cloned()
            .collect())
    }

    async fn update(&self, request: &FlightRequest) -> Result<(), BoxError> {
        let mut items = self.items.lock().unwrap();
        if !items.contains_key(&request.id) {
            return Err(format!("no flight request {}", request.id).into());
        }
        items.insert(request.id, request.clone());
        Ok(())
    }

    async fn append_rfq_id(&self, id: Uuid, rfq_id: &str) -> Result<bool, BoxError> {
        let mut items = self.items.lock().unwrap();
        let request = items
            .get_mut(&id)
            .ok_or_else(|| format!("no flight request {}", id))?;
        if request.avinode_rfq_ids.iter().any(|r| r == rfq_id) {
            return Ok(false);
        }
        request.avinode_rfq_ids.push(rfq_id.to_string());
        Ok(true)
    }

    async fn update_sync(&self, id: Uuid, update: &SyncUpdate) -> Result<(), BoxError> {
        let mut items = self.items.lock().unwrap();
        let request = items
            .get_mut(&id)
            .ok_or_else(|| format!("no flight request {}", id))?;
        request.avinode_rfq_ids = update.rfq_ids.clone();
        request.avinode_quote_ids = update.quote_ids.clone();
        request.avinode_quote_count = update.quote_count;
        request.avinode_best_quote_amount = update.best_quote_amount;
        request.avinode_best_quote_currency = update.best_quote_currency.clone();
        request.avinode_first_quote_at = update.first_quote_at;
        request.avinode_sla_due_at = Some(update.sla_due_at);
        request.avinode_sla_status = Some(update.sla_status);
        request.avinode_status = update.avinode_status;
        request.avinode_last_sync_at = Some(update.last_sync_at);
        request.updated_at = update.last_sync_at;
        Ok(())
    }

    async fn find_by_trip_ref(&self, trip_ref: &str) -> Result<Option<FlightRequest>, BoxError> {
        let items = self.items.lock().unwrap();
        if let Some(found) = items
            .values()
            .find(|r| r.avinode_trip_id.as_deref() == Some(trip_ref))
        {
            return Ok(Some(found.clone()));
        }
        Ok(items
            .values()
            .find(|r| {
                [&r.avinode_trip_href, &r.avinode_search_link]
                    .into_iter()
                    .flatten()
                    .any(|link| link.contains(trip_ref))
            })
            .cloned())
    }
}

#[derive(Default)]
pub struct CannedMarketplace {
    pub trips: HashMap<String, Value>,
    pub rfqs: HashMap<String, Value>,
    pub quotes: HashMap<String, Value>,
    pub messages: HashMap<String, Value>,
}

#[async_trait]
impl MarketplaceApi for CannedMarketplace {
    async fn fetch_trip(&self, trip_id: &str) -> Result<Value, BoxError> {
        self.trips
            .get(trip_id)
            .cloned()
            .ok_or_else(|| format!("no trip {}", trip_id).into())
    }

    async fn fetch_rfq(&self, rfq_id: &str) -> Result<Value, BoxError> {
        self.rfqs
            .get(rfq_id)
            .cloned()
            .ok_or_else(|| format!("no rfq {}", rfq_id).into())
    }

    async fn fetch_quote(&self, quote_id: &str) -> Result<Value, BoxError> {
        self.quotes
            .get(quote_id)
            .cloned()
            .ok_or_else(|| format!("no quote {}", quote_id).into())
    }

    async fn fetch_trip_message(&self, message_id: &str) -> Result<Value, BoxError> {
        self.messages
            .get(message_id)
            .cloned()
            .ok_or_else(|| format!("no trip message {}", message_id).into())
    }
}
