use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::connect_info::ConnectInfo;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::util::ServiceExt;
use uuid::Uuid;

use jetvision_api::middleware::auth::StaffClaims;
use jetvision_api::state::AuthConfig;
use jetvision_api::{app, AppState};
use jetvision_avinode::{AvinodeClient, AvinodeConfig};
use jetvision_core::marketplace::MarketplaceApi;
use jetvision_core::notification::Notification;
use jetvision_core::repository::{FlightRequestRepository, NotificationRepository};
use jetvision_core::request::{FlightRequest, NewFlightRequest, SyncUpdate};
use jetvision_core::BoxError;
use jetvision_pipeline::{PipelineSynchronizer, WebhookProcessor};

const JWT_SECRET: &str = "test-secret";

// ============================================================================
// In-memory collaborators
// ============================================================================

#[derive(Default)]
struct MemoryRequests {
    items: Mutex<HashMap<Uuid, FlightRequest>>,
}

#[async_trait]
impl FlightRequestRepository for MemoryRequests {
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
        self.items
            .lock()
            .unwrap()
            .insert(request.id, request.clone());
        Ok(())
    }

    async fn append_rfq_id(&self, id: Uuid, rfq_id: &str) -> Result<bool, BoxError> {
        let mut items = self.items.lock().unwrap();
        let request = items.get_mut(&id).ok_or("missing request")?;
        if request.avinode_rfq_ids.iter().any(|r| r == rfq_id) {
            return Ok(false);
        }
        request.avinode_rfq_ids.push(rfq_id.to_string());
        Ok(true)
    }

    async fn update_sync(&self, id: Uuid, update: &SyncUpdate) -> Result<(), BoxError> {
        let mut items = self.items.lock().unwrap();
        let request = items.get_mut(&id).ok_or("missing request")?;
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
        Ok(items
            .values()
            .find(|r| {
                r.avinode_trip_id.as_deref() == Some(trip_ref)
                    || [&r.avinode_trip_href, &r.avinode_search_link]
                        .into_iter()
                        .flatten()
                        .any(|link| link.contains(trip_ref))
            })
            .cloned())
    }
}

#[derive(Default)]
struct MemoryNotifications {
    items: Mutex<Vec<Notification>>,
}

#[async_trait]
impl NotificationRepository for MemoryNotifications {
    async fn create(&self, notification: &Notification) -> Result<(), BoxError> {
        self.items.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

#[derive(Default)]
struct MemoryMarketplace {
    rfqs: HashMap<String, Value>,
}

#[async_trait]
impl MarketplaceApi for MemoryMarketplace {
    async fn fetch_trip(&self, trip_id: &str) -> Result<Value, BoxError> {
        Err(format!("no trip {}", trip_id).into())
    }

    async fn fetch_rfq(&self, rfq_id: &str) -> Result<Value, BoxError> {
        self.rfqs
            .get(rfq_id)
            .cloned()
            .ok_or_else(|| format!("no rfq {}", rfq_id).into())
    }

    async fn fetch_quote(&self, quote_id: &str) -> Result<Value, BoxError> {
        Err(format!("no quote {}", quote_id).into())
    }

    async fn fetch_trip_message(&self, message_id: &str) -> Result<Value, BoxError> {
        Err(format!("no trip message {}", message_id).into())
    }
}

// ============================================================================
// Harness
// ============================================================================

async fn test_state(repo: Arc<MemoryRequests>, marketplace: MemoryMarketplace) -> AppState {
    // Points at a closed local port: every marketplace HTTP call fails fast,
    // exercising the degraded paths.
    let avinode = Arc::new(
        AvinodeClient::new(AvinodeConfig {
            base_url: "http://127.0.0.1:9/api".to_string(),
            api_token: "test-token".to_string(),
            bearer_token: "test-bearer".to_string(),
            api_version: "v1".to_string(),
            product: "jetvision-portal".to_string(),
            act_as_account: None,
        })
        .unwrap(),
    );

    let synchronizer = Arc::new(PipelineSynchronizer::new(
        repo.clone(),
        Arc::new(marketplace),
    ));
    let webhooks = Arc::new(WebhookProcessor::new(repo.clone(), synchronizer.clone()));

    // Neither client connects eagerly, so no local Redis/Kafka is needed.
    let redis = jetvision_store::RedisClient::new("redis://127.0.0.1:6379")
        .await
        .expect("redis client config");

    AppState {
        requests: repo,
        notifications: Arc::new(MemoryNotifications::default()),
        redis: Arc::new(redis),
        kafka: Arc::new(
            jetvision_store::EventProducer::new("localhost:9092").expect("producer config"),
        ),
        avinode,
        synchronizer,
        webhooks,
        auth: AuthConfig {
            secret: JWT_SECRET.to_string(),
            expiration: 3600,
        },
        metrics: Arc::new(jetvision_api::metrics::Metrics::new()),
        resiliency: Arc::new(jetvision_api::middleware::resiliency::Resiliency::new()),
    }
}

fn token(sub: &str, name: &str, role: &str) -> String {
    let claims = StaffClaims {
        sub: sub.to_string(),
        name: name.to_string(),
        role: role.to_string(),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
    };
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

fn request(method: &str, uri: &str, auth: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = auth {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    let body = match body {
        Some(value) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let mut req = builder.body(body).unwrap();
    // The rate limiter reads the peer address from connect info.
    req.extensions_mut()
        .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000))));
    req
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn sample_input() -> Value {
    json!({
        "clientName": "Acme Holdings",
        "clientEmail": "travel@acme.test",
        "departure": "KTEB",
        "arrival": "KVNY",
        "departureDate": "2025-06-01",
        "passengers": 6
    })
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_iso_creates_request_manager_cannot() {
    let repo = Arc::new(MemoryRequests::default());
    let app = app(test_state(repo, MemoryMarketplace::default()).await);

    let iso = token("iso-1", "Dana", "ISO");
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/v1/requests",
            Some(&iso),
            Some(sample_input()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["status"].as_str(), Some("pending"));
    assert_eq!(body["avinodeStatus"].as_str(), Some("not_sent"));

    let manager = token("mgr-1", "Riley", "MANAGER");
    let response = app
        .oneshot(request(
            "POST",
            "/v1/requests",
            Some(&manager),
            Some(sample_input()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_unauthenticated_requests_rejected() {
    let repo = Arc::new(MemoryRequests::default());
    let app = app(test_state(repo, MemoryMarketplace::default()).await);

    let response = app
        .oneshot(request("GET", "/v1/requests", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invalid_backward_transition_rejected() {
    let mut seeded = FlightRequest::new(
        "iso-1".to_string(),
        "Dana".to_string(),
        serde_json::from_value::<NewFlightRequest>(sample_input()).unwrap(),
    );
    seeded.status = jetvision_core::request::RequestStatus::ProposalSent;
    let id = seeded.id;
    let repo = Arc::new(MemoryRequests::default());
    repo.items.lock().unwrap().insert(id, seeded);

    let app = app(test_state(repo, MemoryMarketplace::default()).await);
    let manager = token("mgr-1", "Riley", "MANAGER");
    let response = app
        .oneshot(request(
            "POST",
            &format!("/v1/requests/{}/quote", id),
            Some(&manager),
            Some(json!({"quoteId": "q-1", "amount": 1000.0})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_airport_search_degrades_to_local_directory() {
    // The Avinode base URL points at a closed port; the endpoint must still
    // answer 200 with local results.
    let repo = Arc::new(MemoryRequests::default());
    let app = app(test_state(repo, MemoryMarketplace::default()).await);

    let response = app
        .oneshot(request(
            "GET",
            "/v1/airports/search?filter=teterboro",
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let data = body["data"].as_array().unwrap();
    assert!(data.iter().any(|r| r["icao"].as_str() == Some("KTEB")));
}

#[tokio::test]
async fn test_webhook_acknowledges_unknown_trips() {
    let repo = Arc::new(MemoryRequests::default());
    let app = app(test_state(repo, MemoryMarketplace::default()).await);

    let event = json!({
        "eventType": "TripRequestSellerResponse",
        "resourceType": "rfqs",
        "resourceId": "rfq-1",
        "tripId": "atrip-nobody-knows"
    });
    let response = app
        .oneshot(request("POST", "/v1/webhooks/avinode", None, Some(event)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["ok"].as_bool(), Some(true));
    assert!(body["synced"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_webhook_syncs_resolved_request() {
    let mut seeded = FlightRequest::new(
        "iso-1".to_string(),
        "Dana".to_string(),
        serde_json::from_value::<NewFlightRequest>(sample_input()).unwrap(),
    );
    seeded.avinode_trip_id = Some("atrip-100".to_string());
    let id = seeded.id;
    let repo = Arc::new(MemoryRequests::default());
    repo.items.lock().unwrap().insert(id, seeded);

    let mut marketplace = MemoryMarketplace::default();
    marketplace.rfqs.insert(
        "rfq-1".to_string(),
        json!({
            "id": "rfq-1",
            "sellerLift": [{
                "status": "Quoted",
                "sellerCompany": {"displayName": "Alpha Jets"},
                "latestQuote": {"id": "q-a", "price": {"amount": 50000, "currency": "USD"}}
            }]
        }),
    );

    let app = app(test_state(repo.clone(), marketplace).await);
    let event = json!({
        "eventType": "TripRequestSellerResponse",
        "resourceType": "rfqs",
        "resourceId": "rfq-1",
        "tripId": "atrip-100"
    });
    let response = app
        .oneshot(request("POST", "/v1/webhooks/avinode", None, Some(event)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["synced"].as_array().unwrap().len(), 1);

    let stored = repo.items.lock().unwrap().get(&id).cloned().unwrap();
    assert_eq!(stored.avinode_quote_count, 1);
    assert_eq!(stored.avinode_best_quote_amount, Some(50000.0));
}
