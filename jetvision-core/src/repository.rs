use async_trait::async_trait;
use uuid::Uuid;

use crate::notification::Notification;
use crate::request::{FlightRequest, SyncUpdate};
use crate::BoxError;

/// Repository trait for flight request persistence.
#[async_trait]
pub trait FlightRequestRepository: Send + Sync {
    async fn create(&self, request: &FlightRequest) -> Result<(), BoxError>;

    async fn get(&self, id: Uuid) -> Result<Option<FlightRequest>, BoxError>;

    async fn list(&self) -> Result<Vec<FlightRequest>, BoxError>;

    async fn list_for_iso(&self, iso_id: &str) -> Result<Vec<FlightRequest>, BoxError>;

    /// Requests the polling worker should re-synchronize: non-terminal status
    /// with marketplace sourcing in flight.
    async fn list_active_sourcing(&self) -> Result<Vec<FlightRequest>, BoxError>;

    /// Full-row write used by transition handlers after mutating the model.
    async fn update(&self, request: &FlightRequest) -> Result<(), BoxError>;

    /// Append an RFQ id with set semantics. Returns `true` when the id was
    /// not already present.
    async fn append_rfq_id(&self, id: Uuid, rfq_id: &str) -> Result<bool, BoxError>;

    /// Persist all fields computed by one synchronizer run in a single write.
    async fn update_sync(&self, id: Uuid, update: &SyncUpdate) -> Result<(), BoxError>;

    /// Resolve a request from a marketplace trip reference: exact match on the
    /// stored trip id, falling back to substring matching against the stored
    /// trip-href and search-link fields.
    async fn find_by_trip_ref(&self, trip_ref: &str) -> Result<Option<FlightRequest>, BoxError>;
}

/// Repository trait for notification rows.
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, notification: &Notification) -> Result<(), BoxError>;
}
