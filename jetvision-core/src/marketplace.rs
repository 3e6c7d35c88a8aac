use async_trait::async_trait;
use serde_json::Value;

use crate::BoxError;

/// Read-side marketplace operations the Pipeline Synchronizer depends on.
///
/// Responses are raw documents: the remote schema varies per tenant and API
/// version, so interpretation is left to the extraction layer.
#[async_trait]
pub trait MarketplaceApi: Send + Sync {
    /// Fetch a trip resource, used to discover linked RFQs and trip messages.
    async fn fetch_trip(&self, trip_id: &str) -> Result<Value, BoxError>;

    /// Fetch one RFQ thread with its seller lifts.
    async fn fetch_rfq(&self, rfq_id: &str) -> Result<Value, BoxError>;

    /// Fetch the canonical quote resource.
    async fn fetch_quote(&self, quote_id: &str) -> Result<Value, BoxError>;

    /// Fetch a trip message, which may embed an operator-submitted sellerQuote.
    async fn fetch_trip_message(&self, message_id: &str) -> Result<Value, BoxError>;
}
