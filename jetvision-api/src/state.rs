use std::sync::Arc;

use jetvision_avinode::AvinodeClient;
use jetvision_core::repository::{FlightRequestRepository, NotificationRepository};
use jetvision_pipeline::{PipelineSynchronizer, WebhookProcessor};
use jetvision_store::{EventProducer, RedisClient};

use crate::metrics::Metrics;
use crate::middleware::resiliency::Resiliency;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub requests: Arc<dyn FlightRequestRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub redis: Arc<RedisClient>,
    pub kafka: Arc<EventProducer>,
    pub avinode: Arc<AvinodeClient>,
    pub synchronizer: Arc<PipelineSynchronizer>,
    pub webhooks: Arc<WebhookProcessor>,
    pub auth: AuthConfig,
    pub metrics: Arc<Metrics>,
    pub resiliency: Arc<Resiliency>,
}
