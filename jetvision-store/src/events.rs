use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::time::Duration;
use tracing::{error, info};
use uuid::Uuid;

use jetvision_core::identity::Role;

/// Topic carrying pipeline notification events for downstream consumers
/// (email digests, in-app badges).
const REQUEST_EVENTS_TOPIC: &str = "flight-request.events";

#[derive(Clone)]
pub struct EventProducer {
    producer: FutureProducer,
}

impl EventProducer {
    pub fn new(brokers: &str) -> Result<Self, rdkafka::error::KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()?;

        Ok(Self { producer })
    }

    pub async fn publish(
        &self,
        topic: &str,
        key: &str,
        payload: &str,
    ) -> Result<(), rdkafka::error::KafkaError> {
        let record = FutureRecord::to(topic).key(key).payload(payload);

        match self
            .producer
            .send(record, Timeout::After(Duration::from_secs(0)))
            .await
        {
            Ok(delivery) => {
                let partition = delivery.partition;
                let offset = delivery.offset;
                info!(
                    "Sent message to {}/{}: partition {} offset {}",
                    topic, key, partition, offset
                );
                Ok(())
            }
            Err((e, _msg)) => {
                error!("Failed to send message to {}: {}", topic, e);
                Err(e)
            }
        }
    }

    /// Publish a pipeline event targeted at a role. Fire-and-forget: the
    /// caller logs a failure and moves on.
    pub async fn publish_request_event(
        &self,
        kind: &str,
        request_id: Uuid,
        recipient_role: Role,
    ) -> Result<(), rdkafka::error::KafkaError> {
        let payload = serde_json::json!({
            "kind": kind,
            "requestId": request_id,
            "recipientRole": recipient_role.as_str(),
            "at": chrono::Utc::now().to_rfc3339(),
        });
        self.publish(
            REQUEST_EVENTS_TOPIC,
            &request_id.to_string(),
            &payload.to_string(),
        )
        .await
    }
}
