use prometheus::{Encoder, IntCounter, Registry, TextEncoder};

/// Pipeline counters exposed at /metrics.
pub struct Metrics {
    pub registry: Registry,
    pub syncs_total: IntCounter,
    pub sync_failures_total: IntCounter,
    pub webhook_events_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();
        let syncs_total = IntCounter::new(
            "jetvision_pipeline_syncs_total",
            "Completed pipeline sync runs",
        )
        .expect("metric definition");
        let sync_failures_total = IntCounter::new(
            "jetvision_pipeline_sync_failures_total",
            "Pipeline sync runs that returned an error",
        )
        .expect("metric definition");
        let webhook_events_total = IntCounter::new(
            "jetvision_webhook_events_total",
            "Inbound marketplace webhook events received",
        )
        .expect("metric definition");

        registry
            .register(Box::new(syncs_total.clone()))
            .expect("metric registration");
        registry
            .register(Box::new(sync_failures_total.clone()))
            .expect("metric registration");
        registry
            .register(Box::new(webhook_events_total.clone()))
            .expect("metric registration");

        Self {
            registry,
            syncs_total,
            sync_failures_total,
            webhook_events_total,
        }
    }

    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::error!("Failed to encode metrics: {}", e);
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_render() {
        let metrics = Metrics::new();
        metrics.syncs_total.inc();
        metrics.webhook_events_total.inc();
        let rendered = metrics.render();
        assert!(rendered.contains("jetvision_pipeline_syncs_total 1"));
        assert!(rendered.contains("jetvision_webhook_events_total 1"));
    }
}
