use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use crate::state::AppState;

/// Background poller: every cycle, re-synchronize every request still in an
/// active sourcing state. Webhooks cover the fast path; this catches
/// deliveries the marketplace never sent.
pub async fn start_pipeline_poll_worker(state: AppState, interval_seconds: u64) {
    let mut ticker = interval(Duration::from_secs(interval_seconds));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        "Pipeline poll worker started ({}s interval)",
        interval_seconds
    );

    loop {
        ticker.tick().await;

        let requests = match state.requests.list_active_sourcing().await {
            Ok(requests) => requests,
            Err(e) => {
                error!("Failed to list active sourcing requests: {}", e);
                continue;
            }
        };
        if requests.is_empty() {
            continue;
        }
        info!("Polling {} requests in active sourcing", requests.len());

        for request in requests {
            match state.synchronizer.sync_flight_request(request.id).await {
                Ok(_) => {
                    state.metrics.syncs_total.inc();
                }
                Err(e) => {
                    state.metrics.sync_failures_total.inc();
                    error!("Scheduled sync failed for request {}: {}", request.id, e);
                }
            }
        }
    }
}
