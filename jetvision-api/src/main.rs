use std::net::SocketAddr;
use std::sync::Arc;

use jetvision_api::{app, state::AuthConfig, worker, AppState};
use jetvision_avinode::{AvinodeClient, AvinodeConfig};
use jetvision_pipeline::{PipelineSynchronizer, WebhookProcessor};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "jetvision_api=debug,tower_http=debug,axum::rejection=trace".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = jetvision_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Jetvision API on port {}", config.server.port);

    // Postgres Connection
    let db = jetvision_store::DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    // Redis Connection
    let redis_client = jetvision_store::RedisClient::new(&config.redis.url)
        .await
        .expect("Failed to connect to Redis");
    let redis_arc = Arc::new(redis_client);

    // Kafka Connection
    let kafka_producer = jetvision_store::EventProducer::new(&config.kafka.brokers)
        .expect("Failed to create Kafka producer");
    let kafka_arc = Arc::new(kafka_producer);

    // Avinode client: credential problems fail fast, before any network call
    let avinode = AvinodeClient::new(AvinodeConfig {
        base_url: config.avinode.base_url.clone(),
        api_token: config.avinode.api_token.clone(),
        bearer_token: config.avinode.bearer_token.clone(),
        api_version: config.avinode.api_version.clone(),
        product: config.avinode.product.clone(),
        act_as_account: config.avinode.act_as_account.clone(),
    })
    .expect("Invalid Avinode credentials");
    let avinode_arc = Arc::new(avinode);

    let request_repo = Arc::new(jetvision_store::StoreFlightRequestRepository::new(
        db.pool.clone(),
    ));
    let notification_repo = Arc::new(jetvision_store::StoreNotificationRepository::new(
        db.pool.clone(),
    ));

    let synchronizer = Arc::new(PipelineSynchronizer::new(
        request_repo.clone(),
        avinode_arc.clone(),
    ));
    let webhook_processor = Arc::new(WebhookProcessor::new(
        request_repo.clone(),
        synchronizer.clone(),
    ));

    let app_state = AppState {
        requests: request_repo,
        notifications: notification_repo,
        redis: redis_arc,
        kafka: kafka_arc,
        avinode: avinode_arc.clone(),
        synchronizer,
        webhooks: webhook_processor,
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
        metrics: Arc::new(jetvision_api::metrics::Metrics::new()),
        resiliency: Arc::new(jetvision_api::middleware::resiliency::Resiliency::new()),
    };

    // Register the marketplace webhook subscription when a callback URL is
    // configured. Failures are logged; polling covers the gap.
    if let Some(webhook_url) = &config.avinode.webhook_url {
        match avinode_arc.configure_webhook(webhook_url).await {
            Ok(_) => tracing::info!("Avinode webhook subscription configured"),
            Err(e) => tracing::warn!("Webhook subscription failed: {}", e),
        }
    }

    // 15-minute pipeline poll worker
    tokio::spawn(worker::start_pipeline_poll_worker(
        app_state.clone(),
        config.sync.poll_interval_seconds,
    ));

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}
