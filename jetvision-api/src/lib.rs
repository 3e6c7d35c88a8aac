use axum::{
    extract::State,
    http::Method,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod error;
pub mod metrics;
pub mod middleware;
pub mod pipeline;
pub mod requests;
pub mod search;
pub mod state;
pub mod webhooks;
pub mod worker;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    // CORS Middleware
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    // Staff-only pipeline routes behind JWT role middleware
    let staff_routes = Router::new()
        .route(
            "/v1/requests",
            post(requests::create_request).get(requests::list_requests),
        )
        .route("/v1/requests/{id}", get(requests::get_request))
        .route(
            "/v1/requests/{id}/transitions",
            get(requests::available_transitions_for),
        )
        .route("/v1/requests/{id}/review", post(requests::start_review))
        .route("/v1/requests/{id}/trip", post(pipeline::create_trip))
        .route("/v1/requests/{id}/rfqs/confirm", post(requests::confirm_rfqs))
        .route("/v1/requests/{id}/quote", post(requests::select_quote))
        .route("/v1/requests/{id}/proposal", post(requests::build_proposal))
        .route(
            "/v1/requests/{id}/proposal/sent",
            post(requests::mark_proposal_sent),
        )
        .route("/v1/requests/{id}/decision", post(requests::record_decision))
        .route("/v1/requests/{id}/cancel", post(requests::cancel_request))
        .route("/v1/requests/{id}/sync", post(pipeline::sync_request))
        .route("/v1/requests/{id}/chat", post(pipeline::send_chat))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::staff_auth_middleware,
        ));

    Router::new()
        .merge(staff_routes)
        .route("/v1/airports/search", get(search::search_airports))
        .route("/v1/webhooks/avinode", post(webhooks::handle_avinode_webhook))
        .route("/v1/health", get(pipeline::health))
        .route("/metrics", get(render_metrics))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::resiliency::circuit_breaker_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .with_state(state)
}

async fn render_metrics(State(state): State<AppState>) -> String {
    state.metrics.render()
}

async fn rate_limit_middleware(
    State(state): State<AppState>,
    axum::extract::ConnectInfo(addr): axum::extract::ConnectInfo<SocketAddr>,
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> Result<impl IntoResponse, impl IntoResponse> {
    let ip = addr.ip().to_string();
    let key = format!("ratelimit:{}", ip);

    match state.redis.check_rate_limit(&key, 100, 60).await {
        Ok(true) => Ok(next.run(req).await),
        Ok(false) => Err((axum::http::StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded")),
        Err(_) => Ok(next.run(req).await), // Fail open
    }
}
