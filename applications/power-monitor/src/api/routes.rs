use crate::api::handlers::{health, power, AppState};
use axum::{
    extract::Request,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::Level;

pub fn create_router(state: AppState) -> Router {
    // Liveness probes for the hosting platform
    let public_routes = Router::new()
        .route("/", get(health::health))
        .route("/health", get(health::health));

    // Sensor webhooks
    let webhook_routes = Router::new()
        .route("/power_lost", post(power::power_lost))
        .route("/power_restored", post(power::power_restored));

    Router::new()
        .merge(public_routes)
        .merge(webhook_routes)
        .with_state(state)
        .layer(tower_http::cors::CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request| {
                    tracing::span!(
                        Level::INFO,
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                })
                .on_request(|_request: &Request, _span: &tracing::Span| {
                    tracing::event!(Level::DEBUG, "received request");
                })
                .on_response(
                    |response: &axum::response::Response,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        tracing::event!(
                            Level::INFO,
                            status = %response.status(),
                            latency = ?latency,
                            "request completed"
                        );
                    },
                )
                .on_failure(
                    |_error: tower_http::classify::ServerErrorsFailureClass,
                     _latency: std::time::Duration,
                     _span: &tracing::Span| {
                        tracing::event!(Level::ERROR, "request failed");
                    },
                ),
        )
}
