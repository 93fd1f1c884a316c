//! HTTP gateway that looks products up on kaspi.kz and returns them in a flat,
//! stable shape.

use axum::{middleware, routing::get, Router};
use std::{sync::Arc, time::Instant};
use tower_http::{catch_panic::CatchPanicLayer, cors::{Any, CorsLayer}, trace::TraceLayer};

pub mod error;
pub mod product;
pub mod rate_limit;
pub mod routes;
pub mod upstream;

use rate_limit::RateLimiter;
use upstream::ProductSource;

#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn ProductSource>,
    pub limiter: Arc<RateLimiter>,
    pub started_at: Instant,
    pub status_passthrough: bool,
}

impl AppState {
    pub fn new(source: Arc<dyn ProductSource>, limiter: Arc<RateLimiter>) -> Self {
        Self { source, limiter, started_at: Instant::now(), status_passthrough: false }
    }

    pub fn with_status_passthrough(mut self, enabled: bool) -> Self {
        self.status_passthrough = enabled;
        self
    }
}

/// Builds the router. Layer order, outermost first: trace, CORS, panic guard, rate limit.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/api/product/{id}", get(routes::get_product))
        .route("/status", get(routes::status))
        .fallback(routes::not_found)
        .layer(middleware::from_fn_with_state(state.limiter.clone(), rate_limit::enforce))
        .layer(CatchPanicLayer::custom(error::panic_response))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Current UTC time as ISO-8601 with millisecond precision, e.g. `2024-05-01T10:00:00.000Z`.
pub fn iso_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
