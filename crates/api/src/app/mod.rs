//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: job store, language model, engine, orchestrator
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;

use crate::middleware::{self, CorsState, RateLimiter};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::{AppServices, ServiceError, build_services};

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(services: Arc<AppServices>) -> Router {
    let limiter = Arc::new(
        RateLimiter::per_minute(services.settings.rate_limit_per_minute)
            .trusting_forwarded_for(services.settings.trust_forwarded_for),
    );
    let cors = CorsState::new(services.settings.allowed_origins.clone());

    // Generation endpoints are rate limited per client.
    let limited = routes::architecture::router().route_layer(
        axum::middleware::from_fn_with_state(limiter, middleware::rate_limit),
    );

    Router::new()
        .merge(routes::router())
        .merge(limited)
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(cors, middleware::cors))
                .layer(Extension(services)),
        )
}
