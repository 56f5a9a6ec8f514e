use axum::{routing::get, Router};

pub mod architecture;
pub mod jobs;
pub mod system;

/// Routes that are not rate limited.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .nest("/jobs", jobs::router())
}
