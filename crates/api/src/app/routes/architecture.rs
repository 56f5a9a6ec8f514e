use std::sync::Arc;

use axum::{
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use tracing::{error, info};

use archigenie_core::{ArchitectureRequest, JobStatus};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/generate-prompt", post(generate_prompt))
        .route("/invoke-ai", post(invoke_ai))
}

/// Normalize the request and generate synchronously.
pub async fn generate_prompt(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<ArchitectureRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(request) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::bad_body(rejection),
    };

    let mode = match request.mode() {
        Ok(m) => m,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let raw = match request.to_raw_requirement() {
        Ok(r) => r,
        Err(e) => return errors::domain_error_to_response(e),
    };
    info!(?mode, "received generate-prompt request");

    match services.orchestrator.generate_now(&raw).await {
        Ok(generation) => {
            info!(
                attempts = generation.attempts,
                validated = generation.validated,
                "architecture generation complete"
            );
            Json(dto::ArchitectureResponse {
                architecture: generation.text,
                validated: generation.validated,
            })
            .into_response()
        }
        Err(e) => {
            error!(error = %e, "error generating architecture");
            errors::generation_error_to_response(e)
        }
    }
}

/// Create a job and return immediately; clients poll `/jobs/:job_id`.
pub async fn invoke_ai(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::InvokeRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(request) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::bad_body(rejection),
    };

    match services.orchestrator.submit(request.prompt).await {
        Ok(job_id) => (
            StatusCode::ACCEPTED,
            Json(dto::InvokeResponse {
                job_id: job_id.to_string(),
                status: JobStatus::Pending,
                message: "Architecture generation started",
            }),
        )
            .into_response(),
        Err(e) => errors::submit_error_to_response(e),
    }
}
