use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use archigenie_ai::GenerationError;
use archigenie_core::DomainError;
use archigenie_infra::jobs::{JobStoreError, SubmitError};

/// Error body: `{"error": code, "message": text, "detail": text}`.
///
/// `detail` mirrors `message` for clients written against the FastAPI backend.
pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    let message = message.into();
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message,
            "detail": message,
        })),
    )
        .into_response()
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
    }
}

pub fn store_error_to_response(err: JobStoreError) -> axum::response::Response {
    match err {
        JobStoreError::NotFound(_) => job_not_found(),
        JobStoreError::Unavailable(msg) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", msg)
        }
        other => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "store_error",
            other.to_string(),
        ),
    }
}

pub fn submit_error_to_response(err: SubmitError) -> axum::response::Response {
    match err {
        SubmitError::InvalidInput(e) => domain_error_to_response(e),
        SubmitError::Store(e) => store_error_to_response(e),
    }
}

pub fn generation_error_to_response(err: GenerationError) -> axum::response::Response {
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "generation_error",
        format!("Error generating architecture: {err}"),
    )
}

pub fn job_not_found() -> axum::response::Response {
    json_error(StatusCode::NOT_FOUND, "not_found", "Job not found")
}

/// Malformed JSON or a body that does not match the expected shape.
pub fn bad_body(rejection: axum::extract::rejection::JsonRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_body", rejection.body_text())
}
