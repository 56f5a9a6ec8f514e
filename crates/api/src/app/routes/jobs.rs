use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use archigenie_core::JobId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/:job_id", get(get_job))
}

/// Current job snapshot. Ids that do not parse can never have been issued, so
/// they are reported the same way as unknown ids.
pub async fn get_job(
    Extension(services): Extension<Arc<AppServices>>,
    Path(job_id): Path<String>,
) -> axum::response::Response {
    let Ok(job_id) = job_id.parse::<JobId>() else {
        return errors::job_not_found();
    };

    match services.query.query(job_id).await {
        Ok(job) => Json(dto::JobStatusResponse::from(job)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
