use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use archigenie_core::{Job, JobStatus};

// -------------------------
// Request DTOs
// -------------------------

/// `/generate-prompt` takes `archigenie_core::ArchitectureRequest` directly.
#[derive(Debug, Deserialize)]
pub struct InvokeRequest {
    pub prompt: String,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct ArchitectureResponse {
    pub architecture: String,
    pub validated: bool,
}

#[derive(Debug, Serialize)]
pub struct InvokeResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub progress: u8,
    pub result: Option<String>,
    pub error: Option<String>,
    pub validated: Option<bool>,
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Job> for JobStatusResponse {
    fn from(job: Job) -> Self {
        Self {
            job_id: job.id.to_string(),
            status: job.status,
            progress: job.progress,
            result: job.result,
            error: job.error,
            validated: job.validated,
            attempts: job.attempts,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub job_store: &'static str,
}
