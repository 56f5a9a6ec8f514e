//! Generation job record and its lifecycle.
//!
//! ```text
//! pending --> processing --> completed
//!                       \--> failed
//! ```
//!
//! `completed` and `failed` are terminal: no transition leaves them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::id::JobId;

/// Progress reported once a job has been picked up for execution.
pub const PROCESSING_PROGRESS: u8 = 10;

/// Progress reported for any terminal job.
pub const TERMINAL_PROGRESS: u8 = 100;

/// Job execution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Created, waiting for its execution unit
    Pending,
    /// Generation in flight
    Processing,
    /// Result available
    Completed,
    /// Generation failed at the capability boundary
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl core::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tracked architecture generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Unique job ID
    pub id: JobId,
    /// Current status
    pub status: JobStatus,
    /// 0-100, never decreases
    pub progress: u8,
    /// Sanitized architecture document (completed jobs only)
    pub result: Option<String>,
    /// Failure description (failed jobs only)
    pub error: Option<String>,
    /// Whether `result` passed the acceptance check or is best-effort output
    pub validated: Option<bool>,
    /// Capability invocations spent producing `result`
    #[serde(default)]
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Write token for optimistic concurrency; bumped by the store on every write.
    #[serde(default)]
    pub version: u64,
}

impl Job {
    /// Create a new pending job.
    pub fn new() -> Self {
        Self::with_id(JobId::new())
    }

    pub fn with_id(id: JobId) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: JobStatus::Pending,
            progress: 0,
            result: None,
            error: None,
            validated: None,
            attempts: 0,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Raise progress to `progress` (capped at 100). Lower values are ignored.
    pub fn advance_progress(&mut self, progress: u8) {
        self.progress = self.progress.max(progress.min(TERMINAL_PROGRESS));
        self.updated_at = Utc::now();
    }

    /// Mark job as picked up by its execution unit.
    pub fn mark_processing(&mut self) -> DomainResult<()> {
        if self.status != JobStatus::Pending {
            return Err(DomainError::invariant(format!(
                "job {} cannot start processing from status {}",
                self.id, self.status
            )));
        }
        self.status = JobStatus::Processing;
        self.advance_progress(PROCESSING_PROGRESS);
        Ok(())
    }

    /// Mark job as completed with its generated document.
    pub fn mark_completed(
        &mut self,
        result: impl Into<String>,
        validated: bool,
        attempts: u32,
    ) -> DomainResult<()> {
        self.ensure_not_terminal()?;
        self.status = JobStatus::Completed;
        self.result = Some(result.into());
        self.error = None;
        self.validated = Some(validated);
        self.attempts = attempts;
        self.advance_progress(TERMINAL_PROGRESS);
        Ok(())
    }

    /// Mark job as failed.
    pub fn mark_failed(&mut self, error: impl Into<String>) -> DomainResult<()> {
        self.ensure_not_terminal()?;
        self.status = JobStatus::Failed;
        self.error = Some(error.into());
        self.result = None;
        self.validated = None;
        self.advance_progress(TERMINAL_PROGRESS);
        Ok(())
    }

    fn ensure_not_terminal(&self) -> DomainResult<()> {
        if self.is_terminal() {
            return Err(DomainError::invariant(format!(
                "job {} is already {}",
                self.id, self.status
            )));
        }
        Ok(())
    }
}

impl Default for Job {
    fn default() -> Self {
        Self::new()
    }
}
