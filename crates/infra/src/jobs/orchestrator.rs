//! Job orchestration: create, schedule, and finish generation jobs.
//!
//! `submit` persists a pending record and detaches one execution unit per job on
//! the tokio runtime. The execution unit owns every write to its job:
//! pending -> processing -> completed/failed. Terminal writes go through a
//! compare-and-swap loop so a record that another writer already finished is
//! never overwritten.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{Instrument, debug, error, info, info_span, warn};

use archigenie_ai::{Generation, GenerationEngine, GenerationError};
use archigenie_core::{DomainError, DomainResult, ExpectedVersion, Job, JobId};

use super::store::{JobStore, JobStoreError};

pub const MIN_PROMPT_CHARS: usize = 50;
pub const MAX_PROMPT_CHARS: usize = 5000;

/// Orchestrator configuration.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Retention for job records (durable backends only)
    pub job_ttl: Option<Duration>,
    /// Compare-and-swap attempts per state transition
    pub max_write_attempts: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            job_ttl: Some(Duration::from_secs(86_400)),
            max_write_attempts: 5,
        }
    }
}

impl OrchestratorConfig {
    pub fn with_job_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.job_ttl = ttl;
        self
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error(transparent)]
    InvalidInput(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] JobStoreError),
}

/// Why a state transition could not be written.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error(transparent)]
    Store(#[from] JobStoreError),

    /// The stored record does not allow the transition (e.g. already terminal).
    #[error(transparent)]
    Rejected(#[from] DomainError),

    #[error("gave up after {0} conflicting writes")]
    Contended(u32),
}

/// Check a prompt is non-blank and within bounds.
pub fn validate_prompt(prompt: &str) -> DomainResult<()> {
    if prompt.trim().is_empty() {
        return Err(DomainError::validation("Prompt cannot be empty."));
    }
    let len = prompt.chars().count();
    if !(MIN_PROMPT_CHARS..=MAX_PROMPT_CHARS).contains(&len) {
        return Err(DomainError::validation(format!(
            "Prompt must be between {MIN_PROMPT_CHARS} and {MAX_PROMPT_CHARS} characters (got {len})."
        )));
    }
    Ok(())
}

/// Creates jobs and drives them to a terminal state.
#[derive(Clone)]
pub struct JobOrchestrator {
    store: Arc<dyn JobStore>,
    engine: Arc<GenerationEngine>,
    config: OrchestratorConfig,
}

impl JobOrchestrator {
    pub fn new(
        store: Arc<dyn JobStore>,
        engine: Arc<GenerationEngine>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            store,
            engine,
            config,
        }
    }

    /// Validate `prompt`, persist a pending job and schedule its execution.
    ///
    /// Returns as soon as the pending record is stored; generation continues in
    /// the background.
    pub async fn submit(&self, prompt: impl Into<String>) -> Result<JobId, SubmitError> {
        let prompt = prompt.into();
        validate_prompt(&prompt)?;

        let job = Job::new();
        let job_id = job.id;
        self.store.put(&job, self.config.job_ttl).await?;
        info!(%job_id, backend = self.store.backend(), "job created");

        let this = self.clone();
        tokio::spawn(
            async move { this.execute(job_id, &prompt).await }
                .instrument(info_span!("job", %job_id)),
        );

        Ok(job_id)
    }

    /// Run generation for an existing job and record the outcome.
    ///
    /// Never returns an error: every failure ends up in the job record or the log.
    pub async fn execute(&self, job_id: JobId, prompt: &str) {
        match self.transition(job_id, Job::mark_processing).await {
            Ok(job) => debug!(progress = job.progress, "job processing"),
            Err(e) => warn!(error = %e, "could not record processing state"),
        }

        let written = match self.engine.generate(prompt).await {
            Ok(Generation {
                text,
                validated,
                attempts,
                invocations,
            }) => {
                debug!(attempts, invocations, "generation finished");
                if !validated {
                    warn!(attempts, "storing best-effort output that failed validation");
                }
                self.transition(job_id, |job| {
                    job.mark_completed(text.clone(), validated, attempts)
                })
                .await
            }
            Err(GenerationError::Capability(e)) => {
                error!(error = %e, transient = e.is_transient(), "job failed");
                self.transition(job_id, |job| job.mark_failed(e.to_string()))
                    .await
            }
        };

        match written {
            Ok(job) => info!(status = %job.status, version = job.version, "job finished"),
            Err(TransitionError::Rejected(e)) => {
                warn!(error = %e, "job already finished elsewhere; result discarded")
            }
            Err(e) => error!(error = %e, "failed to record job outcome"),
        }
    }

    /// Generate synchronously without creating a job.
    pub async fn generate_now(&self, raw_requirement: &str) -> Result<Generation, GenerationError> {
        self.engine.generate(raw_requirement).await
    }

    /// Read-modify-write `job_id` with optimistic concurrency.
    ///
    /// Re-reads and re-applies `apply` on conflict, so the transition is always
    /// evaluated against the latest stored record.
    pub async fn transition<F>(&self, job_id: JobId, apply: F) -> Result<Job, TransitionError>
    where
        F: Fn(&mut Job) -> DomainResult<()>,
    {
        for attempt in 1..=self.config.max_write_attempts {
            let current = self.store.get(job_id).await?;
            let mut next = current.clone();
            apply(&mut next)?;

            match self
                .store
                .compare_and_swap(
                    ExpectedVersion::Exact(current.version),
                    &next,
                    self.config.job_ttl,
                )
                .await
            {
                Ok(stored) => return Ok(stored),
                Err(JobStoreError::Conflict { actual, .. }) => {
                    debug!(attempt, actual, "write conflict; retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(TransitionError::Contended(self.config.max_write_attempts))
    }
}
