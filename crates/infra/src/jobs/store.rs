//! Job storage abstraction and the in-process implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use archigenie_core::{ExpectedVersion, Job, JobId};

/// Keyed job storage with atomic conditional writes.
///
/// Implementations must be interchangeable: callers hold an
/// `Arc<dyn JobStore>` and never learn which backend is active.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Short backend name for logs and health output.
    fn backend(&self) -> &'static str;

    /// Check the backend is reachable.
    async fn ping(&self) -> Result<(), JobStoreError>;

    /// Unconditionally write `job` as-is. `ttl` is honoured where supported.
    async fn put(&self, job: &Job, ttl: Option<Duration>) -> Result<(), JobStoreError>;

    /// Get a job by ID.
    async fn get(&self, job_id: JobId) -> Result<Job, JobStoreError>;

    /// Write `job` only if the stored record's version satisfies `expected`.
    ///
    /// The stored record's version becomes the previous version + 1; the stored
    /// record is returned.
    async fn compare_and_swap(
        &self,
        expected: ExpectedVersion,
        job: &Job,
        ttl: Option<Duration>,
    ) -> Result<Job, JobStoreError>;
}

/// Job store error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobStoreError {
    #[error("job not found: {0}")]
    NotFound(JobId),

    #[error("write conflict on job {job_id} (expected {expected:?}, found version {actual})")]
    Conflict {
        job_id: JobId,
        expected: ExpectedVersion,
        actual: u64,
    },

    #[error("job store unavailable: {0}")]
    Unavailable(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Storage(String),
}

/// In-memory job store.
///
/// Scoped to the process lifetime; TTLs are accepted but not enforced.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn len(&self) -> usize {
        self.jobs.read().map(|jobs| jobs.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> JobStoreError {
    JobStoreError::Storage("job map lock poisoned".to_string())
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), JobStoreError> {
        Ok(())
    }

    async fn put(&self, job: &Job, _ttl: Option<Duration>) -> Result<(), JobStoreError> {
        let mut jobs = self.jobs.write().map_err(poisoned)?;
        jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn get(&self, job_id: JobId) -> Result<Job, JobStoreError> {
        let jobs = self.jobs.read().map_err(poisoned)?;
        jobs.get(&job_id)
            .cloned()
            .ok_or(JobStoreError::NotFound(job_id))
    }

    async fn compare_and_swap(
        &self,
        expected: ExpectedVersion,
        job: &Job,
        _ttl: Option<Duration>,
    ) -> Result<Job, JobStoreError> {
        let mut jobs = self.jobs.write().map_err(poisoned)?;
        let current = jobs.get(&job.id).ok_or(JobStoreError::NotFound(job.id))?;

        if !expected.matches(current.version) {
            return Err(JobStoreError::Conflict {
                job_id: job.id,
                expected,
                actual: current.version,
            });
        }

        let mut next = job.clone();
        next.version = current.version + 1;
        jobs.insert(next.id, next.clone());
        Ok(next)
    }
}
