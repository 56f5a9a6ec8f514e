//! Read side for job records.

use std::sync::Arc;

use archigenie_core::{Job, JobId};

use super::store::{JobStore, JobStoreError};

/// Read-only view over stored jobs. Never mutates a record.
#[derive(Clone)]
pub struct JobQuery {
    store: Arc<dyn JobStore>,
}

impl JobQuery {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    /// Current snapshot of `job_id`.
    ///
    /// Unknown and expired jobs are both `JobStoreError::NotFound`.
    pub async fn query(&self, job_id: JobId) -> Result<Job, JobStoreError> {
        self.store.get(job_id).await
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }
}
