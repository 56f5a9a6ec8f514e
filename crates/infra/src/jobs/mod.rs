//! Asynchronous generation jobs.
//!
//! ## Components
//!
//! - `JobStore`: keyed job records with compare-and-swap writes (in-memory or Redis)
//! - `JobOrchestrator`: creates jobs and drives each one to a terminal state
//! - `JobQuery`: read-only job snapshots
//!
//! The store backend is chosen once at startup by [`select_job_store`].

pub mod orchestrator;
pub mod query;
#[cfg(feature = "redis")]
pub mod redis_store;
pub mod store;

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{JobStoreMode, Settings};

pub use orchestrator::{
    JobOrchestrator, MAX_PROMPT_CHARS, MIN_PROMPT_CHARS, OrchestratorConfig, SubmitError,
    TransitionError, validate_prompt,
};
pub use query::JobQuery;
#[cfg(feature = "redis")]
pub use redis_store::RedisJobStore;
pub use store::{InMemoryJobStore, JobStore, JobStoreError};

/// Build the job store selected by `settings.job_store`.
///
/// `Redis` fails when the server cannot be reached; `Auto` falls back to the
/// in-memory store with a warning.
pub async fn select_job_store(settings: &Settings) -> Result<Arc<dyn JobStore>, JobStoreError> {
    let store: Arc<dyn JobStore> = match settings.job_store {
        JobStoreMode::Memory => InMemoryJobStore::arc(),
        JobStoreMode::Redis => connect_redis(settings).await?,
        JobStoreMode::Auto => match connect_redis(settings).await {
            Ok(store) => store,
            Err(e) => {
                warn!(
                    error = %e,
                    redis_url = %settings.redis_url(),
                    "redis unavailable; job records will not survive a restart"
                );
                Arc::new(InMemoryJobStore::new()) as Arc<dyn JobStore>
            }
        },
    };
    info!(backend = store.backend(), "job store selected");
    Ok(store)
}

#[cfg(feature = "redis")]
async fn connect_redis(settings: &Settings) -> Result<Arc<dyn JobStore>, JobStoreError> {
    let store = RedisJobStore::new(settings.redis_url())?;
    store.ping().await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "redis"))]
async fn connect_redis(_settings: &Settings) -> Result<Arc<dyn JobStore>, JobStoreError> {
    Err(JobStoreError::Unavailable(
        "built without the `redis` feature".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(mode: &str, port: &str) -> Settings {
        let env = [
            ("HUGGINGFACEHUB_API_TOKEN", "hf_x"),
            ("JOB_STORE", mode),
            ("REDIS_HOST", "127.0.0.1"),
            ("REDIS_PORT", port),
        ];
        Settings::from_lookup(|k| {
            env.iter()
                .find(|(key, _)| *key == k)
                .map(|(_, v)| v.to_string())
        })
        .unwrap()
    }

    #[tokio::test]
    async fn memory_mode_uses_in_memory_store() {
        let store = select_job_store(&settings("memory", "6379")).await.unwrap();
        assert_eq!(store.backend(), "memory");
    }

    // Port 1 is never a redis server.
    #[tokio::test]
    async fn auto_mode_falls_back_when_redis_is_unreachable() {
        let store = select_job_store(&settings("auto", "1")).await.unwrap();
        assert_eq!(store.backend(), "memory");
    }

    #[tokio::test]
    async fn redis_mode_fails_when_unreachable() {
        let err = select_job_store(&settings("redis", "1")).await.err().unwrap();
        assert!(matches!(err, JobStoreError::Unavailable(_)));
    }
}
