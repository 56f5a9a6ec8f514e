//! Redis-backed job store (durable, expiring).
//!
//! Jobs are stored as JSON strings under `archigenie:job:{id}` with `SET .. EX`.
//! Conditional writes use `WATCH`/`MULTI`/`EXEC`, so a record modified by another
//! process between the read and the write is reported as a conflict rather than
//! overwritten.
//!
//! The redis client used here is blocking; every command runs on tokio's blocking
//! pool so request handling never stalls on the network.

use std::time::Duration;

use async_trait::async_trait;
use redis::Commands;
use tracing::{debug, instrument};

use archigenie_core::{ExpectedVersion, Job, JobId};

use super::store::{JobStore, JobStoreError};

/// Default key prefix for job records
const DEFAULT_KEY_PREFIX: &str = "archigenie:job:";

/// Connect timeout for each command round trip
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct RedisJobStore {
    client: redis::Client,
    key_prefix: String,
}

impl RedisJobStore {
    /// Create a store for `redis_url` (e.g. "redis://localhost:6379").
    ///
    /// This only validates the URL; use [`JobStore::ping`] to check reachability.
    pub fn new(redis_url: impl AsRef<str>) -> Result<Self, JobStoreError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| JobStoreError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        })
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    fn key(&self, job_id: JobId) -> String {
        format!("{}{}", self.key_prefix, job_id)
    }

    /// Run `f` with a fresh connection on the blocking pool.
    async fn with_connection<T, F>(&self, f: F) -> Result<T, JobStoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut redis::Connection) -> Result<T, JobStoreError> + Send + 'static,
    {
        let client = self.client.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = client
                .get_connection_with_timeout(CONNECT_TIMEOUT)
                .map_err(|e| JobStoreError::Unavailable(e.to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| JobStoreError::Storage(format!("redis task failed: {e}")))?
    }
}

fn command_error(e: redis::RedisError) -> JobStoreError {
    if e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout() || e.is_io_error() {
        JobStoreError::Unavailable(e.to_string())
    } else {
        JobStoreError::Storage(e.to_string())
    }
}

fn encode(job: &Job) -> Result<String, JobStoreError> {
    serde_json::to_string(job).map_err(|e| JobStoreError::Serialization(e.to_string()))
}

fn decode(raw: &str) -> Result<Job, JobStoreError> {
    serde_json::from_str(raw).map_err(|e| JobStoreError::Serialization(e.to_string()))
}

fn set_cmd(key: &str, payload: String, ttl: Option<Duration>) -> redis::Cmd {
    let mut cmd = redis::cmd("SET");
    cmd.arg(key).arg(payload);
    if let Some(ttl) = ttl {
        cmd.arg("EX").arg(ttl.as_secs().max(1));
    }
    cmd
}

fn unwatch(conn: &mut redis::Connection) -> Result<(), JobStoreError> {
    redis::cmd("UNWATCH").query::<()>(conn).map_err(command_error)
}

#[async_trait]
impl JobStore for RedisJobStore {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn ping(&self) -> Result<(), JobStoreError> {
        self.with_connection(|conn| {
            let pong: String = redis::cmd("PING").query(conn).map_err(command_error)?;
            debug!(reply = %pong, "redis ping");
            Ok(())
        })
        .await
    }

    #[instrument(skip(self, job), fields(job_id = %job.id))]
    async fn put(&self, job: &Job, ttl: Option<Duration>) -> Result<(), JobStoreError> {
        let key = self.key(job.id);
        let payload = encode(job)?;
        self.with_connection(move |conn| {
            set_cmd(&key, payload, ttl)
                .query::<()>(conn)
                .map_err(command_error)
        })
        .await
    }

    async fn get(&self, job_id: JobId) -> Result<Job, JobStoreError> {
        let key = self.key(job_id);
        let raw: Option<String> = self
            .with_connection(move |conn| conn.get(&key).map_err(command_error))
            .await?;
        match raw {
            Some(raw) => decode(&raw),
            None => Err(JobStoreError::NotFound(job_id)),
        }
    }

    #[instrument(skip(self, job), fields(job_id = %job.id))]
    async fn compare_and_swap(
        &self,
        expected: ExpectedVersion,
        job: &Job,
        ttl: Option<Duration>,
    ) -> Result<Job, JobStoreError> {
        let key = self.key(job.id);
        let job = job.clone();

        self.with_connection(move |conn| {
            redis::cmd("WATCH")
                .arg(&key)
                .query::<()>(conn)
                .map_err(command_error)?;

            let raw: Option<String> = conn.get(&key).map_err(command_error)?;
            let Some(raw) = raw else {
                unwatch(conn)?;
                return Err(JobStoreError::NotFound(job.id));
            };
            let current = decode(&raw)?;

            if !expected.matches(current.version) {
                unwatch(conn)?;
                return Err(JobStoreError::Conflict {
                    job_id: job.id,
                    expected,
                    actual: current.version,
                });
            }

            let mut next = job;
            next.version = current.version + 1;
            let payload = encode(&next)?;

            let mut pipe = redis::pipe();
            pipe.atomic().add_command(set_cmd(&key, payload, ttl)).ignore();

            // EXEC replies nil when the watched key changed after WATCH.
            let committed: Option<()> = pipe.query(conn).map_err(command_error)?;
            match committed {
                Some(()) => Ok(next),
                None => Err(JobStoreError::Conflict {
                    job_id: next.id,
                    expected,
                    actual: current.version,
                }),
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_prefixed() {
        let store = RedisJobStore::new("redis://localhost:6379").unwrap();
        let id = JobId::new();
        assert_eq!(store.key(id), format!("archigenie:job:{id}"));

        let store = store.with_key_prefix("test:");
        assert_eq!(store.key(id), format!("test:{id}"));
    }

    #[test]
    fn malformed_url_is_unavailable() {
        assert!(matches!(
            RedisJobStore::new("not a url"),
            Err(JobStoreError::Unavailable(_))
        ));
    }

    #[test]
    fn set_command_carries_expiry() {
        let cmd = set_cmd("k", "v".to_string(), Some(Duration::from_secs(86_400)));
        let packed = String::from_utf8(cmd.get_packed_command()).unwrap();
        assert!(packed.contains("EX"));
        assert!(packed.contains("86400"));

        let cmd = set_cmd("k", "v".to_string(), None);
        let packed = String::from_utf8(cmd.get_packed_command()).unwrap();
        assert!(!packed.contains("EX"));
    }

    /// Requires a live server: `REDIS_URL=redis://localhost:6379 cargo test -- --ignored`
    #[tokio::test]
    #[ignore]
    async fn cas_round_trip_against_live_redis() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".into());
        let store = RedisJobStore::new(url).unwrap().with_key_prefix("archigenie:test:");
        store.ping().await.unwrap();

        let job = Job::new();
        store.put(&job, Some(Duration::from_secs(60))).await.unwrap();

        let mut done = job.clone();
        done.mark_completed("doc", true, 1).unwrap();
        let stored = store
            .compare_and_swap(ExpectedVersion::Exact(0), &done, Some(Duration::from_secs(60)))
            .await
            .unwrap();
        assert_eq!(stored.version, 1);

        let err = store
            .compare_and_swap(ExpectedVersion::Exact(0), &done, None)
            .await
            .unwrap_err();
        assert!(matches!(err, JobStoreError::Conflict { .. }));
        assert_eq!(store.get(job.id).await.unwrap(), stored);
    }
}
