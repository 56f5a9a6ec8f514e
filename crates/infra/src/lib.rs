//! Infrastructure layer: job persistence, orchestration, configuration and
//! external service clients.

pub mod config;
pub mod jobs;
pub mod llm;

pub use config::{ConfigError, JobStoreMode, Provider, Settings};
