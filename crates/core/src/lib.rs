//! `archigenie-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! job identifiers, the job record and its state machine, and the requirement
//! inputs that get normalized into a raw requirement for generation.

pub mod error;
pub mod id;
pub mod job;
pub mod requirement;
pub mod version;

pub use error::{DomainError, DomainResult};
pub use id::JobId;
pub use job::{Job, JobStatus};
pub use requirement::{ArchitectureRequest, RequirementMode};
pub use version::ExpectedVersion;
