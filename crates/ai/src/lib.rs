//! `archigenie-ai`
//!
//! **Responsibility:** the generation engine.
//!
//! This crate stays transport-agnostic:
//! - The language model is a capability (`LanguageModel`) supplied by callers
//!   (infra provides the HTTP clients).
//! - It never touches job state; it turns a raw requirement into sanitized text.

pub mod engine;
pub mod model;
pub mod prompt;
pub mod retry;
pub mod sanitize;

pub use engine::{DEFAULT_TRANSIENT_RETRIES, EngineConfig, Generation, GenerationEngine, GenerationError};
pub use model::{LanguageModel, LlmError, Message, Role};
pub use prompt::{MARKER, PROMPT_VERSION, PromptVariant};
pub use retry::{BackoffStrategy, RetryPolicy};
pub use sanitize::{AcceptanceCriteria, sanitize};
