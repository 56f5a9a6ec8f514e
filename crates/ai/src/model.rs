//! The language-model capability boundary.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single message sent to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }
}

/// Failure at the capability boundary.
///
/// These are never validation failures: the model did not produce any text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("rate limited by provider: {0}")]
    RateLimited(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("provider error (status {status}): {message}")]
    Provider { status: u16, message: String },

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("misconfiguration: {0}")]
    Misconfiguration(String),
}

impl LlmError {
    /// Whether retrying the same call later could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::Timeout(_) | LlmError::RateLimited(_) | LlmError::Connection(_) => true,
            LlmError::Provider { status, .. } => *status >= 500,
            LlmError::Auth(_) | LlmError::InvalidResponse(_) | LlmError::Misconfiguration(_) => {
                false
            }
        }
    }
}

/// Submit messages, receive text, may fail.
///
/// Latency is unbounded; implementations must be safe to call concurrently from
/// many jobs.
#[async_trait]
pub trait LanguageModel: Send + Sync + 'static {
    /// Provider name for logs (e.g. "openai").
    fn provider(&self) -> &str;

    /// Model identifier in use.
    fn model(&self) -> &str;

    async fn invoke(&self, messages: &[Message]) -> Result<String, LlmError>;
}
