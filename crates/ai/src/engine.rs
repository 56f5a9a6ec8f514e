//! Generation engine: prompt, invoke, sanitize, validate, retry.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::model::{LanguageModel, LlmError, Message};
use crate::prompt::{MARKER, PromptVariant};
use crate::retry::RetryPolicy;
use crate::sanitize::{AcceptanceCriteria, sanitize};

/// Re-invocations allowed per attempt when the provider fails transiently
pub const DEFAULT_TRANSIENT_RETRIES: u32 = 3;

/// Engine configuration, fixed for the lifetime of the serving process.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub variant: PromptVariant,
    pub retry: RetryPolicy,
    pub acceptance: AcceptanceCriteria,
    /// Extra provider calls allowed per attempt after a transient failure
    pub transient_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            variant: PromptVariant::default(),
            retry: RetryPolicy::default(),
            acceptance: AcceptanceCriteria::default(),
            transient_retries: DEFAULT_TRANSIENT_RETRIES,
        }
    }
}

impl EngineConfig {
    pub fn with_variant(mut self, variant: PromptVariant) -> Self {
        self.variant = variant;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_transient_retries(mut self, retries: u32) -> Self {
        self.transient_retries = retries;
        self
    }
}

/// Output of a generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    /// Sanitized document from the last attempt made
    pub text: String,
    /// `false` when the attempt budget ran out before the text passed acceptance
    pub validated: bool,
    /// Attempts that produced text and went through acceptance
    pub attempts: u32,
    /// Provider calls made, including transient failures that were retried
    pub invocations: u32,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    /// The provider call itself failed; no text was produced.
    #[error("{0}")]
    Capability(#[from] LlmError),
}

/// Turns raw requirements into sanitized architecture documents.
pub struct GenerationEngine {
    model: Arc<dyn LanguageModel>,
    config: EngineConfig,
}

impl GenerationEngine {
    pub fn new(model: Arc<dyn LanguageModel>, config: EngineConfig) -> Self {
        Self { model, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn provider(&self) -> &str {
        self.model.provider()
    }

    /// Generate a document for `raw_requirement`.
    ///
    /// Attempts that fail acceptance are retried under the configured policy.
    /// When the budget is exhausted the last sanitized output is returned with
    /// `validated = false`. Transient provider failures are re-invoked up to
    /// `transient_retries` times per attempt; anything else, or a transient
    /// failure that outlasts that allowance, is an error.
    pub async fn generate(&self, raw_requirement: &str) -> Result<Generation, GenerationError> {
        let max_attempts = self.config.retry.max_attempts.max(1);
        let prompt = self.config.variant.render(raw_requirement);
        let messages = [Message::user(prompt)];

        info!(
            provider = self.model.provider(),
            model = self.model.model(),
            variant = %self.config.variant,
            max_attempts,
            "generating architecture details"
        );

        let mut last = String::new();
        let mut attempt = 0;
        let mut invocations = 0;
        while attempt < max_attempts {
            attempt += 1;

            let raw = self.invoke(&messages, attempt, &mut invocations).await?;
            let sanitized = sanitize(raw.trim(), MARKER);

            if self.config.acceptance.accepts(&sanitized) {
                info!(attempt, "valid output generated");
                return Ok(Generation {
                    text: sanitized,
                    validated: true,
                    attempts: attempt,
                    invocations,
                });
            }

            warn!(attempt, chars = sanitized.chars().count(), "output not valid");
            debug!(attempt, output = %sanitized, "rejected output");
            last = sanitized;

            if self.config.retry.should_retry(attempt) {
                let delay = self.config.retry.delay_for_attempt(attempt);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        }

        error!(attempts = attempt, "no valid output within attempt budget; returning best effort");
        Ok(Generation {
            text: last,
            validated: false,
            attempts: attempt,
            invocations,
        })
    }

    /// One attempt's provider call, re-invoked while failures stay transient.
    async fn invoke(
        &self,
        messages: &[Message],
        attempt: u32,
        invocations: &mut u32,
    ) -> Result<String, LlmError> {
        let mut retries = 0;
        loop {
            *invocations += 1;
            match self.model.invoke(messages).await {
                Ok(raw) => return Ok(raw),
                Err(e) if e.is_transient() && retries < self.config.transient_retries => {
                    retries += 1;
                    let delay = self.config.retry.delay_for_attempt(retries);
                    warn!(
                        attempt,
                        retry = retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient provider failure; retrying"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(e) => {
                    warn!(attempt, retries, error = %e, "language model invocation failed");
                    return Err(e);
                }
            }
        }
    }
}
