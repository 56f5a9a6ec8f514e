//! HTTP clients for the supported language-model providers.
//!
//! Both providers implement [`LanguageModel`]; the active one is chosen from
//! settings once at startup.

mod huggingface;
mod openai;

use std::sync::Arc;
use std::time::Duration;

use archigenie_ai::{LanguageModel, LlmError};
use reqwest::StatusCode;

use crate::config::{Provider, Settings};

pub use huggingface::{HuggingFaceModel, HuggingFaceParams};
pub use openai::{OpenAiModel, OpenAiParams};

/// Connect timeout, separate from the per-request timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest provider error body kept in an error message
const MAX_ERROR_BODY_CHARS: usize = 300;

/// Build the language model selected by `settings.provider`.
pub fn build_language_model(settings: &Settings) -> Result<Arc<dyn LanguageModel>, LlmError> {
    let missing = |what: &str| LlmError::Misconfiguration(format!("{what} is not set"));

    let model: Arc<dyn LanguageModel> = match settings.provider {
        Provider::OpenAi => {
            let key = settings
                .openai_api_key
                .clone()
                .ok_or_else(|| missing("OPENAI_API_KEY"))?;
            Arc::new(OpenAiModel::new(
                key,
                settings.model_name.clone(),
                settings.llm_timeout,
            )?)
        }
        Provider::HuggingFace => {
            let token = settings
                .huggingface_api_token
                .clone()
                .ok_or_else(|| missing("HUGGINGFACEHUB_API_TOKEN"))?;
            Arc::new(HuggingFaceModel::new(
                token,
                settings.model_name.clone(),
                settings.llm_timeout,
            )?)
        }
    };
    Ok(model)
}

/// Shared client configuration for provider calls.
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, LlmError> {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT.min(timeout))
        .timeout(timeout)
        .build()
        .map_err(|e| LlmError::Misconfiguration(format!("failed to build HTTP client: {e}")))
}

/// Map a failed send to a capability error.
pub(crate) fn map_send_error(e: reqwest::Error, timeout: Duration, provider: &str) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout(timeout.as_secs())
    } else {
        LlmError::Connection(format!("{provider} request failed: {e}"))
    }
}

/// Map a non-success status and its body to a capability error.
pub(crate) fn map_status(status: StatusCode, body: &str, provider: &str) -> LlmError {
    let detail: String = body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            LlmError::Auth(format!("{provider} rejected credentials ({status})"))
        }
        StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited(format!("{provider}: {detail}")),
        _ => LlmError::Provider {
            status: status.as_u16(),
            message: detail,
        },
    }
}
