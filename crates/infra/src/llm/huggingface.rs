//! Hugging Face Inference API backend (text generation).

use std::time::Duration;

use archigenie_ai::{LanguageModel, LlmError, Message};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{http_client, map_send_error, map_status};

const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co/models";

#[derive(Debug, Clone, PartialEq)]
pub struct HuggingFaceParams {
    pub temperature: f32,
    pub max_length: u32,
}

impl Default for HuggingFaceParams {
    fn default() -> Self {
        Self {
            temperature: 0.4,
            max_length: 2048,
        }
    }
}

#[derive(Clone)]
pub struct HuggingFaceModel {
    client: reqwest::Client,
    base_url: String,
    token: String,
    model: String,
    params: HuggingFaceParams,
    timeout: Duration,
}

impl HuggingFaceModel {
    pub fn new(token: String, model: String, timeout: Duration) -> Result<Self, LlmError> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: DEFAULT_BASE_URL.to_string(),
            token,
            model,
            params: HuggingFaceParams::default(),
            timeout,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_params(mut self, params: HuggingFaceParams) -> Self {
        self.params = params;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), self.model)
    }

    /// Text-generation models take a single prompt; messages are joined in order.
    fn request_body(&self, messages: &[Message]) -> GenerationRequest {
        let inputs = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        GenerationRequest {
            inputs,
            parameters: GenerationParameters {
                temperature: self.params.temperature,
                max_length: self.params.max_length,
                return_full_text: false,
            },
        }
    }
}

fn extract_text(body: &str) -> Result<String, LlmError> {
    let parsed: GenerationResponse = serde_json::from_str(body).map_err(|e| {
        LlmError::InvalidResponse(format!("failed to parse huggingface response: {e}"))
    })?;
    match parsed {
        GenerationResponse::Many(items) => items.into_iter().next().map(|i| i.generated_text),
        GenerationResponse::One(item) => Some(item.generated_text),
    }
    .ok_or_else(|| LlmError::InvalidResponse("huggingface response had no generations".into()))
}

#[async_trait]
impl LanguageModel for HuggingFaceModel {
    fn provider(&self) -> &str {
        "huggingface"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn invoke(&self, messages: &[Message]) -> Result<String, LlmError> {
        debug!(
            provider = "huggingface",
            model = %self.model,
            max_length = self.params.max_length,
            temperature = self.params.temperature,
            timeout_secs = self.timeout.as_secs(),
            "invoking huggingface"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.token)
            .json(&self.request_body(messages))
            .send()
            .await
            .map_err(|e| map_send_error(e, self.timeout, "huggingface"))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| map_send_error(e, self.timeout, "huggingface"))?;
        if !status.is_success() {
            return Err(map_status(status, &body, "huggingface"));
        }
        extract_text(&body)
    }
}

#[derive(Debug, Serialize)]
struct GenerationRequest {
    inputs: String,
    parameters: GenerationParameters,
}

#[derive(Debug, Serialize)]
struct GenerationParameters {
    temperature: f32,
    max_length: u32,
    return_full_text: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GenerationResponse {
    Many(Vec<GeneratedText>),
    One(GeneratedText),
}

#[derive(Debug, Deserialize)]
struct GeneratedText {
    generated_text: String,
}
