//! OpenAI chat completions backend.

use std::time::Duration;

use archigenie_ai::{LanguageModel, LlmError, Message, Role};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{http_client, map_send_error, map_status};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Sampling parameters sent with every request.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenAiParams {
    pub temperature: f32,
    pub max_tokens: u32,
    pub frequency_penalty: f32,
}

impl Default for OpenAiParams {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 2048,
            frequency_penalty: 0.7,
        }
    }
}

#[derive(Clone)]
pub struct OpenAiModel {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    params: OpenAiParams,
    timeout: Duration,
}

impl OpenAiModel {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Result<Self, LlmError> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            model,
            params: OpenAiParams::default(),
            timeout,
        })
    }

    /// Point at an OpenAI-compatible endpoint other than api.openai.com.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_params(mut self, params: OpenAiParams) -> Self {
        self.params = params;
        self
    }

    fn request_body(&self, messages: &[Message]) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: messages
                .iter()
                .map(|m| ChatMessage {
                    role: match m.role {
                        Role::System => "system",
                        Role::User => "user",
                        Role::Assistant => "assistant",
                    },
                    content: m.content.clone(),
                })
                .collect(),
            temperature: self.params.temperature,
            max_tokens: self.params.max_tokens,
            frequency_penalty: self.params.frequency_penalty,
        }
    }
}

fn extract_content(response: ChatResponse) -> Result<String, LlmError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| {
            LlmError::InvalidResponse("openai response missing choices[0].message.content".into())
        })
}

#[async_trait]
impl LanguageModel for OpenAiModel {
    fn provider(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn invoke(&self, messages: &[Message]) -> Result<String, LlmError> {
        debug!(
            provider = "openai",
            model = %self.model,
            max_tokens = self.params.max_tokens,
            temperature = self.params.temperature,
            timeout_secs = self.timeout.as_secs(),
            "invoking openai"
        );

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(messages))
            .send()
            .await
            .map_err(|e| map_send_error(e, self.timeout, "openai"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status(status, &body, "openai"));
        }

        let body: ChatResponse = response.json().await.map_err(|e| {
            LlmError::InvalidResponse(format!("failed to parse openai response: {e}"))
        })?;

        if let Some(usage) = &body.usage {
            debug!(
                provider = "openai",
                tokens_input = usage.prompt_tokens,
                tokens_output = usage.completion_tokens,
                "openai invocation completed"
            );
        }
        extract_content(body)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    frequency_penalty: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> OpenAiModel {
        OpenAiModel::new("sk-test".into(), "gpt-4".into(), Duration::from_secs(30)).unwrap()
    }

    #[test]
    fn request_carries_model_and_sampling_params() {
        let body = model().request_body(&[Message::system("be terse"), Message::user("design it")]);
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["model"], "gpt-4");
        assert_eq!(json["max_tokens"], 2048);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "design it");
        assert!((json["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
        assert!((json["frequency_penalty"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn parses_first_choice() {
        let raw = r#"{
            "choices": [{"message": {"role": "assistant", "content": "doc"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 20}
        }"#;
        let response: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(extract_content(response).unwrap(), "doc");
    }

    #[test]
    fn empty_choices_is_invalid_response() {
        let response: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(
            extract_content(response),
            Err(LlmError::InvalidResponse(_))
        ));
    }
}
