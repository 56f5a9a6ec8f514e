//! Configuration loading and representation.
//!
//! Everything comes from the process environment. Settings are validated once at
//! startup and then passed explicitly to the components that need them.

use std::str::FromStr;
use std::time::Duration;

use archigenie_ai::{
    BackoffStrategy, DEFAULT_TRANSIENT_RETRIES, EngineConfig, PromptVariant, RetryPolicy,
};
use thiserror::Error;

pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:8501";
pub const DEFAULT_JOB_TTL_SECS: u64 = 86_400;

/// Cap for growing backoff strategies
const MAX_GENERATION_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },

    #[error("{0}")]
    Missing(String),

    #[error("{0}")]
    Unsupported(String),
}

/// Supported language-model providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    HuggingFace,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::HuggingFace => "huggingface",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::OpenAi => "gpt-4",
            Provider::HuggingFace => "google/flan-t5-xl",
        }
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "huggingface" => Ok(Provider::HuggingFace),
            _ => Err(ConfigError::Unsupported(
                "Unsupported provider in environment. Use 'openai' or 'huggingface'.".to_string(),
            )),
        }
    }
}

/// Which job store backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStoreMode {
    /// Redis when reachable at startup, otherwise in-memory
    Auto,
    /// Redis or fail
    Redis,
    /// In-process only
    Memory,
}

impl FromStr for JobStoreMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(JobStoreMode::Auto),
            "redis" => Ok(JobStoreMode::Redis),
            "memory" => Ok(JobStoreMode::Memory),
            other => Err(ConfigError::Invalid {
                key: "JOB_STORE",
                message: format!("'{other}' (expected auto, redis or memory)"),
            }),
        }
    }
}

/// Process settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub app_env: String,
    pub provider: Provider,
    pub openai_api_key: Option<String>,
    pub huggingface_api_token: Option<String>,
    pub model_name: String,
    pub prompt_variant: PromptVariant,
    pub llm_timeout: Duration,
    pub generation_max_attempts: u32,
    pub generation_backoff: Duration,
    pub generation_backoff_strategy: BackoffStrategy,
    /// Fraction of each backoff delay to spread around its nominal value
    pub generation_backoff_jitter: f64,
    /// Extra provider calls per attempt after a transient failure
    pub llm_max_retries: u32,
    pub job_store: JobStoreMode,
    pub redis_host: String,
    pub redis_port: u16,
    pub job_ttl: Duration,
    pub allowed_origins: Vec<String>,
    pub rate_limit_per_minute: u32,
    /// Key rate limiting on `X-Forwarded-For` instead of the peer address
    pub trust_forwarded_for: bool,
    pub bind_addr: String,
}

impl Settings {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings from an arbitrary key lookup (used by tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let provider: Provider = get("AI_PROVIDER")
            .unwrap_or_else(|| "huggingface".to_string())
            .parse()?;

        let model_name = get("MODEL_NAME").unwrap_or_else(|| provider.default_model().to_string());

        let prompt_variant = match get("PROMPT_VARIANT") {
            Some(v) => v.parse::<PromptVariant>().map_err(|message| ConfigError::Invalid {
                key: "PROMPT_VARIANT",
                message,
            })?,
            None => PromptVariant::default(),
        };

        let generation_backoff_strategy = match get("GENERATION_BACKOFF_STRATEGY") {
            Some(v) => parse_backoff_strategy(&v)?,
            None => BackoffStrategy::Fixed,
        };

        let job_store = match get("JOB_STORE") {
            Some(v) => v.parse()?,
            None => JobStoreMode::Auto,
        };

        let allowed_origins = get("ALLOWED_ORIGINS")
            .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGIN.to_string())
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        let settings = Self {
            app_env: get("APP_ENV").unwrap_or_else(|| "development".to_string()),
            provider,
            openai_api_key: get("OPENAI_API_KEY"),
            huggingface_api_token: get("HUGGINGFACEHUB_API_TOKEN"),
            model_name,
            prompt_variant,
            llm_timeout: Duration::from_secs(parse_number(&get, "LLM_TIMEOUT_SECS", 30)?),
            generation_max_attempts: parse_number(&get, "GENERATION_MAX_ATTEMPTS", 3)?,
            generation_backoff: Duration::from_millis(parse_number(&get, "GENERATION_BACKOFF_MS", 0)?),
            generation_backoff_strategy,
            generation_backoff_jitter: parse_number(&get, "GENERATION_BACKOFF_JITTER", 0.0)?,
            llm_max_retries: parse_number(&get, "LLM_MAX_RETRIES", DEFAULT_TRANSIENT_RETRIES)?,
            job_store,
            redis_host: get("REDIS_HOST").unwrap_or_else(|| "localhost".to_string()),
            redis_port: parse_number(&get, "REDIS_PORT", 6379)?,
            job_ttl: Duration::from_secs(parse_number(&get, "JOB_TTL_SECS", DEFAULT_JOB_TTL_SECS)?),
            allowed_origins,
            rate_limit_per_minute: parse_number(&get, "RATE_LIMIT_PER_MINUTE", 30)?,
            trust_forwarded_for: parse_number(&get, "TRUST_FORWARDED_FOR", false)?,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8000".to_string()),
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Cross-field checks that cannot be expressed per variable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.provider {
            Provider::OpenAi if self.openai_api_key.is_none() => {
                return Err(ConfigError::Missing(
                    "OpenAI API key is required when using the OpenAI provider.".to_string(),
                ));
            }
            Provider::HuggingFace if self.huggingface_api_token.is_none() => {
                return Err(ConfigError::Missing(
                    "HuggingFace Hub token is required when using the HuggingFace provider."
                        .to_string(),
                ));
            }
            Provider::HuggingFace if self.model_name.to_lowercase().contains("gpt") => {
                return Err(ConfigError::Unsupported(
                    "GPT models require the OpenAI provider.".to_string(),
                ));
            }
            _ => {}
        }

        if self.generation_max_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "GENERATION_MAX_ATTEMPTS",
                message: "must be at least 1".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.generation_backoff_jitter) {
            return Err(ConfigError::Invalid {
                key: "GENERATION_BACKOFF_JITTER",
                message: format!("{} (expected 0.0 to 1.0)", self.generation_backoff_jitter),
            });
        }
        if self.rate_limit_per_minute == 0 {
            return Err(ConfigError::Invalid {
                key: "RATE_LIMIT_PER_MINUTE",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}", self.redis_host, self.redis_port)
    }

    /// Job TTL as stored in the durable backend.
    pub fn job_ttl(&self) -> Option<Duration> {
        (!self.job_ttl.is_zero()).then_some(self.job_ttl)
    }

    pub fn engine_config(&self) -> EngineConfig {
        let attempts = self.generation_max_attempts;
        let delay = self.generation_backoff;
        let retry = match self.generation_backoff_strategy {
            BackoffStrategy::Fixed => RetryPolicy::fixed(attempts, delay),
            BackoffStrategy::Exponential => {
                RetryPolicy::exponential(attempts, delay, MAX_GENERATION_BACKOFF.max(delay))
            }
            BackoffStrategy::Linear => RetryPolicy {
                strategy: BackoffStrategy::Linear,
                max_delay: MAX_GENERATION_BACKOFF.max(delay),
                ..RetryPolicy::fixed(attempts, delay)
            },
        };
        EngineConfig::default()
            .with_variant(self.prompt_variant)
            .with_retry(retry.with_jitter(self.generation_backoff_jitter))
            .with_transient_retries(self.llm_max_retries)
    }
}

fn parse_backoff_strategy(raw: &str) -> Result<BackoffStrategy, ConfigError> {
    match raw.to_lowercase().as_str() {
        "fixed" => Ok(BackoffStrategy::Fixed),
        "exponential" => Ok(BackoffStrategy::Exponential),
        "linear" => Ok(BackoffStrategy::Linear),
        other => Err(ConfigError::Invalid {
            key: "GENERATION_BACKOFF_STRATEGY",
            message: format!("'{other}' (expected fixed, exponential or linear)"),
        }),
    }
}

fn parse_number<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            message: format!("'{raw}': {e}"),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|k| env.get(k).cloned())
    }

    #[test]
    fn defaults_for_huggingface() {
        let s = load(&[("HUGGINGFACEHUB_API_TOKEN", "hf_x")]).unwrap();

        assert_eq!(s.provider, Provider::HuggingFace);
        assert_eq!(s.model_name, "google/flan-t5-xl");
        assert_eq!(s.prompt_variant, PromptVariant::Comprehensive);
        assert_eq!(s.job_store, JobStoreMode::Auto);
        assert_eq!(s.redis_url(), "redis://localhost:6379");
        assert_eq!(s.job_ttl(), Some(Duration::from_secs(86_400)));
        assert_eq!(s.allowed_origins, vec!["http://localhost:8501".to_string()]);
        assert_eq!(s.rate_limit_per_minute, 30);
        assert_eq!(s.generation_max_attempts, 3);
        assert_eq!(s.llm_max_retries, 3);
        assert!(!s.trust_forwarded_for);
        assert_eq!(s.engine_config().retry.jitter, 0.0);
        assert_eq!(s.bind_addr, "0.0.0.0:8000");
    }

    #[test]
    fn openai_defaults_to_gpt4() {
        let s = load(&[("AI_PROVIDER", "OpenAI"), ("OPENAI_API_KEY", "sk-x")]).unwrap();
        assert_eq!(s.provider, Provider::OpenAi);
        assert_eq!(s.model_name, "gpt-4");
    }

    #[test]
    fn rejects_unknown_provider() {
        assert!(matches!(
            load(&[("AI_PROVIDER", "cohere")]),
            Err(ConfigError::Unsupported(_))
        ));
    }

    #[test]
    fn requires_credentials_for_selected_provider() {
        assert!(matches!(
            load(&[("AI_PROVIDER", "openai")]),
            Err(ConfigError::Missing(_))
        ));
        assert!(matches!(load(&[]), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn gpt_models_need_openai() {
        let err = load(&[
            ("HUGGINGFACEHUB_API_TOKEN", "hf_x"),
            ("MODEL_NAME", "gpt-3.5-turbo"),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Unsupported("GPT models require the OpenAI provider.".to_string())
        );
    }

    #[test]
    fn parses_lists_and_numbers() {
        let s = load(&[
            ("HUGGINGFACEHUB_API_TOKEN", "hf_x"),
            ("ALLOWED_ORIGINS", "http://a.test, http://b.test,"),
            ("REDIS_PORT", "6380"),
            ("JOB_STORE", "memory"),
            ("PROMPT_VARIANT", "instruct"),
            ("GENERATION_BACKOFF_MS", "250"),
        ])
        .unwrap();

        assert_eq!(s.allowed_origins, vec!["http://a.test", "http://b.test"]);
        assert_eq!(s.redis_port, 6380);
        assert_eq!(s.job_store, JobStoreMode::Memory);
        assert_eq!(s.prompt_variant, PromptVariant::Instruct);
        assert_eq!(
            s.engine_config().retry,
            RetryPolicy::fixed(3, Duration::from_millis(250))
        );
    }

    #[test]
    fn backoff_strategy_shapes_retry_policy() {
        let s = load(&[
            ("HUGGINGFACEHUB_API_TOKEN", "hf_x"),
            ("GENERATION_BACKOFF_MS", "100"),
            ("GENERATION_BACKOFF_STRATEGY", "exponential"),
        ])
        .unwrap();
        let retry = s.engine_config().retry;
        assert_eq!(retry.strategy, BackoffStrategy::Exponential);
        assert_eq!(retry.max_delay, Duration::from_secs(30));
        assert_eq!(retry.jitter, 0.0);
        assert_eq!(retry.delay_for_attempt(2), Duration::from_millis(200));

        assert!(matches!(
            load(&[
                ("HUGGINGFACEHUB_API_TOKEN", "hf_x"),
                ("GENERATION_BACKOFF_STRATEGY", "random")
            ]),
            Err(ConfigError::Invalid { key: "GENERATION_BACKOFF_STRATEGY", .. })
        ));
    }

    #[test]
    fn jitter_and_transient_retries_come_from_settings() {
        let s = load(&[
            ("HUGGINGFACEHUB_API_TOKEN", "hf_x"),
            ("GENERATION_BACKOFF_MS", "1000"),
            ("GENERATION_BACKOFF_JITTER", "0.25"),
            ("LLM_MAX_RETRIES", "0"),
            ("TRUST_FORWARDED_FOR", "true"),
        ])
        .unwrap();
        let config = s.engine_config();

        assert_eq!(config.retry.jitter, 0.25);
        assert_eq!(config.transient_retries, 0);
        assert!(s.trust_forwarded_for);
        let delay = config.retry.delay_for_attempt(1);
        assert!(delay >= Duration::from_millis(750) && delay <= Duration::from_millis(1250));

        assert!(matches!(
            load(&[
                ("HUGGINGFACEHUB_API_TOKEN", "hf_x"),
                ("GENERATION_BACKOFF_JITTER", "1.5")
            ]),
            Err(ConfigError::Invalid { key: "GENERATION_BACKOFF_JITTER", .. })
        ));
    }

    #[test]
    fn rejects_malformed_numbers_and_zero_attempts() {
        assert!(matches!(
            load(&[("HUGGINGFACEHUB_API_TOKEN", "hf_x"), ("REDIS_PORT", "abc")]),
            Err(ConfigError::Invalid { key: "REDIS_PORT", .. })
        ));
        assert!(matches!(
            load(&[
                ("HUGGINGFACEHUB_API_TOKEN", "hf_x"),
                ("GENERATION_MAX_ATTEMPTS", "0")
            ]),
            Err(ConfigError::Invalid { key: "GENERATION_MAX_ATTEMPTS", .. })
        ));
    }
}
