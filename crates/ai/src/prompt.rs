//! Prompt templates.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Version tag embedded in every prompt.
pub const PROMPT_VERSION: &str = "v2.3-technical-arch";

/// The model is told to emit only final content after this marker.
pub const MARKER: &str = "<<<ARCHITECTURE_START>>>";

/// Template family, chosen at configuration time.
///
/// `Instruct` suits instruction-tuned open models that tend to echo prompts;
/// `Comprehensive` asks for a structured plan with headings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptVariant {
    Instruct,
    #[default]
    Comprehensive,
}

impl PromptVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptVariant::Instruct => "instruct",
            PromptVariant::Comprehensive => "comprehensive",
        }
    }

    /// Build the full prompt for `raw_requirement`.
    pub fn render(&self, raw_requirement: &str) -> String {
        match self {
            PromptVariant::Instruct => format!(
                "[{PROMPT_VERSION}] Generate a detailed production-ready architecture specification for the following requirement:\n\
                 {raw_requirement}\n\n\
                 Your response must start with the marker {MARKER} and then include only the final architecture details. \
                 Do not echo any prompt instructions.\n\
                 {MARKER}"
            ),
            PromptVariant::Comprehensive => format!(
                "[{PROMPT_VERSION}] Generate a comprehensive production-ready architecture plan for the following requirement:\n\
                 {raw_requirement}\n\n\
                 Your response must start with the marker {MARKER} and then include only the final architecture details \
                 (with headings, sub-headings, etc.). Do not include any of the above instructions or prompt text.\n\
                 {MARKER}"
            ),
        }
    }
}

impl FromStr for PromptVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "instruct" => Ok(PromptVariant::Instruct),
            "comprehensive" => Ok(PromptVariant::Comprehensive),
            other => Err(format!(
                "unknown prompt variant '{other}' (expected 'instruct' or 'comprehensive')"
            )),
        }
    }
}

impl core::fmt::Display for PromptVariant {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
