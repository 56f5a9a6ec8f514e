//! Requirement input and its normalization into a raw requirement string.
//!
//! A request is either *functional* (free text) or *guided* (structured
//! architecture selections). Both shapes collapse into one string before they
//! reach the generation engine.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

pub const FUNCTIONAL_MIN_CHARS: usize = 20;
pub const FUNCTIONAL_MAX_CHARS: usize = 2000;

const CLOSING_INSTRUCTION: &str = "Provide a clear and detailed production-ready architecture plan.";

/// Which of the two request shapes is in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequirementMode {
    Functional,
    Guided,
}

/// Architecture request as submitted by clients.
///
/// Only a subset of the guided selections is rendered into the requirement; the
/// remaining fields are accepted so richer clients can send them unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchitectureRequest {
    pub functional_requirement: Option<String>,
    /// Core architecture pattern
    pub architecture: Option<String>,
    pub custom_arch: Option<String>,
    pub services: Vec<String>,
    pub custom_service: Option<String>,
    pub integration: Vec<String>,
    pub custom_integration: Option<String>,
    pub data_storage: Vec<String>,
    pub caching: Vec<String>,
    pub data_processing: Vec<String>,
    pub custom_storage: Option<String>,
    pub security: Vec<String>,
    pub compliance: Vec<String>,
    pub custom_security: Option<String>,
    pub deployment: Option<String>,
    pub scaling: Vec<String>,
    pub monitoring: Vec<String>,
    pub custom_deployment: Option<String>,
    pub expected_concurrency: Option<u64>,
    /// Latency requirement in ms
    pub latency: Option<u64>,
    /// Throughput target in req/sec
    pub throughput: Option<u64>,
    pub resilience: Vec<String>,
    pub custom_resilience: Option<String>,
    pub advanced_features: Vec<String>,
    pub custom_advanced: Option<String>,
    /// Accepted for compatibility; the provider is process configuration.
    pub provider: Option<String>,
}

impl ArchitectureRequest {
    /// Functional text wins when present and non-blank; otherwise an architecture
    /// pattern selects guided mode.
    pub fn mode(&self) -> DomainResult<RequirementMode> {
        if self
            .functional_requirement
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty())
        {
            return Ok(RequirementMode::Functional);
        }
        if self
            .architecture
            .as_deref()
            .is_some_and(|a| !a.trim().is_empty())
        {
            return Ok(RequirementMode::Guided);
        }
        Err(DomainError::validation("Insufficient input provided."))
    }

    /// Render the request into the raw requirement fed to generation.
    pub fn to_raw_requirement(&self) -> DomainResult<String> {
        match self.mode()? {
            RequirementMode::Functional => self.render_functional(),
            RequirementMode::Guided => Ok(self.render_guided()),
        }
    }

    fn render_functional(&self) -> DomainResult<String> {
        let text = self.functional_requirement.as_deref().unwrap_or_default();
        let len = text.chars().count();
        if !(FUNCTIONAL_MIN_CHARS..=FUNCTIONAL_MAX_CHARS).contains(&len) {
            return Err(DomainError::validation(format!(
                "functional_requirement must be between {FUNCTIONAL_MIN_CHARS} and {FUNCTIONAL_MAX_CHARS} characters (got {len})"
            )));
        }
        Ok(format!(
            "FUNCTIONAL REQUIREMENT: {text}\n\n{CLOSING_INSTRUCTION}"
        ))
    }

    fn render_guided(&self) -> String {
        let or_na = |v: Option<u64>| v.map_or_else(|| "N/A".to_string(), |n| n.to_string());

        format!(
            "Core Architecture Pattern: {}\n\
             Business Services: {}\n\
             Integration Strategy: {}\n\
             Data Storage: {}\n\
             Security Measures: {}\n\
             Deployment Environment: {}\n\
             Scaling Strategies: {}\n\
             Performance Targets: Expected Concurrency: {}, Latency: {}ms, Throughput: {} req/sec\n\
             Advanced Features: {}\n\n\
             {CLOSING_INSTRUCTION}",
            self.architecture.as_deref().unwrap_or_default(),
            self.services.join(", "),
            self.integration.join(", "),
            self.data_storage.join(", "),
            self.security.join(", "),
            self.deployment.as_deref().unwrap_or_default(),
            self.scaling.join(", "),
            or_na(self.expected_concurrency),
            or_na(self.latency),
            or_na(self.throughput),
            self.advanced_features.join(", "),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guided() -> ArchitectureRequest {
        ArchitectureRequest {
            architecture: Some("Microservices".to_string()),
            services: vec!["Billing".to_string(), "Search".to_string()],
            integration: vec!["REST".to_string()],
            data_storage: vec!["PostgreSQL".to_string()],
            security: vec!["OAuth2".to_string(), "mTLS".to_string()],
            deployment: Some("Kubernetes".to_string()),
            scaling: vec!["Horizontal".to_string()],
            expected_concurrency: Some(1000),
            latency: Some(200),
            advanced_features: vec!["Event sourcing".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn empty_request_is_insufficient() {
        let err = ArchitectureRequest::default().to_raw_requirement().unwrap_err();
        assert_eq!(err, DomainError::validation("Insufficient input provided."));
    }

    #[test]
    fn blank_functional_text_falls_back_to_guided() {
        let mut req = guided();
        req.functional_requirement = Some("   ".to_string());
        assert_eq!(req.mode().unwrap(), RequirementMode::Guided);
    }

    #[test]
    fn functional_takes_precedence() {
        let mut req = guided();
        req.functional_requirement =
            Some("A ride sharing platform with live driver tracking".to_string());
        assert_eq!(req.mode().unwrap(), RequirementMode::Functional);

        let raw = req.to_raw_requirement().unwrap();
        assert_eq!(
            raw,
            "FUNCTIONAL REQUIREMENT: A ride sharing platform with live driver tracking\n\n\
             Provide a clear and detailed production-ready architecture plan."
        );
    }

    #[test]
    fn functional_text_length_is_bounded() {
        let req = ArchitectureRequest {
            functional_requirement: Some("too short".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            req.to_raw_requirement(),
            Err(DomainError::Validation(_))
        ));

        let req = ArchitectureRequest {
            functional_requirement: Some("x".repeat(FUNCTIONAL_MAX_CHARS + 1)),
            ..Default::default()
        };
        assert!(req.to_raw_requirement().is_err());
    }

    #[test]
    fn guided_renders_every_selection() {
        let raw = guided().to_raw_requirement().unwrap();
        let lines: Vec<&str> = raw.lines().collect();

        assert_eq!(lines[0], "Core Architecture Pattern: Microservices");
        assert_eq!(lines[1], "Business Services: Billing, Search");
        assert_eq!(lines[2], "Integration Strategy: REST");
        assert_eq!(lines[3], "Data Storage: PostgreSQL");
        assert_eq!(lines[4], "Security Measures: OAuth2, mTLS");
        assert_eq!(lines[5], "Deployment Environment: Kubernetes");
        assert_eq!(lines[6], "Scaling Strategies: Horizontal");
        assert_eq!(
            lines[7],
            "Performance Targets: Expected Concurrency: 1000, Latency: 200ms, Throughput: N/A req/sec"
        );
        assert_eq!(lines[8], "Advanced Features: Event sourcing");
        assert!(raw.ends_with(CLOSING_INSTRUCTION));
    }

    #[test]
    fn blank_architecture_is_insufficient_input() {
        for blank in ["", "   "] {
            let req = ArchitectureRequest {
                architecture: Some(blank.to_string()),
                services: vec!["Payments".to_string()],
                ..Default::default()
            };
            assert_eq!(
                req.mode(),
                Err(DomainError::validation("Insufficient input provided."))
            );
        }
    }

    #[test]
    fn deserializes_sparse_payloads() {
        let req: ArchitectureRequest =
            serde_json::from_str(r#"{"architecture":"Monolith","services":["Auth"]}"#).unwrap();
        assert_eq!(req.architecture.as_deref(), Some("Monolith"));
        assert_eq!(req.services, vec!["Auth".to_string()]);
        assert!(req.security.is_empty());
    }
}
