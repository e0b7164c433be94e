//! Safety screening for submitted content.
//!
//! The failure policy is deliberately asymmetric and must stay that way:
//! with no external service configured at all, content is treated as safe
//! (the platform chose availability over paid screening); with a configured
//! service that errors, content is treated as unsafe at medium risk with a
//! synthetic `api_error` flag. Infrastructure failure never silently
//! auto-approves.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::AiEndpoint;
use crate::error::{AppError, Result};
use crate::models::{RiskLevel, SafetyAssessment};

/// Categories that force risk level high on their own.
const HIGH_SEVERITY_CATEGORIES: &[&str] = &[
    "sexual/minors",
    "violence/graphic",
    "self-harm/intent",
    "self-harm/instructions",
];

/// External safety-moderation service contract: text in, flagged category
/// names out.
#[async_trait]
pub trait SafetyProvider: Send + Sync {
    async fn screen(&self, text: &str) -> Result<Vec<String>>;
}

#[derive(Serialize)]
struct ScreenRequest<'a> {
    model: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct ScreenResponse {
    /// Category name -> flagged.
    categories: HashMap<String, bool>,
}

/// JSON-over-HTTP safety provider.
pub struct HttpSafetyProvider {
    client: reqwest::Client,
    endpoint: AiEndpoint,
}

impl HttpSafetyProvider {
    pub fn new(endpoint: AiEndpoint, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl SafetyProvider for HttpSafetyProvider {
    async fn screen(&self, text: &str) -> Result<Vec<String>> {
        let request = ScreenRequest {
            model: &self.endpoint.model,
            text,
        };

        let response = self
            .client
            .post(&self.endpoint.url)
            .bearer_auth(&self.endpoint.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::ExternalService(format!(
                "safety service returned {}",
                response.status()
            )));
        }

        let parsed: ScreenResponse = response.json().await?;
        let mut flagged: Vec<String> = parsed
            .categories
            .into_iter()
            .filter(|(_, hit)| *hit)
            .map(|(name, _)| name)
            .collect();
        flagged.sort();

        Ok(flagged)
    }
}

/// Screens content and derives a risk level from the flagged categories.
pub struct SafetyScreener {
    provider: Option<Arc<dyn SafetyProvider>>,
}

impl SafetyScreener {
    pub fn new(provider: Option<Arc<dyn SafetyProvider>>) -> Self {
        Self { provider }
    }

    /// Screen text. Infallible: the failure policy maps every outcome to an
    /// assessment.
    pub async fn screen(&self, text: &str) -> SafetyAssessment {
        let provider = match &self.provider {
            // No service configured: screening is off, content passes.
            None => return SafetyAssessment::safe(),
            Some(provider) => provider,
        };

        match provider.screen(text).await {
            Ok(flags) => Self::assess(flags),
            Err(e) => {
                // Configured but failing: conservative.
                tracing::warn!(error = %e, "Safety screening failed; treating content as unsafe");
                SafetyAssessment::api_error()
            }
        }
    }

    fn assess(flags: Vec<String>) -> SafetyAssessment {
        if flags.is_empty() {
            return SafetyAssessment::safe();
        }

        let has_high_severity = flags
            .iter()
            .any(|flag| HIGH_SEVERITY_CATEGORIES.contains(&flag.as_str()));
        let risk_level = if has_high_severity || flags.len() > 2 {
            RiskLevel::High
        } else {
            RiskLevel::Medium
        };

        SafetyAssessment {
            is_safe: false,
            flagged_categories: flags,
            risk_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticProvider {
        flags: Vec<String>,
    }

    #[async_trait]
    impl SafetyProvider for StaticProvider {
        async fn screen(&self, _text: &str) -> Result<Vec<String>> {
            Ok(self.flags.clone())
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl SafetyProvider for FailingProvider {
        async fn screen(&self, _text: &str) -> Result<Vec<String>> {
            Err(AppError::ExternalService("connection refused".into()))
        }
    }

    fn screener_with(flags: Vec<&str>) -> SafetyScreener {
        SafetyScreener::new(Some(Arc::new(StaticProvider {
            flags: flags.into_iter().map(String::from).collect(),
        })))
    }

    #[tokio::test]
    async fn test_unconfigured_service_is_permissive() {
        let screener = SafetyScreener::new(None);
        let assessment = screener.screen("anything at all").await;

        assert!(assessment.is_safe);
        assert_eq!(assessment.risk_level, RiskLevel::None);
        assert!(assessment.flagged_categories.is_empty());
    }

    #[tokio::test]
    async fn test_failing_service_is_conservative() {
        let screener = SafetyScreener::new(Some(Arc::new(FailingProvider)));
        let assessment = screener.screen("anything at all").await;

        assert!(!assessment.is_safe);
        assert_eq!(assessment.risk_level, RiskLevel::Medium);
        assert_eq!(assessment.flagged_categories, vec!["api_error".to_string()]);
    }

    #[tokio::test]
    async fn test_clean_response_is_safe() {
        let screener = screener_with(vec![]);
        let assessment = screener.screen("a lovely day").await;
        assert!(assessment.is_safe);
        assert_eq!(assessment.risk_level, RiskLevel::None);
    }

    #[tokio::test]
    async fn test_single_flag_is_medium_risk() {
        let screener = screener_with(vec!["harassment"]);
        let assessment = screener.screen("text").await;
        assert!(!assessment.is_safe);
        assert_eq!(assessment.risk_level, RiskLevel::Medium);
    }

    #[tokio::test]
    async fn test_high_severity_category_forces_high_risk() {
        let screener = screener_with(vec!["violence/graphic"]);
        let assessment = screener.screen("text").await;
        assert_eq!(assessment.risk_level, RiskLevel::High);
    }

    #[tokio::test]
    async fn test_more_than_two_flags_force_high_risk() {
        let screener = screener_with(vec!["harassment", "hate", "spam"]);
        let assessment = screener.screen("text").await;
        assert_eq!(assessment.risk_level, RiskLevel::High);
    }
}
