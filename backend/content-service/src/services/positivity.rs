//! Positivity ("wellbeing") scoring for submitted content.
//!
//! The fallback weighting is asymmetric on purpose: a negative keyword costs
//! more (−8) than a positive keyword earns (+5), so mixed content skews
//! downward.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::AiEndpoint;
use crate::error::{AppError, Result};

const BASELINE_SCORE: i32 = 50;
const POSITIVE_WEIGHT: i32 = 5;
const NEGATIVE_WEIGHT: i32 = 8;

const POSITIVE_KEYWORDS: &[&str] = &[
    "love",
    "joy",
    "grateful",
    "gratitude",
    "hope",
    "peace",
    "happy",
    "kind",
    "inspire",
    "inspiring",
    "beautiful",
    "blessed",
    "calm",
    "thankful",
    "wonderful",
];

const NEGATIVE_KEYWORDS: &[&str] = &[
    "hate",
    "hopeless",
    "angry",
    "fear",
    "sad",
    "terrible",
    "awful",
    "worthless",
    "despair",
    "broken",
    "hurt",
    "ugly",
    "disgusting",
    "miserable",
];

/// External positivity-scoring service contract: text in, blended 0-100
/// estimate out.
#[async_trait]
pub trait PositivityProvider: Send + Sync {
    async fn score(&self, text: &str) -> Result<i16>;
}

#[derive(Serialize)]
struct ScoreRequest<'a> {
    model: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct ScoreResponse {
    score: f64,
}

/// JSON-over-HTTP positivity provider.
pub struct HttpPositivityProvider {
    client: reqwest::Client,
    endpoint: AiEndpoint,
}

impl HttpPositivityProvider {
    pub fn new(endpoint: AiEndpoint, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl PositivityProvider for HttpPositivityProvider {
    async fn score(&self, text: &str) -> Result<i16> {
        let request = ScoreRequest {
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
                "positivity service returned {}",
                response.status()
            )));
        }

        let parsed: ScoreResponse = response.json().await?;
        Ok(parsed.score.clamp(0.0, 100.0).round() as i16)
    }
}

/// Produces a 0-100 wellbeing score for content text.
pub struct PositivityScorer {
    provider: Option<Arc<dyn PositivityProvider>>,
}

impl PositivityScorer {
    pub fn new(provider: Option<Arc<dyn PositivityProvider>>) -> Self {
        Self { provider }
    }

    /// Score text. Infallible: provider failures fall back to the keyword
    /// heuristic.
    pub async fn score(&self, text: &str) -> i16 {
        if let Some(provider) = &self.provider {
            match provider.score(text).await {
                Ok(score) => return score,
                Err(e) => {
                    tracing::warn!(error = %e, "Positivity scoring failed; using keyword fallback");
                }
            }
        }

        Self::score_by_keywords(text)
    }

    fn score_by_keywords(text: &str) -> i16 {
        let words: Vec<String> = text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        let positive_hits = count_hits(&words, POSITIVE_KEYWORDS) as i32;
        let negative_hits = count_hits(&words, NEGATIVE_KEYWORDS) as i32;

        let score =
            BASELINE_SCORE + POSITIVE_WEIGHT * positive_hits - NEGATIVE_WEIGHT * negative_hits;
        score.clamp(0, 100) as i16
    }
}

fn count_hits(words: &[String], keywords: &[&str]) -> usize {
    keywords
        .iter()
        .map(|keyword| words.iter().filter(|word| word == keyword).count())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_scorer() -> PositivityScorer {
        PositivityScorer::new(None)
    }

    #[tokio::test]
    async fn test_neutral_text_scores_baseline() {
        let scorer = local_scorer();
        assert_eq!(scorer.score("just an ordinary afternoon").await, 50);
    }

    #[tokio::test]
    async fn test_two_negative_hits() {
        let scorer = local_scorer();
        // "hate" and "hopeless": 50 - 8*2 = 34.
        assert_eq!(scorer.score("I hate everything, it's hopeless").await, 34);
    }

    #[tokio::test]
    async fn test_positive_keywords_add_five_each() {
        let scorer = local_scorer();
        // "love" and "joy": 50 + 5*2 = 60.
        assert_eq!(scorer.score("love and joy on the trail").await, 60);
    }

    #[tokio::test]
    async fn test_negative_outweighs_positive() {
        let scorer = local_scorer();
        // One of each: 50 + 5 - 8 = 47.
        assert_eq!(scorer.score("love turned to hate").await, 47);
    }

    #[tokio::test]
    async fn test_score_clamps_to_range() {
        let scorer = local_scorer();
        let grim = "hate hate hate hate hate hate hate hate";
        assert_eq!(scorer.score(grim).await, 0);

        let glowing = "love joy peace hope grateful happy kind calm blessed thankful wonderful";
        assert_eq!(scorer.score(glowing).await, 100);
    }

    #[tokio::test]
    async fn test_hopeless_does_not_count_as_hope() {
        let scorer = local_scorer();
        // Word-boundary matching: "hopeless" is only a negative hit.
        assert_eq!(scorer.score("feeling hopeless").await, 42);
    }
}
