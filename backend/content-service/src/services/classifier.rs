//! Element classification for submitted content.
//!
//! Classification prefers the external provider (batched through the budget
//! guard) and degrades to a deterministic keyword heuristic on any failure,
//! missing configuration, or budget block. The classifier never errors: the
//! pipeline always gets an element.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::config::AiEndpoint;
use crate::error::{AppError, Result};
use crate::metrics::pipeline::BUDGET_BLOCKS_TOTAL;
use crate::models::Element;
use crate::services::cost_guard::{ClassificationBatcher, CostTracker};

/// Per-element keyword tables for the local fallback.
const ELEMENT_KEYWORDS: &[(Element, &[&str])] = &[
    (
        Element::Water,
        &[
            "water", "ocean", "sea", "river", "lake", "rain", "wave", "swim", "flow", "tide",
        ],
    ),
    (
        Element::Fire,
        &[
            "fire", "flame", "burn", "heat", "sun", "spark", "passion", "energy", "blaze", "ember",
        ],
    ),
    (
        Element::Earth,
        &[
            "earth", "ground", "mountain", "forest", "tree", "garden", "soil", "nature", "stone",
            "root",
        ],
    ),
    (
        Element::Air,
        &[
            "air", "wind", "sky", "breath", "breathe", "cloud", "flight", "bird", "breeze",
            "storm",
        ],
    ),
    (
        Element::Spiritual,
        &[
            "spirit",
            "spiritual",
            "soul",
            "meditation",
            "meditate",
            "prayer",
            "mindful",
            "mindfulness",
            "gratitude",
            "zen",
        ],
    ),
];

/// Confidence reported for a keyword-based fallback classification.
const KEYWORD_CONFIDENCE: f32 = 0.3;

/// Confidence reported when no keyword matched and the element was drawn at
/// random. Below the keyword confidence so consumers can tell the two
/// fallback modes apart.
const RANDOM_CONFIDENCE: f32 = 0.2;

/// Raw result from the external classification service.
#[derive(Debug, Clone)]
pub struct ExternalClassification {
    pub element: Element,
    pub confidence: f32,
    pub rationale: String,
}

/// How a classification was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    External,
    Keyword,
    Random,
}

impl ClassificationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationSource::External => "external",
            ClassificationSource::Keyword => "keyword",
            ClassificationSource::Random => "random",
        }
    }
}

/// Final classification handed to the orchestrator.
#[derive(Debug, Clone)]
pub struct Classification {
    pub element: Element,
    pub confidence: f32,
    pub rationale: String,
    pub source: ClassificationSource,
}

/// External classification service client contract.
#[async_trait]
pub trait ClassificationProvider: Send + Sync {
    async fn classify(&self, text: &str) -> Result<ExternalClassification>;

    /// Batch entry point used by the budget guard's batcher. Providers
    /// without a native batch API process jobs sequentially.
    async fn classify_batch(&self, texts: &[String]) -> Result<Vec<ExternalClassification>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.classify(text).await?);
        }
        Ok(results)
    }

    fn model(&self) -> &str;
}

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    model: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct ClassifyResponse {
    element: String,
    confidence: f32,
    #[serde(default)]
    rationale: Option<String>,
}

/// JSON-over-HTTP classification provider.
pub struct HttpClassificationProvider {
    client: reqwest::Client,
    endpoint: AiEndpoint,
}

impl HttpClassificationProvider {
    pub fn new(endpoint: AiEndpoint, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl ClassificationProvider for HttpClassificationProvider {
    async fn classify(&self, text: &str) -> Result<ExternalClassification> {
        let request = ClassifyRequest {
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
                "classifier returned {}",
                response.status()
            )));
        }

        let parsed: ClassifyResponse = response.json().await?;
        let element = Element::parse(&parsed.element).ok_or_else(|| {
            AppError::ExternalService(format!(
                "classifier returned unknown element: {}",
                parsed.element
            ))
        })?;

        Ok(ExternalClassification {
            element,
            confidence: parsed.confidence.clamp(0.0, 1.0),
            rationale: parsed.rationale.unwrap_or_default(),
        })
    }

    fn model(&self) -> &str {
        &self.endpoint.model
    }
}

/// Classifies content into the five-element taxonomy.
pub struct ElementClassifier {
    batcher: Option<Arc<ClassificationBatcher>>,
    cost: Arc<CostTracker>,
}

impl ElementClassifier {
    pub fn new(batcher: Option<Arc<ClassificationBatcher>>, cost: Arc<CostTracker>) -> Self {
        Self { batcher, cost }
    }

    /// Classify text. Infallible: every failure path lands on the keyword
    /// heuristic.
    pub async fn classify(&self, text: &str) -> Classification {
        if let Some(batcher) = &self.batcher {
            if self.cost.should_block() {
                BUDGET_BLOCKS_TOTAL.inc();
                tracing::warn!(
                    spend = self.cost.current_spend(),
                    limit = self.cost.limit_usd(),
                    "Classification budget exhausted; using keyword fallback"
                );
            } else {
                if self.cost.should_warn() {
                    tracing::warn!(
                        spend = self.cost.current_spend(),
                        limit = self.cost.limit_usd(),
                        "Classification spend is at 90% of the budget"
                    );
                }
                match batcher.classify(text).await {
                    Ok(external) => {
                        return Classification {
                            element: external.element,
                            confidence: external.confidence,
                            rationale: external.rationale,
                            source: ClassificationSource::External,
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "External classification failed; using keyword fallback");
                    }
                }
            }
        }

        self.classify_by_keywords(text)
    }

    /// Deterministic keyword scoring; uniform random pick when nothing
    /// matches.
    fn classify_by_keywords(&self, text: &str) -> Classification {
        let words = tokenize(text);

        let mut best: Option<(Element, usize, Vec<&str>)> = None;
        for (element, keywords) in ELEMENT_KEYWORDS {
            let mut matched = Vec::new();
            let mut hits = 0usize;
            for keyword in *keywords {
                let count = words.iter().filter(|word| word == keyword).count();
                if count > 0 {
                    matched.push(*keyword);
                    hits += count;
                }
            }
            if hits > 0 {
                let replace = match &best {
                    Some((_, best_hits, _)) => hits > *best_hits,
                    None => true,
                };
                if replace {
                    best = Some((*element, hits, matched));
                }
            }
        }

        match best {
            Some((element, _, matched)) => Classification {
                element,
                confidence: KEYWORD_CONFIDENCE,
                rationale: format!("keyword match: {}", matched.join(", ")),
                source: ClassificationSource::Keyword,
            },
            None => {
                let mut rng = rand::thread_rng();
                let element = *Element::ALL.choose(&mut rng).unwrap_or(&Element::Spiritual);
                Classification {
                    element,
                    confidence: RANDOM_CONFIDENCE,
                    rationale: "random assignment (no keyword matches)".to_string(),
                    source: ClassificationSource::Random,
                }
            }
        }
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_classifier() -> ElementClassifier {
        ElementClassifier::new(None, Arc::new(CostTracker::new(50.0, 24 * 60 * 60)))
    }

    #[tokio::test]
    async fn test_keyword_match_wins() {
        let classifier = local_classifier();
        let result = classifier
            .classify("Cold morning swim in the ocean, the waves and the tide were perfect")
            .await;

        assert_eq!(result.element, Element::Water);
        assert_eq!(result.source, ClassificationSource::Keyword);
        assert!((result.confidence - 0.3).abs() < f32::EPSILON);
        assert!(result.rationale.contains("ocean"));
    }

    #[tokio::test]
    async fn test_highest_scoring_element_is_picked() {
        let classifier = local_classifier();
        // One fire hit, two air hits.
        let result = classifier.classify("sun in the sky, wind on my face").await;
        assert_eq!(result.element, Element::Air);
    }

    #[tokio::test]
    async fn test_no_keywords_falls_back_to_random() {
        let classifier = local_classifier();
        let result = classifier.classify("I hate everything, it's hopeless").await;

        assert!(Element::ALL.contains(&result.element));
        assert_eq!(result.source, ClassificationSource::Random);
        assert!((result.confidence - 0.2).abs() < f32::EPSILON);
        assert!(result.rationale.contains("random assignment"));
    }

    #[test]
    fn test_tokenize_strips_punctuation() {
        let words = tokenize("Water, fire... and AIR!");
        assert_eq!(words, vec!["water", "fire", "and", "air"]);
    }
}
