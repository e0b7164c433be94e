//! Business logic layer for the content pipeline.
//!
//! - Classifier / safety screener / positivity scorer: external providers
//!   with local fallback policies
//! - Cost guard: spend tracking and request batching for paid classifiers
//! - Moderation: the orchestrator, decision policy and human resolution
//! - Trending / ranking / recommendation / feed: derived read paths

pub mod classifier;
pub mod cost_guard;
pub mod feed;
pub mod moderation;
pub mod positivity;
pub mod ranking;
pub mod recommendation;
pub mod safety;
pub mod trending;

// Re-export commonly used services
pub use classifier::{ElementClassifier, HttpClassificationProvider};
pub use cost_guard::{ClassificationBatcher, CostTracker};
pub use feed::FeedService;
pub use moderation::ModerationService;
pub use positivity::{HttpPositivityProvider, PositivityScorer};
pub use recommendation::RecommendationService;
pub use safety::{HttpSafetyProvider, SafetyScreener};
pub use trending::TrendingCalculator;
