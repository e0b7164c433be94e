//! Trending score computation.
//!
//! Blends views and engagement, then multiplies by a positivity factor so
//! uplifting content trends harder. Recomputation is idempotent: the same
//! inputs always produce the same score and exactly one record per
//! (content id, content type).

use std::sync::Arc;

use chrono::Utc;

use crate::db::ContentStore;
use crate::error::Result;
use crate::models::{ContentItem, Element, TrendingRecord};

const VIEW_WEIGHT: f64 = 0.6;
const ENGAGEMENT_WEIGHT: f64 = 0.4;

/// Positivity multiplier applied to trending and recommendation scores.
/// Skipped (1.0) when the item has not been scored.
pub fn positivity_multiplier(positivity_score: Option<i16>) -> f64 {
    match positivity_score {
        None => 1.0,
        Some(score) if score >= 90 => 3.0,
        Some(score) if score >= 70 => 1.5,
        Some(score) if score >= 50 => 1.0,
        Some(_) => 0.5,
    }
}

/// Raw trending score for a set of counters.
pub fn trending_score(views: i64, engagement: i64, positivity_score: Option<i16>) -> f64 {
    let base = views as f64 * VIEW_WEIGHT + engagement as f64 * ENGAGEMENT_WEIGHT;
    base * positivity_multiplier(positivity_score)
}

/// Periodic batch job body: recompute trend records for all published
/// content, one element at a time.
pub struct TrendingCalculator {
    store: Arc<dyn ContentStore>,
    max_per_element: i64,
}

impl TrendingCalculator {
    pub fn new(store: Arc<dyn ContentStore>, max_per_element: i64) -> Self {
        Self {
            store,
            max_per_element,
        }
    }

    /// Recompute every published item's trend record. Returns how many
    /// records were written.
    pub async fn recompute_all(&self) -> Result<usize> {
        let mut written = 0usize;

        for element in Element::ALL {
            let items = self.store.list_published(element, self.max_per_element).await?;
            for item in &items {
                let record = Self::record_for(element, item);
                self.store.upsert_trending(&record).await?;
                written += 1;
            }
            tracing::debug!(
                element = element.as_str(),
                items = items.len(),
                "Recomputed trending records"
            );
        }

        Ok(written)
    }

    fn record_for(element: Element, item: &ContentItem) -> TrendingRecord {
        TrendingRecord {
            content_id: item.id,
            content_type: item.content_type,
            element,
            score: trending_score(item.view_count, item.engagement_count, item.positivity_score),
            views_24h: item.view_count,
            engagement_24h: item.engagement_count,
            last_updated: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiplier_boundaries() {
        assert_eq!(positivity_multiplier(None), 1.0);
        assert_eq!(positivity_multiplier(Some(90)), 3.0);
        assert_eq!(positivity_multiplier(Some(89)), 1.5);
        assert_eq!(positivity_multiplier(Some(70)), 1.5);
        assert_eq!(positivity_multiplier(Some(69)), 1.0);
        assert_eq!(positivity_multiplier(Some(50)), 1.0);
        assert_eq!(positivity_multiplier(Some(49)), 0.5);
        assert_eq!(positivity_multiplier(Some(0)), 0.5);
    }

    #[test]
    fn test_score_blend() {
        // 100 views, 50 engagements, unscored: 100*0.6 + 50*0.4 = 80.
        assert!((trending_score(100, 50, None) - 80.0).abs() < f64::EPSILON);
        // Same counters with a featured-grade score triple to 240.
        assert!((trending_score(100, 50, Some(95)) - 240.0).abs() < f64::EPSILON);
        // Low positivity halves the base.
        assert!((trending_score(100, 50, Some(20)) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_score_is_deterministic() {
        let a = trending_score(1234, 567, Some(72));
        let b = trending_score(1234, 567, Some(72));
        assert_eq!(a, b);
    }
}
