//! Hybrid per-user recommendations.
//!
//! Cache-aside over the in-memory recommendation cache keyed by
//! (user, element). A miss pulls a popularity pool, weights it by
//! positivity, penalizes already-viewed items, boosts fresh ones, and adds
//! a small random jitter so repeated recomputations vary.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use uuid::Uuid;

use crate::cache::RecommendationCache;
use crate::db::ContentStore;
use crate::error::Result;
use crate::models::{ContentItem, Element};
use crate::services::trending::positivity_multiplier;

const VIEW_WEIGHT: f64 = 0.3;
const SEEN_PENALTY: f64 = 0.1;
const FRESH_24H_BOOST: f64 = 1.5;
const FRESH_72H_BOOST: f64 = 1.2;
const RECOMMENDATION_BASIS: &str = "hybrid";

pub struct RecommendationService {
    store: Arc<dyn ContentStore>,
    cache: Arc<RecommendationCache>,
    pool_multiplier: usize,
    view_history_limit: i64,
}

impl RecommendationService {
    pub fn new(
        store: Arc<dyn ContentStore>,
        cache: Arc<RecommendationCache>,
        pool_multiplier: usize,
        view_history_limit: i64,
    ) -> Self {
        Self {
            store,
            cache,
            pool_multiplier: pool_multiplier.max(1),
            view_history_limit,
        }
    }

    pub async fn get_recommendations(
        &self,
        user_id: Uuid,
        element: Element,
        limit: usize,
    ) -> Result<Vec<ContentItem>> {
        if let Some(cached) = self.cache.read(user_id, element) {
            let items = self
                .store
                .find_published_by_ids(&cached.content_ids)
                .await?;
            return Ok(order_by_ids(items, &cached.content_ids));
        }

        let pool = self
            .store
            .top_viewed_published(element, (limit * self.pool_multiplier) as i64)
            .await?;
        let viewed: HashSet<Uuid> = self
            .store
            .recent_viewed_content_ids(user_id, self.view_history_limit)
            .await?
            .into_iter()
            .collect();

        let now = Utc::now();
        let mut rng = rand::thread_rng();
        let mut scored: Vec<(f64, ContentItem)> = pool
            .into_iter()
            .map(|item| {
                let jitter = rng.gen_range(0.8..1.2);
                let score = score_candidate(&item, &viewed, now) * jitter;
                (score, item)
            })
            .collect();

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0).unwrap_or_else(|| {
                tracing::warn!("Encountered NaN recommendation score, treating as equal");
                std::cmp::Ordering::Equal
            })
        });

        let items: Vec<ContentItem> = scored
            .into_iter()
            .take(limit)
            .map(|(_, item)| item)
            .collect();
        let ids: Vec<Uuid> = items.iter().map(|item| item.id).collect();
        self.cache
            .write(user_id, element, ids, RECOMMENDATION_BASIS);

        Ok(items)
    }
}

/// Popularity × positivity × repeat-penalty × recency. The random jitter is
/// applied by the caller so this stays deterministic and testable.
fn score_candidate(item: &ContentItem, viewed: &HashSet<Uuid>, now: DateTime<Utc>) -> f64 {
    let mut score = item.view_count as f64 * VIEW_WEIGHT;
    score *= positivity_multiplier(item.positivity_score);

    if viewed.contains(&item.id) {
        // Strong but not absolute suppression of repeats.
        score *= SEEN_PENALTY;
    }

    let age = now - item.created_at;
    if age < Duration::hours(24) {
        score *= FRESH_24H_BOOST;
    } else if age < Duration::hours(72) {
        score *= FRESH_72H_BOOST;
    }

    score
}

/// Re-order a joined result set to match the cached id order.
fn order_by_ids(items: Vec<ContentItem>, ids: &[Uuid]) -> Vec<ContentItem> {
    let positions: HashMap<Uuid, usize> =
        ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
    let mut items = items;
    items.sort_by_key(|item| positions.get(&item.id).copied().unwrap_or(usize::MAX));
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentType, ModerationStatus, PublishStatus};

    fn item(views: i64, positivity: Option<i16>, age_hours: i64) -> ContentItem {
        let created_at = Utc::now() - Duration::hours(age_hours);
        ContentItem {
            id: Uuid::new_v4(),
            creator_id: Uuid::new_v4(),
            content_type: ContentType::Video,
            title: "t".to_string(),
            description: None,
            body: None,
            media_key: None,
            element: Some(Element::Water),
            moderation_status: ModerationStatus::AutoApproved,
            publish_status: PublishStatus::Published,
            positivity_score: positivity,
            view_count: views,
            engagement_count: 0,
            classifier_result: None,
            safety_result: None,
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn test_score_components() {
        let now = Utc::now();
        let none: HashSet<Uuid> = HashSet::new();

        // 1000 views, no positivity, older than 72h: 1000 * 0.3 = 300.
        let old = item(1000, None, 100);
        assert!((score_candidate(&old, &none, now) - 300.0).abs() < 1e-6);

        // Featured-grade positivity triples it.
        let uplifting = item(1000, Some(95), 100);
        assert!((score_candidate(&uplifting, &none, now) - 900.0).abs() < 1e-6);

        // Fresh content inside 24h gets a 1.5x boost.
        let fresh = item(1000, None, 1);
        assert!((score_candidate(&fresh, &none, now) - 450.0).abs() < 1e-6);

        // 24-72h old content gets 1.2x.
        let recent = item(1000, None, 48);
        assert!((score_candidate(&recent, &none, now) - 360.0).abs() < 1e-6);
    }

    #[test]
    fn test_seen_penalty() {
        let now = Utc::now();
        let candidate = item(1000, None, 100);
        let viewed: HashSet<Uuid> = [candidate.id].into_iter().collect();

        let unseen_score = score_candidate(&candidate, &HashSet::new(), now);
        let seen_score = score_candidate(&candidate, &viewed, now);
        assert!((seen_score - unseen_score * 0.1).abs() < 1e-6);
        assert!(seen_score > 0.0);
    }

    #[test]
    fn test_order_by_ids_preserves_cached_order() {
        let a = item(1, None, 1);
        let b = item(2, None, 1);
        let c = item(3, None, 1);
        let ids = vec![c.id, a.id, b.id];

        let ordered = order_by_ids(vec![a.clone(), b.clone(), c.clone()], &ids);
        assert_eq!(ordered[0].id, c.id);
        assert_eq!(ordered[1].id, a.id);
        assert_eq!(ordered[2].id, b.id);
    }
}
