//! Visibility tiers and feed ordering.
//!
//! Pure functions over content items: no I/O, no randomness. Suppressed
//! items never leave this module.

use crate::models::ContentItem;

/// Coarse visibility bucket derived from the positivity score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityTier {
    Featured,
    Standard,
    Reduced,
    Suppressed,
}

impl VisibilityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisibilityTier::Featured => "featured",
            VisibilityTier::Standard => "standard",
            VisibilityTier::Reduced => "reduced",
            VisibilityTier::Suppressed => "suppressed",
        }
    }

    /// Sort rank, lower sorts first.
    fn rank(&self) -> u8 {
        match self {
            VisibilityTier::Featured => 0,
            VisibilityTier::Standard => 1,
            VisibilityTier::Reduced => 2,
            VisibilityTier::Suppressed => 3,
        }
    }
}

/// Tier for a positivity score. An absent score means the item has not been
/// scored yet and rides in the standard tier.
pub fn visibility_tier(positivity_score: Option<i16>) -> VisibilityTier {
    match positivity_score {
        None => VisibilityTier::Standard,
        Some(score) if score >= 90 => VisibilityTier::Featured,
        Some(score) if score >= 50 => VisibilityTier::Standard,
        Some(score) if score >= 30 => VisibilityTier::Reduced,
        Some(_) => VisibilityTier::Suppressed,
    }
}

/// Order feed items by tier, then recency within a tier. Suppressed items
/// are dropped.
pub fn rank_feed(items: Vec<ContentItem>) -> Vec<ContentItem> {
    let mut ranked: Vec<ContentItem> = items
        .into_iter()
        .filter(|item| visibility_tier(item.positivity_score) != VisibilityTier::Suppressed)
        .collect();

    ranked.sort_by(|a, b| {
        visibility_tier(a.positivity_score)
            .rank()
            .cmp(&visibility_tier(b.positivity_score).rank())
            .then_with(|| b.created_at.cmp(&a.created_at))
    });

    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentType, ModerationStatus, PublishStatus};
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn item(positivity: Option<i16>, age_minutes: i64) -> ContentItem {
        let created_at = Utc::now() - Duration::minutes(age_minutes);
        ContentItem {
            id: Uuid::new_v4(),
            creator_id: Uuid::new_v4(),
            content_type: ContentType::Post,
            title: "t".to_string(),
            description: None,
            body: None,
            media_key: None,
            element: None,
            moderation_status: ModerationStatus::AutoApproved,
            publish_status: PublishStatus::Published,
            positivity_score: positivity,
            view_count: 0,
            engagement_count: 0,
            classifier_result: None,
            safety_result: None,
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn test_tier_thresholds() {
        assert_eq!(visibility_tier(None), VisibilityTier::Standard);
        assert_eq!(visibility_tier(Some(100)), VisibilityTier::Featured);
        assert_eq!(visibility_tier(Some(90)), VisibilityTier::Featured);
        assert_eq!(visibility_tier(Some(89)), VisibilityTier::Standard);
        assert_eq!(visibility_tier(Some(50)), VisibilityTier::Standard);
        assert_eq!(visibility_tier(Some(49)), VisibilityTier::Reduced);
        assert_eq!(visibility_tier(Some(30)), VisibilityTier::Reduced);
        assert_eq!(visibility_tier(Some(29)), VisibilityTier::Suppressed);
        assert_eq!(visibility_tier(Some(0)), VisibilityTier::Suppressed);
    }

    #[test]
    fn test_suppressed_items_never_appear() {
        let ranked = rank_feed(vec![item(Some(10), 0), item(Some(29), 5), item(Some(95), 10)]);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].positivity_score, Some(95));
    }

    #[test]
    fn test_tier_order_beats_recency() {
        let fresh_reduced = item(Some(35), 1);
        let old_featured = item(Some(95), 600);
        let middling = item(Some(60), 30);

        let ranked = rank_feed(vec![
            fresh_reduced.clone(),
            old_featured.clone(),
            middling.clone(),
        ]);

        assert_eq!(ranked[0].id, old_featured.id);
        assert_eq!(ranked[1].id, middling.id);
        assert_eq!(ranked[2].id, fresh_reduced.id);
    }

    #[test]
    fn test_recency_breaks_ties_within_a_tier() {
        let older = item(Some(60), 120);
        let newer = item(Some(55), 5);

        let ranked = rank_feed(vec![older.clone(), newer.clone()]);
        assert_eq!(ranked[0].id, newer.id);
        assert_eq!(ranked[1].id, older.id);
    }

    #[test]
    fn test_unscored_items_ride_standard_tier() {
        let unscored = item(None, 1);
        let featured = item(Some(92), 60);

        let ranked = rank_feed(vec![unscored.clone(), featured.clone()]);
        assert_eq!(ranked[0].id, featured.id);
        assert_eq!(ranked[1].id, unscored.id);
    }
}
