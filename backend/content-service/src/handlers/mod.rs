//! HTTP request handlers for the content pipeline.

pub mod analytics;
pub mod discovery;
pub mod moderation;

pub use analytics::{get_analytics_overview, AnalyticsHandlerState};
pub use discovery::{
    get_feed, get_recommendations, get_trending, track_view, DiscoveryHandlerState,
};
pub use moderation::{
    get_moderation_queue, resolve_content, submit_for_moderation, ModerationHandlerState,
};

use serde::Serialize;

use crate::models::ContentItem;
use crate::services::ranking::{visibility_tier, VisibilityTier};

/// Reader-facing view of a content item.
#[derive(Debug, Serialize)]
pub struct ContentSummary {
    pub id: uuid::Uuid,
    pub creator_id: uuid::Uuid,
    pub content_type: &'static str,
    pub title: String,
    pub element: Option<&'static str>,
    pub positivity_score: Option<i16>,
    pub visibility_tier: VisibilityTier,
    pub view_count: i64,
    pub engagement_count: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<&ContentItem> for ContentSummary {
    fn from(item: &ContentItem) -> Self {
        Self {
            id: item.id,
            creator_id: item.creator_id,
            content_type: item.content_type.as_str(),
            title: item.title.clone(),
            element: item.element.map(|e| e.as_str()),
            positivity_score: item.positivity_score,
            visibility_tier: visibility_tier(item.positivity_score),
            view_count: item.view_count,
            engagement_count: item.engagement_count,
            created_at: item.created_at,
        }
    }
}
