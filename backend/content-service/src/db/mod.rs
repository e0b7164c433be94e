//! Database access layer.
//!
//! The pipeline talks to persistence through the [`ContentStore`] trait so
//! the orchestrator, trending job and recommender can run against Postgres
//! in production and an in-memory store in tests.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    AnalyticsOverview, AuditLogEntry, ContentItem, ContentType, Element, ModerationOutcome,
    ModerationQueueEntry, ModerationStatus, PublishStatus, QueueStatus, TrendingRecord,
};

pub mod pg;

pub use pg::PgContentStore;

/// Upsert/read operations over the pipeline's entities.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Insert a freshly submitted content item (pending, under review).
    async fn insert_content(&self, item: &ContentItem) -> Result<()>;

    async fn get_content(
        &self,
        id: Uuid,
        content_type: ContentType,
    ) -> Result<Option<ContentItem>>;

    /// Persist a full automatic decision: element, raw blobs, positivity and
    /// both status columns in one row write.
    async fn apply_moderation_outcome(&self, outcome: &ModerationOutcome) -> Result<()>;

    /// Update only the status pair (human resolutions, failure parking).
    async fn update_statuses(
        &self,
        id: Uuid,
        content_type: ContentType,
        moderation_status: ModerationStatus,
        publish_status: PublishStatus,
    ) -> Result<()>;

    async fn insert_queue_entry(&self, entry: &ModerationQueueEntry) -> Result<()>;

    /// Queue entries ordered by priority then age.
    async fn list_queue(&self, status: Option<QueueStatus>) -> Result<Vec<ModerationQueueEntry>>;

    /// Mark all unresolved queue entries for a content item resolved.
    /// Returns how many entries changed; zero means resolution was already
    /// recorded (idempotent re-delivery).
    async fn resolve_queue_entries(
        &self,
        content_id: Uuid,
        content_type: ContentType,
        resolver: Uuid,
    ) -> Result<u64>;

    async fn insert_audit_entry(&self, entry: &AuditLogEntry) -> Result<()>;

    /// At most one trending record per (content id, content type).
    async fn upsert_trending(&self, record: &TrendingRecord) -> Result<()>;

    async fn top_trending(&self, element: Element, limit: i64) -> Result<Vec<TrendingRecord>>;

    /// Published items of an element, newest first.
    async fn list_published(&self, element: Element, limit: i64) -> Result<Vec<ContentItem>>;

    /// Auto-approved, published items of an element by raw view count.
    async fn top_viewed_published(&self, element: Element, limit: i64)
        -> Result<Vec<ContentItem>>;

    /// Re-join cached ids against current rows; unpublished ids drop out.
    async fn find_published_by_ids(&self, ids: &[Uuid]) -> Result<Vec<ContentItem>>;

    async fn record_view(&self, user_id: Uuid, content_id: Uuid) -> Result<()>;

    /// Most recently viewed content ids for a user, newest first.
    async fn recent_viewed_content_ids(&self, user_id: Uuid, limit: i64) -> Result<Vec<Uuid>>;

    async fn analytics_overview(&self) -> Result<AnalyticsOverview>;
}
