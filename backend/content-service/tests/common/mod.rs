//! Shared test support: an in-memory `ContentStore` and canned external
//! providers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use content_service::cache::{FeedCache, RecommendationCache};
use content_service::db::ContentStore;
use content_service::error::{AppError, Result};
use content_service::models::{
    AnalyticsOverview, AuditLogEntry, ContentItem, ContentType, Element, ModerationOutcome,
    ModerationQueueEntry, ModerationStatus, PublishStatus, QueueStatus, TrendingRecord,
};
use content_service::services::safety::SafetyProvider;
use content_service::services::{
    CostTracker, ElementClassifier, ModerationService, PositivityScorer, SafetyScreener,
};

#[derive(Default)]
pub struct MemoryStore {
    content: Mutex<HashMap<(Uuid, ContentType), ContentItem>>,
    queue: Mutex<Vec<ModerationQueueEntry>>,
    trending: Mutex<HashMap<(Uuid, ContentType), TrendingRecord>>,
    audit: Mutex<Vec<AuditLogEntry>>,
    views: Mutex<Vec<(Uuid, Uuid, DateTime<Utc>)>>,
    /// Make `apply_moderation_outcome` fail, to drive the dead-letter path.
    pub fail_apply: AtomicBool,
    /// Make audit writes fail, to check they stay advisory.
    pub fail_audit: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn audit_entries(&self) -> Vec<AuditLogEntry> {
        self.audit.lock().unwrap().clone()
    }

    pub fn queue_entries(&self) -> Vec<ModerationQueueEntry> {
        self.queue.lock().unwrap().clone()
    }

    pub fn trending_records(&self) -> Vec<TrendingRecord> {
        self.trending.lock().unwrap().values().cloned().collect()
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn insert_content(&self, item: &ContentItem) -> Result<()> {
        self.content
            .lock()
            .unwrap()
            .insert((item.id, item.content_type), item.clone());
        Ok(())
    }

    async fn get_content(
        &self,
        id: Uuid,
        content_type: ContentType,
    ) -> Result<Option<ContentItem>> {
        Ok(self.content.lock().unwrap().get(&(id, content_type)).cloned())
    }

    async fn apply_moderation_outcome(&self, outcome: &ModerationOutcome) -> Result<()> {
        if self.fail_apply.load(Ordering::SeqCst) {
            return Err(AppError::Internal("simulated store failure".into()));
        }

        let mut content = self.content.lock().unwrap();
        let item = content
            .get_mut(&(outcome.content_id, outcome.content_type))
            .ok_or_else(|| AppError::NotFound("content".into()))?;
        item.element = outcome.element;
        item.positivity_score = outcome.positivity_score;
        item.classifier_result = Some(outcome.classifier_result.clone());
        item.safety_result = Some(outcome.safety_result.clone());
        item.moderation_status = outcome.moderation_status;
        item.publish_status = outcome.publish_status;
        item.updated_at = Utc::now();
        Ok(())
    }

    async fn update_statuses(
        &self,
        id: Uuid,
        content_type: ContentType,
        moderation_status: ModerationStatus,
        publish_status: PublishStatus,
    ) -> Result<()> {
        let mut content = self.content.lock().unwrap();
        let item = content
            .get_mut(&(id, content_type))
            .ok_or_else(|| AppError::NotFound("content".into()))?;
        item.moderation_status = moderation_status;
        item.publish_status = publish_status;
        item.updated_at = Utc::now();
        Ok(())
    }

    async fn insert_queue_entry(&self, entry: &ModerationQueueEntry) -> Result<()> {
        self.queue.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn list_queue(&self, status: Option<QueueStatus>) -> Result<Vec<ModerationQueueEntry>> {
        let mut entries: Vec<ModerationQueueEntry> = self
            .queue
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| status.map_or(true, |s| entry.status == s))
            .cloned()
            .collect();
        entries.sort_by(|a, b| {
            a.priority
                .rank()
                .cmp(&b.priority.rank())
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(entries)
    }

    async fn resolve_queue_entries(
        &self,
        content_id: Uuid,
        content_type: ContentType,
        resolver: Uuid,
    ) -> Result<u64> {
        let mut resolved = 0u64;
        for entry in self.queue.lock().unwrap().iter_mut() {
            if entry.content_id == content_id
                && entry.content_type == content_type
                && entry.status != QueueStatus::Resolved
            {
                entry.status = QueueStatus::Resolved;
                entry.resolved_by = Some(resolver);
                entry.resolved_at = Some(Utc::now());
                resolved += 1;
            }
        }
        Ok(resolved)
    }

    async fn insert_audit_entry(&self, entry: &AuditLogEntry) -> Result<()> {
        if self.fail_audit.load(Ordering::SeqCst) {
            return Err(AppError::Internal("simulated audit failure".into()));
        }
        self.audit.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn upsert_trending(&self, record: &TrendingRecord) -> Result<()> {
        self.trending
            .lock()
            .unwrap()
            .insert((record.content_id, record.content_type), record.clone());
        Ok(())
    }

    async fn top_trending(&self, element: Element, limit: i64) -> Result<Vec<TrendingRecord>> {
        let mut records: Vec<TrendingRecord> = self
            .trending
            .lock()
            .unwrap()
            .values()
            .filter(|record| record.element == element)
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        records.truncate(limit as usize);
        Ok(records)
    }

    async fn list_published(&self, element: Element, limit: i64) -> Result<Vec<ContentItem>> {
        let mut items: Vec<ContentItem> = self
            .content
            .lock()
            .unwrap()
            .values()
            .filter(|item| {
                item.element == Some(element) && item.publish_status == PublishStatus::Published
            })
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        items.truncate(limit as usize);
        Ok(items)
    }

    async fn top_viewed_published(
        &self,
        element: Element,
        limit: i64,
    ) -> Result<Vec<ContentItem>> {
        let mut items: Vec<ContentItem> = self
            .content
            .lock()
            .unwrap()
            .values()
            .filter(|item| {
                item.element == Some(element)
                    && item.publish_status == PublishStatus::Published
                    && item.moderation_status == ModerationStatus::AutoApproved
            })
            .cloned()
            .collect();
        items.sort_by(|a, b| b.view_count.cmp(&a.view_count));
        items.truncate(limit as usize);
        Ok(items)
    }

    async fn find_published_by_ids(&self, ids: &[Uuid]) -> Result<Vec<ContentItem>> {
        let content = self.content.lock().unwrap();
        Ok(content
            .values()
            .filter(|item| {
                ids.contains(&item.id) && item.publish_status == PublishStatus::Published
            })
            .cloned()
            .collect())
    }

    async fn record_view(&self, user_id: Uuid, content_id: Uuid) -> Result<()> {
        self.views
            .lock()
            .unwrap()
            .push((user_id, content_id, Utc::now()));
        Ok(())
    }

    async fn recent_viewed_content_ids(&self, user_id: Uuid, limit: i64) -> Result<Vec<Uuid>> {
        let mut views: Vec<(Uuid, DateTime<Utc>)> = self
            .views
            .lock()
            .unwrap()
            .iter()
            .filter(|(viewer, _, _)| *viewer == user_id)
            .map(|(_, content_id, at)| (*content_id, *at))
            .collect();
        views.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(views
            .into_iter()
            .take(limit as usize)
            .map(|(id, _)| id)
            .collect())
    }

    async fn analytics_overview(&self) -> Result<AnalyticsOverview> {
        let content = self.content.lock().unwrap();
        let count_moderation = |status: ModerationStatus| {
            content
                .values()
                .filter(|item| item.moderation_status == status)
                .count() as i64
        };
        let count_publish = |status: PublishStatus| {
            content
                .values()
                .filter(|item| item.publish_status == status)
                .count() as i64
        };

        let auto_approved = count_moderation(ModerationStatus::AutoApproved);
        let requires_review = count_moderation(ModerationStatus::RequiresReview);
        let rejected = count_moderation(ModerationStatus::Rejected);
        let decided = auto_approved + requires_review + rejected;

        let scored: Vec<i64> = content
            .values()
            .filter_map(|item| item.positivity_score.map(|s| s as i64))
            .collect();
        let average_positivity = if scored.is_empty() {
            None
        } else {
            Some(scored.iter().sum::<i64>() as f64 / scored.len() as f64)
        };

        Ok(AnalyticsOverview {
            total_content: content.len() as i64,
            published: count_publish(PublishStatus::Published),
            under_review: count_publish(PublishStatus::UnderReview),
            flagged: count_publish(PublishStatus::Flagged),
            auto_approved,
            requires_review,
            rejected,
            pending_queue_entries: self
                .queue
                .lock()
                .unwrap()
                .iter()
                .filter(|entry| entry.status == QueueStatus::Pending)
                .count() as i64,
            approval_rate: if decided > 0 {
                auto_approved as f64 / decided as f64
            } else {
                0.0
            },
            average_positivity,
        })
    }
}

/// Safety provider returning a fixed flag set.
pub struct StaticSafetyProvider {
    pub flags: Vec<String>,
}

#[async_trait]
impl SafetyProvider for StaticSafetyProvider {
    async fn screen(&self, _text: &str) -> Result<Vec<String>> {
        Ok(self.flags.clone())
    }
}

/// Safety provider simulating an unreachable service.
pub struct FailingSafetyProvider;

#[async_trait]
impl SafetyProvider for FailingSafetyProvider {
    async fn screen(&self, _text: &str) -> Result<Vec<String>> {
        Err(AppError::ExternalService("connection refused".into()))
    }
}

/// A pending item as the content-creation collaborator would persist it.
pub fn pending_item(content_type: ContentType, title: &str, body: Option<&str>) -> ContentItem {
    let now = Utc::now();
    ContentItem {
        id: Uuid::new_v4(),
        creator_id: Uuid::new_v4(),
        content_type,
        title: title.to_string(),
        description: None,
        body: body.map(String::from),
        media_key: matches!(content_type, ContentType::Video).then(|| "videos/raw".to_string()),
        element: None,
        moderation_status: ModerationStatus::Pending,
        publish_status: PublishStatus::UnderReview,
        positivity_score: None,
        view_count: 0,
        engagement_count: 0,
        classifier_result: None,
        safety_result: None,
        created_at: now,
        updated_at: now,
    }
}

/// A published, auto-approved item for read-path tests.
pub fn published_item(
    element: Element,
    views: i64,
    engagement: i64,
    positivity: Option<i16>,
    age_hours: i64,
) -> ContentItem {
    let created_at = Utc::now() - Duration::hours(age_hours);
    ContentItem {
        id: Uuid::new_v4(),
        creator_id: Uuid::new_v4(),
        content_type: ContentType::Video,
        title: format!("{} video", element.as_str()),
        description: None,
        body: None,
        media_key: Some("videos/ready".to_string()),
        element: Some(element),
        moderation_status: ModerationStatus::AutoApproved,
        publish_status: PublishStatus::Published,
        positivity_score: positivity,
        view_count: views,
        engagement_count: engagement,
        classifier_result: None,
        safety_result: None,
        created_at,
        updated_at: created_at,
    }
}

/// Wire a moderation service over the in-memory store with the given safety
/// provider; classifier and positivity always run their local fallbacks.
pub fn moderation_service(
    store: Arc<MemoryStore>,
    safety_provider: Option<Arc<dyn SafetyProvider>>,
) -> (Arc<ModerationService>, Arc<FeedCache>, Arc<RecommendationCache>) {
    let feed_cache = Arc::new(FeedCache::new(120));
    let recommendation_cache = Arc::new(RecommendationCache::new(4 * 60 * 60));

    let classifier = Arc::new(ElementClassifier::new(
        None,
        Arc::new(CostTracker::new(50.0, 24 * 60 * 60)),
    ));
    let screener = Arc::new(SafetyScreener::new(safety_provider));
    let scorer = Arc::new(PositivityScorer::new(None));

    let service = Arc::new(ModerationService::new(
        store,
        classifier,
        screener,
        scorer,
        feed_cache.clone(),
        recommendation_cache.clone(),
        0.5,
    ));

    (service, feed_cache, recommendation_cache)
}
