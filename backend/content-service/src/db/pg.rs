//! PostgreSQL implementation of [`ContentStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::db::ContentStore;
use crate::error::{AppError, Result};
use crate::models::{
    AnalyticsOverview, AuditLogEntry, ContentItem, ContentType, Element, ModerationOutcome,
    ModerationQueueEntry, ModerationStatus, PublishStatus, QueuePriority, QueueStatus,
    TrendingRecord,
};

const CONTENT_COLUMNS: &str = "id, creator_id, content_type, title, description, body, \
     media_key, element, moderation_status, publish_status, positivity_score, \
     view_count, engagement_count, classifier_result, safety_result, created_at, updated_at";

pub struct PgContentStore {
    pool: PgPool,
}

impl PgContentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ContentRow {
    id: Uuid,
    creator_id: Uuid,
    content_type: String,
    title: String,
    description: Option<String>,
    body: Option<String>,
    media_key: Option<String>,
    element: Option<String>,
    moderation_status: String,
    publish_status: String,
    positivity_score: Option<i16>,
    view_count: i64,
    engagement_count: i64,
    classifier_result: Option<Value>,
    safety_result: Option<Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ContentRow> for ContentItem {
    type Error = AppError;

    fn try_from(row: ContentRow) -> Result<Self> {
        let element = match row.element.as_deref() {
            Some(raw) => Some(
                Element::parse(raw)
                    .ok_or_else(|| AppError::Internal(format!("unknown element: {}", raw)))?,
            ),
            None => None,
        };

        Ok(ContentItem {
            id: row.id,
            creator_id: row.creator_id,
            content_type: parse_content_type(&row.content_type)?,
            title: row.title,
            description: row.description,
            body: row.body,
            media_key: row.media_key,
            element,
            moderation_status: ModerationStatus::parse(&row.moderation_status).ok_or_else(
                || {
                    AppError::Internal(format!(
                        "unknown moderation status: {}",
                        row.moderation_status
                    ))
                },
            )?,
            publish_status: PublishStatus::parse(&row.publish_status).ok_or_else(|| {
                AppError::Internal(format!("unknown publish status: {}", row.publish_status))
            })?,
            positivity_score: row.positivity_score,
            view_count: row.view_count,
            engagement_count: row.engagement_count,
            classifier_result: row.classifier_result,
            safety_result: row.safety_result,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct QueueRow {
    id: Uuid,
    content_id: Uuid,
    content_type: String,
    priority: String,
    status: String,
    flagged_reason: String,
    created_at: DateTime<Utc>,
    resolved_by: Option<Uuid>,
    resolved_at: Option<DateTime<Utc>>,
}

impl TryFrom<QueueRow> for ModerationQueueEntry {
    type Error = AppError;

    fn try_from(row: QueueRow) -> Result<Self> {
        Ok(ModerationQueueEntry {
            id: row.id,
            content_id: row.content_id,
            content_type: parse_content_type(&row.content_type)?,
            priority: QueuePriority::parse(&row.priority).ok_or_else(|| {
                AppError::Internal(format!("unknown queue priority: {}", row.priority))
            })?,
            status: QueueStatus::parse(&row.status).ok_or_else(|| {
                AppError::Internal(format!("unknown queue status: {}", row.status))
            })?,
            flagged_reason: row.flagged_reason,
            created_at: row.created_at,
            resolved_by: row.resolved_by,
            resolved_at: row.resolved_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TrendingRow {
    content_id: Uuid,
    content_type: String,
    element: String,
    score: f64,
    views_24h: i64,
    engagement_24h: i64,
    last_updated: DateTime<Utc>,
}

impl TryFrom<TrendingRow> for TrendingRecord {
    type Error = AppError;

    fn try_from(row: TrendingRow) -> Result<Self> {
        Ok(TrendingRecord {
            content_id: row.content_id,
            content_type: parse_content_type(&row.content_type)?,
            element: Element::parse(&row.element)
                .ok_or_else(|| AppError::Internal(format!("unknown element: {}", row.element)))?,
            score: row.score,
            views_24h: row.views_24h,
            engagement_24h: row.engagement_24h,
            last_updated: row.last_updated,
        })
    }
}

fn parse_content_type(raw: &str) -> Result<ContentType> {
    ContentType::parse(raw)
        .ok_or_else(|| AppError::Internal(format!("unknown content type: {}", raw)))
}

#[async_trait]
impl ContentStore for PgContentStore {
    async fn insert_content(&self, item: &ContentItem) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO content_items
                (id, creator_id, content_type, title, description, body, media_key,
                 element, moderation_status, publish_status, positivity_score,
                 view_count, engagement_count, classifier_result, safety_result,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(item.id)
        .bind(item.creator_id)
        .bind(item.content_type.as_str())
        .bind(&item.title)
        .bind(&item.description)
        .bind(&item.body)
        .bind(&item.media_key)
        .bind(item.element.map(|e| e.as_str()))
        .bind(item.moderation_status.as_str())
        .bind(item.publish_status.as_str())
        .bind(item.positivity_score)
        .bind(item.view_count)
        .bind(item.engagement_count)
        .bind(&item.classifier_result)
        .bind(&item.safety_result)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_content(
        &self,
        id: Uuid,
        content_type: ContentType,
    ) -> Result<Option<ContentItem>> {
        let row = sqlx::query_as::<_, ContentRow>(&format!(
            "SELECT {} FROM content_items WHERE id = $1 AND content_type = $2",
            CONTENT_COLUMNS
        ))
        .bind(id)
        .bind(content_type.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(ContentItem::try_from).transpose()
    }

    async fn apply_moderation_outcome(&self, outcome: &ModerationOutcome) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE content_items
            SET element = $1,
                positivity_score = $2,
                classifier_result = $3,
                safety_result = $4,
                moderation_status = $5,
                publish_status = $6,
                updated_at = NOW()
            WHERE id = $7 AND content_type = $8
            "#,
        )
        .bind(outcome.element.map(|e| e.as_str()))
        .bind(outcome.positivity_score)
        .bind(&outcome.classifier_result)
        .bind(&outcome.safety_result)
        .bind(outcome.moderation_status.as_str())
        .bind(outcome.publish_status.as_str())
        .bind(outcome.content_id)
        .bind(outcome.content_type.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_statuses(
        &self,
        id: Uuid,
        content_type: ContentType,
        moderation_status: ModerationStatus,
        publish_status: PublishStatus,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE content_items
            SET moderation_status = $1, publish_status = $2, updated_at = NOW()
            WHERE id = $3 AND content_type = $4
            "#,
        )
        .bind(moderation_status.as_str())
        .bind(publish_status.as_str())
        .bind(id)
        .bind(content_type.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_queue_entry(&self, entry: &ModerationQueueEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO moderation_queue
                (id, content_id, content_type, priority, status, flagged_reason,
                 created_at, resolved_by, resolved_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(entry.id)
        .bind(entry.content_id)
        .bind(entry.content_type.as_str())
        .bind(entry.priority.as_str())
        .bind(entry.status.as_str())
        .bind(&entry.flagged_reason)
        .bind(entry.created_at)
        .bind(entry.resolved_by)
        .bind(entry.resolved_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_queue(&self, status: Option<QueueStatus>) -> Result<Vec<ModerationQueueEntry>> {
        let rows = match status {
            Some(status) => {
                sqlx::query_as::<_, QueueRow>(
                    r#"
                    SELECT id, content_id, content_type, priority, status, flagged_reason,
                           created_at, resolved_by, resolved_at
                    FROM moderation_queue
                    WHERE status = $1
                    ORDER BY array_position(ARRAY['urgent','high','normal','low'], priority),
                             created_at
                    "#,
                )
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, QueueRow>(
                    r#"
                    SELECT id, content_id, content_type, priority, status, flagged_reason,
                           created_at, resolved_by, resolved_at
                    FROM moderation_queue
                    ORDER BY array_position(ARRAY['urgent','high','normal','low'], priority),
                             created_at
                    "#,
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter().map(ModerationQueueEntry::try_from).collect()
    }

    async fn resolve_queue_entries(
        &self,
        content_id: Uuid,
        content_type: ContentType,
        resolver: Uuid,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE moderation_queue
            SET status = 'resolved', resolved_by = $1, resolved_at = NOW()
            WHERE content_id = $2 AND content_type = $3 AND status <> 'resolved'
            "#,
        )
        .bind(resolver)
        .bind(content_id)
        .bind(content_type.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn insert_audit_entry(&self, entry: &AuditLogEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_log
                (id, action, actor_id, content_id, content_type, changes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.id)
        .bind(entry.action.as_str())
        .bind(entry.actor_id)
        .bind(entry.content_id)
        .bind(entry.content_type.as_str())
        .bind(&entry.changes)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_trending(&self, record: &TrendingRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO trending_records
                (content_id, content_type, element, score, views_24h, engagement_24h, last_updated)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (content_id, content_type) DO UPDATE
            SET element = EXCLUDED.element,
                score = EXCLUDED.score,
                views_24h = EXCLUDED.views_24h,
                engagement_24h = EXCLUDED.engagement_24h,
                last_updated = EXCLUDED.last_updated
            "#,
        )
        .bind(record.content_id)
        .bind(record.content_type.as_str())
        .bind(record.element.as_str())
        .bind(record.score)
        .bind(record.views_24h)
        .bind(record.engagement_24h)
        .bind(record.last_updated)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn top_trending(&self, element: Element, limit: i64) -> Result<Vec<TrendingRecord>> {
        let rows = sqlx::query_as::<_, TrendingRow>(
            r#"
            SELECT content_id, content_type, element, score, views_24h, engagement_24h,
                   last_updated
            FROM trending_records
            WHERE element = $1
            ORDER BY score DESC
            LIMIT $2
            "#,
        )
        .bind(element.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TrendingRecord::try_from).collect()
    }

    async fn list_published(&self, element: Element, limit: i64) -> Result<Vec<ContentItem>> {
        let rows = sqlx::query_as::<_, ContentRow>(&format!(
            r#"
            SELECT {}
            FROM content_items
            WHERE element = $1 AND publish_status = 'published'
            ORDER BY created_at DESC
            LIMIT $2
            "#,
            CONTENT_COLUMNS
        ))
        .bind(element.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ContentItem::try_from).collect()
    }

    async fn top_viewed_published(
        &self,
        element: Element,
        limit: i64,
    ) -> Result<Vec<ContentItem>> {
        let rows = sqlx::query_as::<_, ContentRow>(&format!(
            r#"
            SELECT {}
            FROM content_items
            WHERE element = $1
              AND publish_status = 'published'
              AND moderation_status = 'auto_approved'
            ORDER BY view_count DESC
            LIMIT $2
            "#,
            CONTENT_COLUMNS
        ))
        .bind(element.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ContentItem::try_from).collect()
    }

    async fn find_published_by_ids(&self, ids: &[Uuid]) -> Result<Vec<ContentItem>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, ContentRow>(&format!(
            r#"
            SELECT {}
            FROM content_items
            WHERE id = ANY($1) AND publish_status = 'published'
            "#,
            CONTENT_COLUMNS
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ContentItem::try_from).collect()
    }

    async fn record_view(&self, user_id: Uuid, content_id: Uuid) -> Result<()> {
        sqlx::query("INSERT INTO content_views (user_id, content_id) VALUES ($1, $2)")
            .bind(user_id)
            .bind(content_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn recent_viewed_content_ids(&self, user_id: Uuid, limit: i64) -> Result<Vec<Uuid>> {
        let rows = sqlx::query_as::<_, (Uuid,)>(
            r#"
            SELECT content_id
            FROM content_views
            WHERE user_id = $1
            ORDER BY viewed_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn analytics_overview(&self) -> Result<AnalyticsOverview> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total_content,
                COUNT(*) FILTER (WHERE publish_status = 'published') AS published,
                COUNT(*) FILTER (WHERE publish_status = 'under_review') AS under_review,
                COUNT(*) FILTER (WHERE publish_status = 'flagged') AS flagged,
                COUNT(*) FILTER (WHERE moderation_status = 'auto_approved') AS auto_approved,
                COUNT(*) FILTER (WHERE moderation_status = 'requires_review') AS requires_review,
                COUNT(*) FILTER (WHERE moderation_status = 'rejected') AS rejected,
                AVG(positivity_score)::float8 AS average_positivity
            FROM content_items
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let pending_queue = sqlx::query(
            "SELECT COUNT(*) AS count FROM moderation_queue WHERE status = 'pending'",
        )
        .fetch_one(&self.pool)
        .await?;

        let auto_approved: i64 = row.get("auto_approved");
        let requires_review: i64 = row.get("requires_review");
        let rejected: i64 = row.get("rejected");
        let decided = auto_approved + requires_review + rejected;
        let approval_rate = if decided > 0 {
            auto_approved as f64 / decided as f64
        } else {
            0.0
        };

        Ok(AnalyticsOverview {
            total_content: row.get("total_content"),
            published: row.get("published"),
            under_review: row.get("under_review"),
            flagged: row.get("flagged"),
            auto_approved,
            requires_review,
            rejected,
            pending_queue_entries: pending_queue.get("count"),
            approval_rate,
            average_positivity: row.get("average_positivity"),
        })
    }
}
