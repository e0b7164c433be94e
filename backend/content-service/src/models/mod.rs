//! Data models for the content pipeline.
//!
//! Content items carry two status columns that move together: the moderation
//! status (what the pipeline or a human decided) and the publish status
//! (what readers see). The publish status is always derived from the
//! moderation status through [`ModerationStatus::publish_status`]; the two
//! are written in a single row update so no partial state is ever visible.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// The five-element content taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    Water,
    Fire,
    Earth,
    Air,
    Spiritual,
}

impl Element {
    pub const ALL: [Element; 5] = [
        Element::Water,
        Element::Fire,
        Element::Earth,
        Element::Air,
        Element::Spiritual,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Element::Water => "water",
            Element::Fire => "fire",
            Element::Earth => "earth",
            Element::Air => "air",
            Element::Spiritual => "spiritual",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "water" => Some(Element::Water),
            "fire" => Some(Element::Fire),
            "earth" => Some(Element::Earth),
            "air" => Some(Element::Air),
            "spiritual" => Some(Element::Spiritual),
            _ => None,
        }
    }
}

/// Content type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Video,
    Post,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Video => "video",
            ContentType::Post => "post",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "video" => Some(ContentType::Video),
            "post" => Some(ContentType::Post),
            _ => None,
        }
    }
}

/// Who is driving a status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionActor {
    /// The automatic pipeline.
    System,
    /// A human moderator acting through the resolve operation.
    Moderator,
}

/// Moderation lifecycle state of a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationStatus {
    Pending,
    AutoApproved,
    RequiresReview,
    Rejected,
}

impl ModerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationStatus::Pending => "pending",
            ModerationStatus::AutoApproved => "auto_approved",
            ModerationStatus::RequiresReview => "requires_review",
            ModerationStatus::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(ModerationStatus::Pending),
            "auto_approved" => Some(ModerationStatus::AutoApproved),
            "requires_review" => Some(ModerationStatus::RequiresReview),
            "rejected" => Some(ModerationStatus::Rejected),
            _ => None,
        }
    }

    /// The publish status readers see for this moderation state.
    pub fn publish_status(&self) -> PublishStatus {
        match self {
            ModerationStatus::Pending | ModerationStatus::RequiresReview => {
                PublishStatus::UnderReview
            }
            ModerationStatus::AutoApproved => PublishStatus::Published,
            ModerationStatus::Rejected => PublishStatus::Flagged,
        }
    }

    /// Whether `actor` may move an item from `self` to `next`.
    ///
    /// The automatic pipeline only ever decides pending items. Humans may
    /// settle items queued for review and may override either terminal
    /// state; nothing else is legal.
    pub fn may_transition(&self, next: ModerationStatus, actor: DecisionActor) -> bool {
        match actor {
            DecisionActor::System => {
                *self == ModerationStatus::Pending
                    && matches!(
                        next,
                        ModerationStatus::AutoApproved
                            | ModerationStatus::RequiresReview
                            | ModerationStatus::Rejected
                    )
            }
            DecisionActor::Moderator => {
                matches!(
                    self,
                    ModerationStatus::RequiresReview
                        | ModerationStatus::AutoApproved
                        | ModerationStatus::Rejected
                ) && matches!(
                    next,
                    ModerationStatus::AutoApproved | ModerationStatus::Rejected
                )
            }
        }
    }
}

/// Reader-facing visibility state, derived from the moderation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStatus {
    UnderReview,
    Published,
    Flagged,
}

impl PublishStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishStatus::UnderReview => "under_review",
            PublishStatus::Published => "published",
            PublishStatus::Flagged => "flagged",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "under_review" => Some(PublishStatus::UnderReview),
            "published" => Some(PublishStatus::Published),
            "flagged" => Some(PublishStatus::Flagged),
            _ => None,
        }
    }
}

/// Risk level derived from safety screening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    None,
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::None => "none",
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

/// Safety screening outcome, embedded in the content item's safety blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyAssessment {
    pub is_safe: bool,
    pub flagged_categories: Vec<String>,
    pub risk_level: RiskLevel,
}

impl SafetyAssessment {
    pub fn safe() -> Self {
        Self {
            is_safe: true,
            flagged_categories: Vec::new(),
            risk_level: RiskLevel::None,
        }
    }

    /// Synthetic assessment used when a configured safety service fails.
    pub fn api_error() -> Self {
        Self {
            is_safe: false,
            flagged_categories: vec!["api_error".to_string()],
            risk_level: RiskLevel::Medium,
        }
    }
}

/// A user-submitted video or post flowing through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub content_type: ContentType,
    pub title: String,
    pub description: Option<String>,
    pub body: Option<String>,
    pub media_key: Option<String>,
    pub element: Option<Element>,
    pub moderation_status: ModerationStatus,
    pub publish_status: PublishStatus,
    pub positivity_score: Option<i16>,
    pub view_count: i64,
    pub engagement_count: i64,
    pub classifier_result: Option<Value>,
    pub safety_result: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContentItem {
    /// The text the classifiers see: title, description and body joined.
    /// Videos also carry their media location reference.
    pub fn text_for_analysis(&self) -> String {
        let mut parts = vec![self.title.as_str()];
        if let Some(description) = &self.description {
            parts.push(description);
        }
        if let Some(body) = &self.body {
            parts.push(body);
        }
        if self.content_type == ContentType::Video {
            if let Some(media_key) = &self.media_key {
                parts.push(media_key);
            }
        }
        parts.join(" ").trim().to_string()
    }
}

/// Priority of a human-review worklist entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueuePriority {
    Urgent,
    High,
    Normal,
    Low,
}

impl QueuePriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueuePriority::Urgent => "urgent",
            QueuePriority::High => "high",
            QueuePriority::Normal => "normal",
            QueuePriority::Low => "low",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "urgent" => Some(QueuePriority::Urgent),
            "high" => Some(QueuePriority::High),
            "normal" => Some(QueuePriority::Normal),
            "low" => Some(QueuePriority::Low),
            _ => None,
        }
    }

    /// Sort rank, lower is more urgent.
    pub fn rank(&self) -> u8 {
        match self {
            QueuePriority::Urgent => 0,
            QueuePriority::High => 1,
            QueuePriority::Normal => 2,
            QueuePriority::Low => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Pending,
    InReview,
    Resolved,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Pending => "pending",
            QueueStatus::InReview => "in_review",
            QueueStatus::Resolved => "resolved",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(QueueStatus::Pending),
            "in_review" => Some(QueueStatus::InReview),
            "resolved" => Some(QueueStatus::Resolved),
            _ => None,
        }
    }
}

/// A pending human-review worklist entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationQueueEntry {
    pub id: Uuid,
    pub content_id: Uuid,
    pub content_type: ContentType,
    pub priority: QueuePriority,
    pub status: QueueStatus,
    pub flagged_reason: String,
    pub created_at: DateTime<Utc>,
    pub resolved_by: Option<Uuid>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl ModerationQueueEntry {
    pub fn new(
        content_id: Uuid,
        content_type: ContentType,
        priority: QueuePriority,
        flagged_reason: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            content_id,
            content_type,
            priority,
            status: QueueStatus::Pending,
            flagged_reason: flagged_reason.into(),
            created_at: Utc::now(),
            resolved_by: None,
            resolved_at: None,
        }
    }
}

/// Periodically recomputed trend score for a published item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendingRecord {
    pub content_id: Uuid,
    pub content_type: ContentType,
    pub element: Element,
    pub score: f64,
    pub views_24h: i64,
    pub engagement_24h: i64,
    pub last_updated: DateTime<Utc>,
}

/// Audit log action tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Publish,
    Moderate,
    Reject,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Publish => "publish",
            AuditAction::Moderate => "moderate",
            AuditAction::Reject => "reject",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "publish" => Some(AuditAction::Publish),
            "moderate" => Some(AuditAction::Moderate),
            "reject" => Some(AuditAction::Reject),
            _ => None,
        }
    }
}

/// Append-only audit record; immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub action: AuditAction,
    /// `None` means the system acted without a human.
    pub actor_id: Option<Uuid>,
    pub content_id: Uuid,
    pub content_type: ContentType,
    pub changes: Value,
    pub created_at: DateTime<Utc>,
}

impl AuditLogEntry {
    pub fn new(
        action: AuditAction,
        actor_id: Option<Uuid>,
        content_id: Uuid,
        content_type: ContentType,
        changes: Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            action,
            actor_id,
            content_id,
            content_type,
            changes,
            created_at: Utc::now(),
        }
    }
}

/// Everything the orchestrator persists once a decision is made.
///
/// Applied as a single row update so the status pair can never be observed
/// half-written.
#[derive(Debug, Clone)]
pub struct ModerationOutcome {
    pub content_id: Uuid,
    pub content_type: ContentType,
    pub element: Option<Element>,
    pub positivity_score: Option<i16>,
    pub classifier_result: Value,
    pub safety_result: Value,
    pub moderation_status: ModerationStatus,
    pub publish_status: PublishStatus,
}

/// Human resolution decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionDecision {
    Approved,
    Rejected,
}

impl ResolutionDecision {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "approved" => Some(ResolutionDecision::Approved),
            "rejected" => Some(ResolutionDecision::Rejected),
            _ => None,
        }
    }

    pub fn moderation_status(&self) -> ModerationStatus {
        match self {
            ResolutionDecision::Approved => ModerationStatus::AutoApproved,
            ResolutionDecision::Rejected => ModerationStatus::Rejected,
        }
    }
}

/// Aggregate counts served by the analytics overview endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsOverview {
    pub total_content: i64,
    pub published: i64,
    pub under_review: i64,
    pub flagged: i64,
    pub auto_approved: i64,
    pub requires_review: i64,
    pub rejected: i64,
    pub pending_queue_entries: i64,
    pub approval_rate: f64,
    pub average_positivity: Option<f64>,
}
