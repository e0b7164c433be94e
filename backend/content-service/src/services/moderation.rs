//! Moderation orchestrator: classify, screen, score, decide.
//!
//! Each content item is processed once, strictly sequentially across the
//! three stages. The decision policy is a pure function evaluated in order,
//! first match wins. Every path persists the full outcome atomically and
//! appends one audit entry; audit write failures are surfaced, never rolled
//! back into the primary state change.

use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use crate::cache::{FeedCache, RecommendationCache};
use crate::db::ContentStore;
use crate::error::{AppError, Result};
use crate::metrics::pipeline::{AUDIT_WRITE_FAILURES_TOTAL, MODERATION_DECISIONS_TOTAL};
use crate::models::{
    AuditAction, AuditLogEntry, ContentItem, ContentType, DecisionActor, ModerationOutcome,
    ModerationQueueEntry, ModerationStatus, QueuePriority, ResolutionDecision, RiskLevel,
    SafetyAssessment,
};
use crate::services::classifier::{Classification, ElementClassifier};
use crate::services::positivity::PositivityScorer;
use crate::services::safety::SafetyScreener;

/// A review-queue insertion requested by the decision policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueRequest {
    pub priority: QueuePriority,
    pub reason: String,
}

/// Outcome of the decision policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub status: ModerationStatus,
    pub queue: Option<QueueRequest>,
}

/// The automatic decision policy. Deterministic over its inputs; evaluated
/// in order with first match winning.
pub fn decide(
    safety: &SafetyAssessment,
    classification: &Classification,
    content_type: ContentType,
    review_confidence_threshold: f32,
) -> Decision {
    if !safety.is_safe && safety.risk_level == RiskLevel::High {
        // Rejected outright; the urgent entry is still recorded so the
        // queue keeps a visible trace of automatic rejections.
        return Decision {
            status: ModerationStatus::Rejected,
            queue: Some(QueueRequest {
                priority: QueuePriority::Urgent,
                reason: format!(
                    "unsafe content (high risk): {}",
                    safety.flagged_categories.join(", ")
                ),
            }),
        };
    }

    if !safety.is_safe {
        return Decision {
            status: ModerationStatus::RequiresReview,
            queue: Some(QueueRequest {
                priority: QueuePriority::High,
                reason: format!(
                    "unsafe content flagged for review: {}",
                    safety.flagged_categories.join(", ")
                ),
            }),
        };
    }

    if content_type == ContentType::Video
        && classification.confidence < review_confidence_threshold
    {
        return Decision {
            status: ModerationStatus::RequiresReview,
            queue: Some(QueueRequest {
                priority: QueuePriority::Normal,
                reason: format!(
                    "low classification confidence: {:.2}",
                    classification.confidence
                ),
            }),
        };
    }

    Decision {
        status: ModerationStatus::AutoApproved,
        queue: None,
    }
}

pub struct ModerationService {
    store: Arc<dyn ContentStore>,
    classifier: Arc<ElementClassifier>,
    screener: Arc<SafetyScreener>,
    scorer: Arc<PositivityScorer>,
    feed_cache: Arc<FeedCache>,
    recommendation_cache: Arc<RecommendationCache>,
    review_confidence_threshold: f32,
}

impl ModerationService {
    pub fn new(
        store: Arc<dyn ContentStore>,
        classifier: Arc<ElementClassifier>,
        screener: Arc<SafetyScreener>,
        scorer: Arc<PositivityScorer>,
        feed_cache: Arc<FeedCache>,
        recommendation_cache: Arc<RecommendationCache>,
        review_confidence_threshold: f32,
    ) -> Self {
        Self {
            store,
            classifier,
            screener,
            scorer,
            feed_cache,
            recommendation_cache,
            review_confidence_threshold,
        }
    }

    /// Run the three-stage pipeline for one item and apply the decision.
    pub async fn process(&self, content_id: Uuid, content_type: ContentType) -> Result<()> {
        let item = self
            .store
            .get_content(content_id, content_type)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("content {}", content_id)))?;

        if item.moderation_status != ModerationStatus::Pending {
            tracing::debug!(
                content_id = %content_id,
                status = item.moderation_status.as_str(),
                "Content already decided, skipping"
            );
            return Ok(());
        }

        let text = item.text_for_analysis();
        let classification = self.classifier.classify(&text).await;
        let safety = self.screener.screen(&text).await;
        let positivity = self.scorer.score(&text).await;

        let decision = decide(
            &safety,
            &classification,
            content_type,
            self.review_confidence_threshold,
        );

        if !item
            .moderation_status
            .may_transition(decision.status, DecisionActor::System)
        {
            return Err(AppError::InvalidStatusTransition {
                from: item.moderation_status.as_str().to_string(),
                to: decision.status.as_str().to_string(),
            });
        }

        let outcome = ModerationOutcome {
            content_id,
            content_type,
            element: Some(classification.element),
            positivity_score: Some(positivity),
            classifier_result: json!({
                "element": classification.element.as_str(),
                "confidence": classification.confidence,
                "rationale": classification.rationale,
                "source": classification.source.as_str(),
            }),
            safety_result: serde_json::to_value(&safety)?,
            moderation_status: decision.status,
            publish_status: decision.status.publish_status(),
        };
        self.store.apply_moderation_outcome(&outcome).await?;

        if let Some(queue) = &decision.queue {
            self.store
                .insert_queue_entry(&ModerationQueueEntry::new(
                    content_id,
                    content_type,
                    queue.priority,
                    queue.reason.clone(),
                ))
                .await?;
        }

        let action = if decision.status == ModerationStatus::AutoApproved {
            AuditAction::Publish
        } else {
            AuditAction::Moderate
        };
        self.append_audit(AuditLogEntry::new(
            action,
            None,
            content_id,
            content_type,
            json!({
                "classification": outcome.classifier_result.clone(),
                "safety": outcome.safety_result.clone(),
                "positivity_score": positivity,
                "moderation_status": decision.status.as_str(),
                "publish_status": decision.status.publish_status().as_str(),
                "queued": decision.queue.as_ref().map(|q| q.priority.as_str()),
            }),
        ))
        .await;

        MODERATION_DECISIONS_TOTAL
            .with_label_values(&[decision.status.as_str()])
            .inc();
        tracing::info!(
            content_id = %content_id,
            content_type = content_type.as_str(),
            element = classification.element.as_str(),
            status = decision.status.as_str(),
            positivity = positivity,
            "Moderation decision applied"
        );

        if decision.status == ModerationStatus::AutoApproved {
            self.invalidate_discovery_caches(&outcome.element, &item);
        }

        Ok(())
    }

    /// Park an item that failed processing: requires-review plus a
    /// high-priority queue entry naming the failure. Used by the worker
    /// pool's dead-letter path.
    pub async fn mark_processing_failure(
        &self,
        content_id: Uuid,
        content_type: ContentType,
        reason: &str,
    ) -> Result<()> {
        let item = self
            .store
            .get_content(content_id, content_type)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("content {}", content_id)))?;

        if item.moderation_status != ModerationStatus::Pending {
            return Ok(());
        }

        self.store
            .update_statuses(
                content_id,
                content_type,
                ModerationStatus::RequiresReview,
                ModerationStatus::RequiresReview.publish_status(),
            )
            .await?;
        self.store
            .insert_queue_entry(&ModerationQueueEntry::new(
                content_id,
                content_type,
                QueuePriority::High,
                format!("pipeline failure: {}", reason),
            ))
            .await?;

        self.append_audit(AuditLogEntry::new(
            AuditAction::Moderate,
            None,
            content_id,
            content_type,
            json!({
                "failure": reason,
                "moderation_status": ModerationStatus::RequiresReview.as_str(),
            }),
        ))
        .await;

        MODERATION_DECISIONS_TOTAL
            .with_label_values(&["requires_review"])
            .inc();
        tracing::error!(
            content_id = %content_id,
            reason = reason,
            "Pipeline failure, content parked for human review"
        );

        Ok(())
    }

    /// Human resolution of a reviewed item. Idempotent: repeating a
    /// resolution that is already in effect is a no-op and writes no
    /// duplicate audit entry.
    pub async fn resolve(
        &self,
        content_id: Uuid,
        content_type: ContentType,
        decision: ResolutionDecision,
        notes: Option<String>,
        moderator_id: Uuid,
    ) -> Result<()> {
        let item = self
            .store
            .get_content(content_id, content_type)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("content {}", content_id)))?;

        let target = decision.moderation_status();
        let status_changed = item.moderation_status != target;

        if status_changed
            && !item
                .moderation_status
                .may_transition(target, DecisionActor::Moderator)
        {
            return Err(AppError::InvalidStatusTransition {
                from: item.moderation_status.as_str().to_string(),
                to: target.as_str().to_string(),
            });
        }

        let resolved_entries = self
            .store
            .resolve_queue_entries(content_id, content_type, moderator_id)
            .await?;

        if !status_changed && resolved_entries == 0 {
            tracing::debug!(
                content_id = %content_id,
                "Resolution already recorded, nothing to do"
            );
            return Ok(());
        }

        if status_changed {
            self.store
                .update_statuses(content_id, content_type, target, target.publish_status())
                .await?;
        }

        let action = match decision {
            ResolutionDecision::Approved => AuditAction::Publish,
            ResolutionDecision::Rejected => AuditAction::Reject,
        };
        self.append_audit(AuditLogEntry::new(
            action,
            Some(moderator_id),
            content_id,
            content_type,
            json!({
                "decision": target.as_str(),
                "previous_status": item.moderation_status.as_str(),
                "notes": notes,
                "resolved_queue_entries": resolved_entries,
            }),
        ))
        .await;

        tracing::info!(
            content_id = %content_id,
            moderator_id = %moderator_id,
            decision = target.as_str(),
            "Human resolution applied"
        );

        self.invalidate_discovery_caches(&item.element, &item);

        Ok(())
    }

    /// Audit writes are advisory: log and count failures, keep the primary
    /// state change.
    async fn append_audit(&self, entry: AuditLogEntry) {
        if let Err(e) = self.store.insert_audit_entry(&entry).await {
            AUDIT_WRITE_FAILURES_TOTAL.inc();
            tracing::error!(
                content_id = %entry.content_id,
                action = entry.action.as_str(),
                error = %e,
                "Audit log write failed"
            );
        }
    }

    /// Content state changed in a way readers can see; clear the affected
    /// element's caches instead of waiting for TTL.
    fn invalidate_discovery_caches(
        &self,
        element: &Option<crate::models::Element>,
        item: &ContentItem,
    ) {
        let element = element.or(item.element);
        if let Some(element) = element {
            self.feed_cache.invalidate(element);
            self.recommendation_cache.invalidate_element(element);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::classifier::ClassificationSource;

    fn classification(confidence: f32) -> Classification {
        Classification {
            element: crate::models::Element::Water,
            confidence,
            rationale: "keyword match: water".to_string(),
            source: ClassificationSource::Keyword,
        }
    }

    fn unsafe_assessment(risk_level: RiskLevel, flags: &[&str]) -> SafetyAssessment {
        SafetyAssessment {
            is_safe: false,
            flagged_categories: flags.iter().map(|s| s.to_string()).collect(),
            risk_level,
        }
    }

    #[test]
    fn test_high_risk_rejects_with_urgent_queue_entry() {
        let decision = decide(
            &unsafe_assessment(RiskLevel::High, &["violence/graphic"]),
            &classification(0.9),
            ContentType::Video,
            0.5,
        );
        assert_eq!(decision.status, ModerationStatus::Rejected);
        let queue = decision.queue.unwrap();
        assert_eq!(queue.priority, QueuePriority::Urgent);
        assert!(queue.reason.contains("violence/graphic"));
    }

    #[test]
    fn test_medium_risk_requires_review_with_high_priority() {
        let decision = decide(
            &unsafe_assessment(RiskLevel::Medium, &["harassment"]),
            &classification(0.9),
            ContentType::Post,
            0.5,
        );
        assert_eq!(decision.status, ModerationStatus::RequiresReview);
        assert_eq!(decision.queue.unwrap().priority, QueuePriority::High);
    }

    #[test]
    fn test_low_confidence_video_requires_review() {
        let decision = decide(
            &SafetyAssessment::safe(),
            &classification(0.3),
            ContentType::Video,
            0.5,
        );
        assert_eq!(decision.status, ModerationStatus::RequiresReview);
        let queue = decision.queue.unwrap();
        assert_eq!(queue.priority, QueuePriority::Normal);
        assert!(queue.reason.contains("0.30"));
    }

    #[test]
    fn test_low_confidence_post_is_auto_approved() {
        // The confidence branch only applies to videos.
        let decision = decide(
            &SafetyAssessment::safe(),
            &classification(0.3),
            ContentType::Post,
            0.5,
        );
        assert_eq!(decision.status, ModerationStatus::AutoApproved);
        assert!(decision.queue.is_none());
    }

    #[test]
    fn test_safe_confident_content_is_auto_approved() {
        let decision = decide(
            &SafetyAssessment::safe(),
            &classification(0.9),
            ContentType::Video,
            0.5,
        );
        assert_eq!(decision.status, ModerationStatus::AutoApproved);
        assert!(decision.queue.is_none());
    }

    #[test]
    fn test_policy_is_deterministic() {
        let safety = unsafe_assessment(RiskLevel::Medium, &["spam"]);
        let class = classification(0.4);
        let first = decide(&safety, &class, ContentType::Video, 0.5);
        let second = decide(&safety, &class, ContentType::Video, 0.5);
        assert_eq!(first, second);
    }

    #[test]
    fn test_safety_branch_beats_confidence_branch() {
        // Order matters: an unsafe low-confidence video queues at high
        // priority for the safety reason, not normal for confidence.
        let decision = decide(
            &unsafe_assessment(RiskLevel::Medium, &["harassment"]),
            &classification(0.1),
            ContentType::Video,
            0.5,
        );
        let queue = decision.queue.unwrap();
        assert_eq!(queue.priority, QueuePriority::High);
        assert!(queue.reason.contains("harassment"));
    }
}
