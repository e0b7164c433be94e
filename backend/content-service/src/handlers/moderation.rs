//! Moderation endpoints: submission, human resolution, and the review
//! queue.

use std::sync::Arc;

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::ContentStore;
use crate::error::{AppError, Result};
use crate::models::{ContentType, QueueStatus, ResolutionDecision};
use crate::pipeline::ModerationWorkerPool;
use crate::services::ModerationService;

pub struct ModerationHandlerState {
    pub workers: Arc<ModerationWorkerPool>,
    pub moderation: Arc<ModerationService>,
    pub store: Arc<dyn ContentStore>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitModerationRequest {
    pub content_id: Uuid,
    pub content_type: String,
    /// The submitting collaborator, recorded for tracing only.
    pub actor_id: Option<Uuid>,
}

/// Accept a content item for asynchronous moderation. The caller gets an
/// immediate acknowledgment; classification runs on the worker pool.
pub async fn submit_for_moderation(
    state: web::Data<ModerationHandlerState>,
    req: web::Json<SubmitModerationRequest>,
) -> Result<HttpResponse> {
    let content_type = parse_content_type(&req.content_type)?;

    state.workers.submit(req.content_id, content_type)?;

    tracing::info!(
        content_id = %req.content_id,
        content_type = content_type.as_str(),
        actor_id = ?req.actor_id,
        "Content accepted for moderation"
    );

    Ok(HttpResponse::Accepted().json(serde_json::json!({
        "status": "accepted",
        "content_id": req.content_id,
    })))
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub content_id: Uuid,
    pub content_type: String,
    pub decision: String,
    pub notes: Option<String>,
    pub moderator_id: Uuid,
}

/// Apply a human moderation decision.
pub async fn resolve_content(
    state: web::Data<ModerationHandlerState>,
    req: web::Json<ResolveRequest>,
) -> Result<HttpResponse> {
    let content_type = parse_content_type(&req.content_type)?;
    let decision = ResolutionDecision::parse(&req.decision)
        .ok_or_else(|| AppError::Validation(format!("unknown decision: {}", req.decision)))?;

    state
        .moderation
        .resolve(
            req.content_id,
            content_type,
            decision,
            req.notes.clone(),
            req.moderator_id,
        )
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "status": "ok" })))
}

#[derive(Debug, Deserialize)]
pub struct QueueQuery {
    pub status: Option<String>,
}

/// Priority-ordered review queue, optionally filtered by status.
pub async fn get_moderation_queue(
    state: web::Data<ModerationHandlerState>,
    query: web::Query<QueueQuery>,
) -> Result<HttpResponse> {
    let status = match query.status.as_deref() {
        Some(raw) => Some(
            QueueStatus::parse(raw)
                .ok_or_else(|| AppError::Validation(format!("unknown queue status: {}", raw)))?,
        ),
        None => None,
    };

    let entries = state.store.list_queue(status).await?;
    Ok(HttpResponse::Ok().json(entries))
}

fn parse_content_type(raw: &str) -> Result<ContentType> {
    ContentType::parse(raw)
        .ok_or_else(|| AppError::Validation(format!("unknown content type: {}", raw)))
}
