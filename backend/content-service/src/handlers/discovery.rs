//! Read-path endpoints: element feeds, trending, and recommendations.

use std::sync::Arc;

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::ContentStore;
use crate::error::{AppError, Result};
use crate::handlers::ContentSummary;
use crate::models::{ContentType, Element};
use crate::services::{FeedService, RecommendationService};

const DEFAULT_PAGE_LIMIT: usize = 20;
const MAX_PAGE_LIMIT: usize = 100;

pub struct DiscoveryHandlerState {
    pub feed: Arc<FeedService>,
    pub recommendations: Arc<RecommendationService>,
    pub store: Arc<dyn ContentStore>,
}

#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct FeedResponse {
    pub items: Vec<ContentSummary>,
    pub total: usize,
    pub has_more: bool,
}

/// Ranked feed for an element.
pub async fn get_feed(
    state: web::Data<DiscoveryHandlerState>,
    element: web::Path<String>,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse> {
    let element = parse_element(&element)?;
    let limit = clamp_limit(query.limit);
    let offset = query.offset.unwrap_or(0);

    let page = state.feed.get_feed(element, limit, offset).await?;

    Ok(HttpResponse::Ok().json(FeedResponse {
        items: page.items.iter().map(ContentSummary::from).collect(),
        total: page.total,
        has_more: page.has_more,
    }))
}

#[derive(Debug, Deserialize)]
pub struct TrendingParams {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TrendingItemResponse {
    pub content: ContentSummary,
    pub trending_score: f64,
    pub views_24h: i64,
    pub engagement_24h: i64,
    pub last_updated: chrono::DateTime<chrono::Utc>,
}

/// Trending items for an element, with trend metadata.
pub async fn get_trending(
    state: web::Data<DiscoveryHandlerState>,
    element: web::Path<String>,
    query: web::Query<TrendingParams>,
) -> Result<HttpResponse> {
    let element = parse_element(&element)?;
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT as i64).clamp(1, MAX_PAGE_LIMIT as i64);

    let trending = state.feed.get_trending(element, limit).await?;
    let items: Vec<TrendingItemResponse> = trending
        .into_iter()
        .map(|(record, item)| TrendingItemResponse {
            content: ContentSummary::from(&item),
            trending_score: record.score,
            views_24h: record.views_24h,
            engagement_24h: record.engagement_24h,
            last_updated: record.last_updated,
        })
        .collect();

    Ok(HttpResponse::Ok().json(items))
}

#[derive(Debug, Deserialize)]
pub struct RecommendationParams {
    pub user_id: Uuid,
    pub limit: Option<usize>,
}

/// Hybrid recommendations for a user within an element.
pub async fn get_recommendations(
    state: web::Data<DiscoveryHandlerState>,
    element: web::Path<String>,
    query: web::Query<RecommendationParams>,
) -> Result<HttpResponse> {
    let element = parse_element(&element)?;
    let limit = clamp_limit(query.limit);

    let items = state
        .recommendations
        .get_recommendations(query.user_id, element, limit)
        .await?;

    Ok(HttpResponse::Ok().json(
        items
            .iter()
            .map(ContentSummary::from)
            .collect::<Vec<ContentSummary>>(),
    ))
}

#[derive(Debug, Deserialize)]
pub struct TrackViewRequest {
    pub user_id: Uuid,
}

/// Record a content view; feeds the recommender's repeat penalty.
pub async fn track_view(
    state: web::Data<DiscoveryHandlerState>,
    path: web::Path<(String, Uuid)>,
    req: web::Json<TrackViewRequest>,
) -> Result<HttpResponse> {
    let (content_type, content_id) = path.into_inner();
    ContentType::parse(&content_type)
        .ok_or_else(|| AppError::Validation(format!("unknown content type: {}", content_type)))?;

    state.store.record_view(req.user_id, content_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

fn parse_element(raw: &str) -> Result<Element> {
    Element::parse(raw).ok_or_else(|| AppError::Validation(format!("unknown element: {}", raw)))
}

fn clamp_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT)
}
