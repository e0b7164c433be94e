//! Aggregate pipeline analytics.

use std::sync::Arc;

use actix_web::{web, HttpResponse};

use crate::db::ContentStore;
use crate::error::Result;

pub struct AnalyticsHandlerState {
    pub store: Arc<dyn ContentStore>,
}

/// Aggregate counts and rates across the pipeline.
pub async fn get_analytics_overview(
    state: web::Data<AnalyticsHandlerState>,
) -> Result<HttpResponse> {
    let overview = state.store.analytics_overview().await?;
    Ok(HttpResponse::Ok().json(overview))
}
