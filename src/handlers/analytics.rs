use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;

use super::common::success_response;
use crate::errors::ServiceError;
use crate::AppState;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct TrendParams {
    /// Window in days, clamped to 1..=365 (default 30)
    pub days: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/v1/analytics/dashboard",
    responses((status = 200, description = "Inventory dashboard summary")),
    tag = "analytics"
)]
pub async fn dashboard(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let summary = state.services.analytics.dashboard().await?;
    Ok(success_response(summary))
}

#[utoipa::path(
    get,
    path = "/api/v1/analytics/movements",
    params(TrendParams),
    responses((status = 200, description = "Per-day movement totals, oldest first")),
    tag = "analytics"
)]
pub async fn movement_trend(
    State(state): State<AppState>,
    Query(params): Query<TrendParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let trend = state.services.analytics.movement_trend(params.days).await?;
    Ok(success_response(trend))
}

pub fn analytics_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/movements", get(movement_trend))
}
