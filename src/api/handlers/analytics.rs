//! Analytics handlers: windowed totals and hourly breakdown.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{AnalyticsQuery, AnalyticsResponse};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, TrackerError};

/// `GET /ads/analytics`: Per-ad totals over a lookback window.
///
/// # Errors
///
/// Returns [`TrackerError::InvalidTimeWindow`] for an unsupported
/// `timeframe` and [`TrackerError::PersistenceError`] on storage failure.
#[utoipa::path(
    get,
    path = "/api/v1/ads/analytics",
    tag = "Analytics",
    summary = "Windowed click analytics",
    description = "Returns one snapshot per ad, most clicked first. Ads without clicks in the window are included with zero totals.",
    params(AnalyticsQuery),
    responses(
        (status = 200, description = "Snapshots ordered by clicks", body = AnalyticsResponse),
        (status = 400, description = "Unsupported timeframe", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse),
    )
)]
pub async fn window_analytics(
    State(state): State<AppState>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<impl IntoResponse, TrackerError> {
    let window = query.window()?;
    let snapshots = state.analytics_service.aggregate(window).await?;
    Ok(Json(AnalyticsResponse::from(snapshots)))
}

/// `GET /ads/analytics/hourly`: Per-ad, per-hour totals for the last 24h.
///
/// # Errors
///
/// Returns [`TrackerError::PersistenceError`] on storage failure.
#[utoipa::path(
    get,
    path = "/api/v1/ads/analytics/hourly",
    tag = "Analytics",
    summary = "Hourly click breakdown",
    description = "Buckets the last 24 hours of clicks by ad and UTC hour of day. Ads without clicks appear once with the `no_clicks` time frame.",
    responses(
        (status = 200, description = "Snapshots ordered by ad then hour", body = AnalyticsResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse),
    )
)]
pub async fn hourly_analytics(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, TrackerError> {
    let snapshots = state.analytics_service.hourly_breakdown().await?;
    Ok(Json(AnalyticsResponse::from(snapshots)))
}

/// Analytics routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/ads/analytics", get(window_analytics))
        .route("/ads/analytics/hourly", get(hourly_analytics))
}
