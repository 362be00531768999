//! Ad catalog handlers: list and get.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{AdDto, AdListResponse, AdResponse};
use crate::app_state::AppState;
use crate::domain::AdId;
use crate::error::{ErrorResponse, TrackerError};

/// `GET /ads`: List all ads, newest first.
///
/// # Errors
///
/// Returns [`TrackerError`] if the store cannot be read.
#[utoipa::path(
    get,
    path = "/api/v1/ads",
    tag = "Ads",
    summary = "List ads",
    description = "Returns every ad definition, most recently created first.",
    responses(
        (status = 200, description = "Ad catalog", body = AdListResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse),
    )
)]
pub async fn list_ads(State(state): State<AppState>) -> Result<impl IntoResponse, TrackerError> {
    let ads = state.ad_service.list_ads().await?;
    Ok(Json(AdListResponse {
        success: true,
        data: ads.into_iter().map(AdDto::from).collect(),
    }))
}

/// `GET /ads/{id}`: Get one ad.
///
/// # Errors
///
/// Returns [`TrackerError::AdNotFound`] if no ad has the given id.
#[utoipa::path(
    get,
    path = "/api/v1/ads/{id}",
    tag = "Ads",
    summary = "Get ad",
    params(("id" = i32, Path, description = "Ad id")),
    responses(
        (status = 200, description = "Ad details", body = AdResponse),
        (status = 404, description = "Ad not found", body = ErrorResponse),
    )
)]
pub async fn get_ad(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, TrackerError> {
    let ad = state.ad_service.get_ad(AdId::new(id)).await?;
    Ok(Json(AdResponse {
        success: true,
        data: ad.into(),
    }))
}

/// Ad catalog routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/ads", get(list_ads))
        .route("/ads/{id}", get(get_ad))
}
