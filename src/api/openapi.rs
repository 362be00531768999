//! OpenAPI document for the REST surface.

use utoipa::OpenApi;

use crate::api::dto::{
    AdDto, AdListResponse, AdResponse, AnalyticsResponse, AnalyticsSnapshotDto, ClickAccepted,
    ClickAcceptedResponse, ClickRequest,
};
use crate::api::handlers::{ads, analytics, click, system};
use crate::error::{ErrorBody, ErrorResponse};

/// Generated OpenAPI document, served at `/api-docs/openapi.json`.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "video-ad-tracker",
        description = "Click ingestion and windowed analytics for video advertisements"
    ),
    paths(
        ads::list_ads,
        ads::get_ad,
        click::record_click,
        analytics::window_analytics,
        analytics::hourly_analytics,
        system::health_handler,
        system::metrics_handler,
    ),
    components(schemas(
        AdDto,
        AdListResponse,
        AdResponse,
        ClickRequest,
        ClickAccepted,
        ClickAcceptedResponse,
        AnalyticsSnapshotDto,
        AnalyticsResponse,
        ErrorResponse,
        ErrorBody,
        system::HealthResponse,
    )),
    tags(
        (name = "Ads", description = "Ad catalog"),
        (name = "Clicks", description = "Click ingestion"),
        (name = "Analytics", description = "Click aggregation"),
        (name = "System", description = "Health and counters"),
    )
)]
pub struct ApiDoc;
