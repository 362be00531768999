//! Analytics query and response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{AnalyticsSnapshot, TimeWindow};
use crate::error::TrackerError;

/// Query parameters for `GET /ads/analytics`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AnalyticsQuery {
    /// Lookback window: one of `15m`, `30m`, `1h`, `6h`, `12h`, `24h`,
    /// `7d`, `30d`. Defaults to `24h`.
    #[serde(default)]
    pub timeframe: Option<String>,
}

impl AnalyticsQuery {
    /// Resolves the requested window, defaulting to 24 hours.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InvalidTimeWindow`] for unsupported tokens.
    pub fn window(&self) -> Result<TimeWindow, TrackerError> {
        self.timeframe
            .as_deref()
            .map_or(Ok(TimeWindow::default()), str::parse)
    }
}

/// Metrics for one ad over one time frame.
#[derive(Debug, Serialize, ToSchema)]
pub struct AnalyticsSnapshotDto {
    /// Ad id.
    pub ad_id: i32,
    /// Clicks in the time frame.
    pub total_clicks: i64,
    /// Click-through rate in percent against a fixed 1000 impressions.
    pub ctr: f64,
    /// Mean playback time at click, in seconds.
    pub avg_playback_time: f64,
    /// Window token (`"24h"`), hour bucket (`"hour_13"`) or `"no_clicks"`.
    pub time_frame: String,
    /// When the value was computed.
    pub last_updated: DateTime<Utc>,
}

impl From<AnalyticsSnapshot> for AnalyticsSnapshotDto {
    fn from(s: AnalyticsSnapshot) -> Self {
        Self {
            ad_id: s.ad_id.get(),
            total_clicks: s.total_clicks,
            ctr: s.ctr,
            avg_playback_time: s.avg_playback_time,
            time_frame: s.time_frame.to_string(),
            last_updated: s.last_updated,
        }
    }
}

/// Response body for the analytics endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct AnalyticsResponse {
    /// Always `true`.
    pub success: bool,
    /// Ordered snapshots.
    pub data: Vec<AnalyticsSnapshotDto>,
}

impl From<Vec<AnalyticsSnapshot>> for AnalyticsResponse {
    fn from(snapshots: Vec<AnalyticsSnapshot>) -> Self {
        Self {
            success: true,
            data: snapshots.into_iter().map(Into::into).collect(),
        }
    }
}
