//! Click submission DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::TrackerError;

/// Request body for `POST /ads/click`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ClickRequest {
    /// Id of the clicked ad.
    pub ad_id: i32,
    /// Playback position in seconds when the click happened.
    #[serde(default)]
    pub video_playback_time: f64,
    /// Client address reported by the caller. Proxy headers take precedence.
    #[serde(default)]
    pub ip_address: Option<String>,
    /// Client user agent. Falls back to the `User-Agent` header.
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl ClickRequest {
    /// Rejects playback times that are negative or not finite.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InvalidRequest`] describing the bad field.
    pub fn validate(&self) -> Result<(), TrackerError> {
        if !self.video_playback_time.is_finite() || self.video_playback_time < 0.0 {
            return Err(TrackerError::InvalidRequest(format!(
                "video_playback_time must be a non-negative number, got {}",
                self.video_playback_time
            )));
        }
        Ok(())
    }
}

/// Acknowledgement payload for an accepted click.
#[derive(Debug, Serialize, ToSchema)]
pub struct ClickAccepted {
    /// Human-readable confirmation.
    pub message: String,
}

/// Response body for `POST /ads/click` (202 Accepted).
#[derive(Debug, Serialize, ToSchema)]
pub struct ClickAcceptedResponse {
    /// Always `true`.
    pub success: bool,
    /// Acknowledgement.
    pub data: ClickAccepted,
}

impl ClickAcceptedResponse {
    /// The standard acknowledgement.
    #[must_use]
    pub fn accepted() -> Self {
        Self {
            success: true,
            data: ClickAccepted {
                message: "Click recorded successfully".to_string(),
            },
        }
    }
}
