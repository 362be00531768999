//! Click events and their processing lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AdId;

/// A persisted click on a video ad.
///
/// Created with `processed == false`. The backlog reconciler flips the flag
/// to `true` exactly once; nothing ever flips it back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickEvent {
    /// Store-assigned row id.
    pub id: i64,
    /// Ad the click belongs to.
    pub ad_id: AdId,
    /// When the click was accepted.
    pub timestamp: DateTime<Utc>,
    /// Originating client address, if known.
    pub ip_address: Option<String>,
    /// Playback position in seconds at the moment of the click.
    pub video_playback_time: f64,
    /// Client user agent, if known.
    pub user_agent: Option<String>,
    /// Whether the reconciler has settled this event.
    pub processed: bool,
    /// Row creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Row update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A click accepted by the ingestor and waiting to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewClickEvent {
    /// Ad the click targets. Not yet checked for existence.
    pub ad_id: AdId,
    /// Playback position in seconds, stored as given.
    pub video_playback_time: f64,
    /// Originating client address, if known.
    pub ip_address: Option<String>,
    /// Client user agent, if known.
    pub user_agent: Option<String>,
    /// Acceptance time, used as the event timestamp.
    pub timestamp: DateTime<Utc>,
}

impl NewClickEvent {
    /// Creates a submission stamped with the current time.
    #[must_use]
    pub fn now(
        ad_id: AdId,
        video_playback_time: f64,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Self {
        Self {
            ad_id,
            video_playback_time,
            ip_address,
            user_agent,
            timestamp: Utc::now(),
        }
    }
}
