//! Computed ad performance metrics.
//!
//! Nothing here is persisted. Stores return raw per-ad (or per-ad, per-hour)
//! totals; this module turns them into [`AnalyticsSnapshot`]s and defines the
//! ordering dashboards rely on.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use super::{AdId, TimeWindow};

/// Impression count used as the CTR denominator for every ad.
///
/// Impressions are not tracked yet, so this is a stand-in value and the
/// resulting CTR is proportional to the click count only.
pub const PLACEHOLDER_IMPRESSIONS: f64 = 1000.0;

/// Click-through rate in percent against [`PLACEHOLDER_IMPRESSIONS`].
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn click_through_rate(total_clicks: i64) -> f64 {
    total_clicks as f64 / PLACEHOLDER_IMPRESSIONS * 100.0
}

/// Hour-of-day bucket in the hourly breakdown.
///
/// Declaration order is sort order: real hours first, then the sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HourBucket {
    /// UTC hour of day, `0..=23`.
    Hour(u8),
    /// The ad had no clicks in the whole trailing day.
    NoClicks,
}

impl HourBucket {
    /// Builds a bucket from the raw hour a store returns, where `-1` (or any
    /// value outside `0..=23`) marks the sentinel.
    #[must_use]
    pub fn from_raw(hour: i32) -> Self {
        match u8::try_from(hour) {
            Ok(h) if h < 24 => Self::Hour(h),
            _ => Self::NoClicks,
        }
    }

    /// Returns the hour as a signed integer with `-1` for the sentinel.
    #[must_use]
    pub fn as_raw(self) -> i32 {
        match self {
            Self::Hour(h) => i32::from(h),
            Self::NoClicks => -1,
        }
    }
}

/// Label describing what period a snapshot covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeFrame {
    /// A lookback window (`"1h"`, `"7d"`, ...).
    Window(TimeWindow),
    /// One bucket of the hourly breakdown (`"hour_13"` or `"no_clicks"`).
    Hourly(HourBucket),
}

impl fmt::Display for TimeFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Window(w) => f.write_str(w.token()),
            Self::Hourly(HourBucket::Hour(h)) => write!(f, "hour_{h}"),
            Self::Hourly(HourBucket::NoClicks) => f.write_str("no_clicks"),
        }
    }
}

impl Serialize for TimeFrame {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Per-ad click totals over a window, as returned by a store.
#[derive(Debug, Clone, PartialEq)]
pub struct AdClickTotals {
    /// Ad the totals belong to.
    pub ad_id: AdId,
    /// Number of matching click events.
    pub total_clicks: i64,
    /// Mean playback time of the matching events, `0.0` when there are none.
    pub avg_playback_time: f64,
}

/// Per-ad, per-hour click totals over the trailing day.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyClickTotals {
    /// Ad the totals belong to.
    pub ad_id: AdId,
    /// Hour of day, or the sentinel for ads with no clicks.
    pub hour: HourBucket,
    /// Number of matching click events.
    pub total_clicks: i64,
    /// Mean playback time of the matching events, `0.0` when there are none.
    pub avg_playback_time: f64,
}

/// Performance metrics for one ad over one time frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsSnapshot {
    /// Ad the metrics describe.
    pub ad_id: AdId,
    /// Click count in the time frame.
    pub total_clicks: i64,
    /// Click-through rate in percent (see [`PLACEHOLDER_IMPRESSIONS`]).
    pub ctr: f64,
    /// Mean playback time at click, in seconds.
    pub avg_playback_time: f64,
    /// Period covered.
    pub time_frame: TimeFrame,
    /// When the snapshot was computed.
    pub last_updated: DateTime<Utc>,
}

impl AnalyticsSnapshot {
    /// Builds a snapshot, deriving the CTR from the click count.
    #[must_use]
    pub fn new(
        ad_id: AdId,
        total_clicks: i64,
        avg_playback_time: f64,
        time_frame: TimeFrame,
        last_updated: DateTime<Utc>,
    ) -> Self {
        Self {
            ad_id,
            total_clicks,
            ctr: click_through_rate(total_clicks),
            avg_playback_time,
            time_frame,
            last_updated,
        }
    }

    /// Snapshot of window totals.
    #[must_use]
    pub fn from_window(totals: AdClickTotals, window: TimeWindow, now: DateTime<Utc>) -> Self {
        Self::new(
            totals.ad_id,
            totals.total_clicks,
            totals.avg_playback_time,
            TimeFrame::Window(window),
            now,
        )
    }

    /// Snapshot of one hourly bucket.
    #[must_use]
    pub fn from_hourly(totals: HourlyClickTotals, now: DateTime<Utc>) -> Self {
        Self::new(
            totals.ad_id,
            totals.total_clicks,
            totals.avg_playback_time,
            TimeFrame::Hourly(totals.hour),
            now,
        )
    }

    fn hour_bucket(&self) -> Option<HourBucket> {
        match self.time_frame {
            TimeFrame::Hourly(bucket) => Some(bucket),
            TimeFrame::Window(_) => None,
        }
    }
}

/// Orders by click count descending, then ad id ascending.
///
/// Ads without clicks therefore land after every ad that has some.
pub fn sort_by_clicks(snapshots: &mut [AnalyticsSnapshot]) {
    snapshots.sort_by(|a, b| {
        b.total_clicks
            .cmp(&a.total_clicks)
            .then_with(|| a.ad_id.cmp(&b.ad_id))
    });
}

/// Orders by ad id, then hour, with the `no_clicks` sentinel last per ad.
pub fn sort_by_ad_and_hour(snapshots: &mut [AnalyticsSnapshot]) {
    snapshots.sort_by(|a, b| match a.ad_id.cmp(&b.ad_id) {
        Ordering::Equal => a.hour_bucket().cmp(&b.hour_bucket()),
        other => other,
    });
}
