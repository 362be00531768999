//! Database row shapes for the `ads` and `click_events` tables.

use chrono::{DateTime, Utc};

use crate::domain::{AdClickTotals, AdId, AdRecord, ClickEvent, HourBucket, HourlyClickTotals};

/// Columns selected for an ad:
/// `id, image_url, target_url, title, description, created_at, updated_at`.
pub type AdRow = (
    i32,
    String,
    String,
    String,
    Option<String>,
    DateTime<Utc>,
    DateTime<Utc>,
);

/// Columns selected for a click event:
/// `id, ad_id, timestamp, ip_address, video_playback_time, user_agent,
/// processed, created_at, updated_at`.
pub type ClickRow = (
    i64,
    i32,
    DateTime<Utc>,
    Option<String>,
    f64,
    Option<String>,
    bool,
    DateTime<Utc>,
    DateTime<Utc>,
);

/// Columns of a window aggregate: `ad_id, total_clicks, avg_playback_time`.
pub type WindowTotalsRow = (i32, i64, f64);

/// Columns of an hourly aggregate:
/// `ad_id, hour (-1 for none), total_clicks, avg_playback_time`.
pub type HourlyTotalsRow = (i32, i32, i64, f64);

/// Converts an [`AdRow`] into an [`AdRecord`].
#[must_use]
pub fn ad_from_row(row: AdRow) -> AdRecord {
    let (id, image_url, target_url, title, description, created_at, updated_at) = row;
    AdRecord {
        id: AdId::new(id),
        image_url,
        target_url,
        title,
        description,
        created_at,
        updated_at,
    }
}

/// Converts a [`ClickRow`] into a [`ClickEvent`].
#[must_use]
pub fn click_from_row(row: ClickRow) -> ClickEvent {
    let (
        id,
        ad_id,
        timestamp,
        ip_address,
        video_playback_time,
        user_agent,
        processed,
        created_at,
        updated_at,
    ) = row;
    ClickEvent {
        id,
        ad_id: AdId::new(ad_id),
        timestamp,
        ip_address,
        video_playback_time,
        user_agent,
        processed,
        created_at,
        updated_at,
    }
}

/// Converts a [`WindowTotalsRow`] into [`AdClickTotals`].
#[must_use]
pub fn window_totals_from_row((ad_id, total_clicks, avg_playback_time): WindowTotalsRow) -> AdClickTotals {
    AdClickTotals {
        ad_id: AdId::new(ad_id),
        total_clicks,
        avg_playback_time,
    }
}

/// Converts an [`HourlyTotalsRow`] into [`HourlyClickTotals`].
#[must_use]
pub fn hourly_totals_from_row(
    (ad_id, hour, total_clicks, avg_playback_time): HourlyTotalsRow,
) -> HourlyClickTotals {
    HourlyClickTotals {
        ad_id: AdId::new(ad_id),
        hour: HourBucket::from_raw(hour),
        total_clicks,
        avg_playback_time,
    }
}
