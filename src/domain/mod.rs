//! Domain layer: ads, click events, lookback windows and analytics values.
//!
//! Types here carry no I/O. The store layer persists [`AdRecord`]s and
//! [`ClickEvent`]s; the service layer turns store totals into
//! [`AnalyticsSnapshot`]s.

pub mod ad;
pub mod analytics;
pub mod click_event;
pub mod time_window;

pub use ad::{AdId, AdRecord, NewAd};
pub use analytics::{
    AdClickTotals, AnalyticsSnapshot, HourBucket, HourlyClickTotals, PLACEHOLDER_IMPRESSIONS,
    TimeFrame,
};
pub use click_event::{ClickEvent, NewClickEvent};
pub use time_window::TimeWindow;
