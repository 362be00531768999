//! Lookback windows accepted by the analytics endpoint.
//!
//! The set is closed: anything outside [`TimeWindow::ALL`] is rejected at
//! the HTTP boundary with [`TrackerError::InvalidTimeWindow`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::TrackerError;

/// A named lookback duration such as `"1h"` or `"7d"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TimeWindow {
    /// Last 15 minutes.
    FifteenMinutes,
    /// Last 30 minutes.
    ThirtyMinutes,
    /// Last hour.
    OneHour,
    /// Last 6 hours.
    SixHours,
    /// Last 12 hours.
    TwelveHours,
    /// Last 24 hours.
    #[default]
    OneDay,
    /// Last 7 days.
    SevenDays,
    /// Last 30 days.
    ThirtyDays,
}

impl TimeWindow {
    /// Every supported window, shortest first.
    pub const ALL: [Self; 8] = [
        Self::FifteenMinutes,
        Self::ThirtyMinutes,
        Self::OneHour,
        Self::SixHours,
        Self::TwelveHours,
        Self::OneDay,
        Self::SevenDays,
        Self::ThirtyDays,
    ];

    /// Returns the short token for this window.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::FifteenMinutes => "15m",
            Self::ThirtyMinutes => "30m",
            Self::OneHour => "1h",
            Self::SixHours => "6h",
            Self::TwelveHours => "12h",
            Self::OneDay => "24h",
            Self::SevenDays => "7d",
            Self::ThirtyDays => "30d",
        }
    }

    /// Returns the lookback duration.
    #[must_use]
    pub fn duration(self) -> TimeDelta {
        match self {
            Self::FifteenMinutes => TimeDelta::minutes(15),
            Self::ThirtyMinutes => TimeDelta::minutes(30),
            Self::OneHour => TimeDelta::hours(1),
            Self::SixHours => TimeDelta::hours(6),
            Self::TwelveHours => TimeDelta::hours(12),
            Self::OneDay => TimeDelta::hours(24),
            Self::SevenDays => TimeDelta::days(7),
            Self::ThirtyDays => TimeDelta::days(30),
        }
    }

    /// Returns the earliest instant included in the window ending at `now`.
    #[must_use]
    pub fn cutoff(self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.duration()
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for TimeWindow {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|w| w.token() == s)
            .ok_or_else(|| TrackerError::InvalidTimeWindow(s.to_string()))
    }
}
