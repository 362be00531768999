//! Persistence layer: the event store for ads and click events.
//!
//! Provides the [`EventStore`] trait consumed by the service layer. The
//! production implementation uses `sqlx::PgPool`; [`MemoryEventStore`]
//! backs the service when persistence is disabled and in tests.

pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{AdClickTotals, AdId, AdRecord, ClickEvent, HourlyClickTotals, NewClickEvent};
use crate::error::TrackerError;

pub use memory::MemoryEventStore;
pub use postgres::PostgresEventStore;

/// Ordered, queryable store of ad definitions and click events.
///
/// Implementations must enforce that a click is only written when its ad
/// exists, in the same operation as the write, and must make
/// [`EventStore::mark_processed`] a no-op for events already processed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Lists all ads, newest first, ties by ascending id.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::PersistenceError`] on store failure.
    async fn list_ads(&self) -> Result<Vec<AdRecord>, TrackerError>;

    /// Fetches one ad by id.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::PersistenceError`] on store failure.
    async fn find_ad(&self, ad_id: AdId) -> Result<Option<AdRecord>, TrackerError>;

    /// Writes an unprocessed click event and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::AdNotFound`] when the ad does not exist at
    /// write time, or [`TrackerError::PersistenceError`] on store failure.
    async fn insert_click(&self, click: &NewClickEvent) -> Result<i64, TrackerError>;

    /// Returns up to `limit` unprocessed events ordered by timestamp, then id.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::PersistenceError`] on store failure.
    async fn fetch_unprocessed(&self, limit: usize) -> Result<Vec<ClickEvent>, TrackerError>;

    /// Marks one event processed if it is not already. Returns `true` when
    /// this call performed the transition.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::PersistenceError`] on store failure.
    async fn mark_processed(&self, click_id: i64) -> Result<bool, TrackerError>;

    /// Click count and mean playback time per ad for events at or after
    /// `cutoff`. Every ad appears, with zero totals when it has no events.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::PersistenceError`] on store failure.
    async fn window_totals(&self, cutoff: DateTime<Utc>)
    -> Result<Vec<AdClickTotals>, TrackerError>;

    /// Click count and mean playback time per (ad, UTC hour of day) for
    /// events at or after `since`, plus one sentinel row for each ad with no
    /// such events.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::PersistenceError`] on store failure.
    async fn hourly_totals(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<HourlyClickTotals>, TrackerError>;
}
