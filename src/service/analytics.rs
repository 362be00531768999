//! Windowed and hourly ad performance analytics.
//!
//! Aggregates are recomputed from the event store on every call. Click
//! counts include every matching event whether or not the reconciler has
//! processed it yet.

use std::sync::Arc;

use chrono::{TimeDelta, Utc};

use super::BacklogReconciler;
use crate::domain::analytics::{sort_by_ad_and_hour, sort_by_clicks};
use crate::domain::{AnalyticsSnapshot, TimeWindow};
use crate::error::TrackerError;
use crate::metrics::TrackerMetrics;
use crate::persistence::EventStore;

/// Computes [`AnalyticsSnapshot`]s from the event store.
#[derive(Clone)]
pub struct AnalyticsService {
    store: Arc<dyn EventStore>,
    reconciler: BacklogReconciler,
    metrics: Arc<TrackerMetrics>,
    reconcile_on_query: bool,
}

impl std::fmt::Debug for AnalyticsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyticsService")
            .field("reconciler", &self.reconciler)
            .field("reconcile_on_query", &self.reconcile_on_query)
            .finish_non_exhaustive()
    }
}

impl AnalyticsService {
    /// Creates the service. With `reconcile_on_query` set, every query first
    /// runs one reconcile batch.
    #[must_use]
    pub fn new(
        store: Arc<dyn EventStore>,
        reconciler: BacklogReconciler,
        metrics: Arc<TrackerMetrics>,
        reconcile_on_query: bool,
    ) -> Self {
        Self {
            store,
            reconciler,
            metrics,
            reconcile_on_query,
        }
    }

    /// Per-ad metrics over `window`, ordered by click count descending then
    /// ad id ascending. Ads without clicks in the window are included with
    /// zero totals.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::PersistenceError`] if the store query fails.
    pub async fn aggregate(
        &self,
        window: TimeWindow,
    ) -> Result<Vec<AnalyticsSnapshot>, TrackerError> {
        self.metrics.analytics_query();
        self.settle_backlog().await;

        let now = Utc::now();
        let totals = self.store.window_totals(window.cutoff(now)).await?;
        let mut snapshots: Vec<AnalyticsSnapshot> = totals
            .into_iter()
            .map(|t| AnalyticsSnapshot::from_window(t, window, now))
            .collect();
        sort_by_clicks(&mut snapshots);

        tracing::debug!(%window, ads = snapshots.len(), "window analytics computed");
        Ok(snapshots)
    }

    /// Per-ad, per-hour-of-day metrics over the trailing 24 hours, ordered by
    /// ad id then hour. Ads without clicks get a single `no_clicks` entry,
    /// placed after any hour.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::PersistenceError`] if the store query fails.
    pub async fn hourly_breakdown(&self) -> Result<Vec<AnalyticsSnapshot>, TrackerError> {
        self.metrics.analytics_query();
        self.settle_backlog().await;

        let now = Utc::now();
        let totals = self.store.hourly_totals(now - TimeDelta::hours(24)).await?;
        let mut snapshots: Vec<AnalyticsSnapshot> = totals
            .into_iter()
            .map(|t| AnalyticsSnapshot::from_hourly(t, now))
            .collect();
        sort_by_ad_and_hour(&mut snapshots);

        tracing::debug!(rows = snapshots.len(), "hourly analytics computed");
        Ok(snapshots)
    }

    async fn settle_backlog(&self) {
        if !self.reconcile_on_query {
            return;
        }
        if let Err(e) = self.reconciler.reconcile().await {
            tracing::error!(error = %e, "failed to process pending clicks before query");
        }
    }
}
