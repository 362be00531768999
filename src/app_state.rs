//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::config::TrackerConfig;
use crate::metrics::TrackerMetrics;
use crate::persistence::EventStore;
use crate::service::{
    AdService, AnalyticsService, BacklogReconciler, ClickIngestor, IngestSettings, IngestWorkers,
};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Ad catalog lookups.
    pub ad_service: Arc<AdService>,
    /// Window and hourly analytics.
    pub analytics_service: Arc<AnalyticsService>,
    /// Click submission handle.
    pub ingestor: ClickIngestor,
    /// Service counters.
    pub metrics: Arc<TrackerMetrics>,
}

impl AppState {
    /// Wires the services over `store` and starts the ingest workers.
    ///
    /// The returned [`IngestWorkers`] finish once every clone of this state
    /// has been dropped and the click queue is drained.
    #[must_use]
    pub fn new(
        store: Arc<dyn EventStore>,
        reconciler: BacklogReconciler,
        metrics: Arc<TrackerMetrics>,
        config: &TrackerConfig,
    ) -> (Self, IngestWorkers) {
        let (ingestor, workers) = ClickIngestor::start(
            Arc::clone(&store),
            Arc::clone(&metrics),
            IngestSettings {
                workers: config.ingest_workers,
                queue_capacity: config.ingest_queue_capacity,
            },
        );
        let analytics_service = Arc::new(AnalyticsService::new(
            Arc::clone(&store),
            reconciler,
            Arc::clone(&metrics),
            config.reconcile_on_query,
        ));
        let ad_service = Arc::new(AdService::new(store));

        let state = Self {
            ad_service,
            analytics_service,
            ingestor,
            metrics,
        };
        (state, workers)
    }
}
