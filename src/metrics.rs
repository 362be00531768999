//! Prometheus metrics for the tracker.
//!
//! [`TrackerMetrics`] owns its own [`Registry`] and is constructed once at
//! startup, then shared through an `Arc` with every component that records
//! into it. [`TrackerMetrics::render`] encodes the registry in the
//! Prometheus text format for `GET /metrics`.

use std::time::Duration;

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

use crate::error::TrackerError;

/// Counters for the ingest, reconcile and analytics paths, plus HTTP
/// request count and latency.
pub struct TrackerMetrics {
    registry: Registry,
    clicks_accepted: IntCounter,
    clicks_rejected: IntCounter,
    clicks_persisted: IntCounter,
    clicks_dropped_unknown_ad: IntCounter,
    clicks_failed: IntCounter,
    events_reconciled: IntCounter,
    reconcile_failures: IntCounter,
    analytics_queries: IntCounter,
    http_requests: IntCounterVec,
    http_request_duration: HistogramVec,
}

impl std::fmt::Debug for TrackerMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackerMetrics")
            .field("snapshot", &self.snapshot())
            .finish_non_exhaustive()
    }
}

/// Point-in-time copy of the domain counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Clicks queued for persistence.
    pub clicks_accepted: u64,
    /// Clicks refused because the ingest queue was full.
    pub clicks_rejected: u64,
    /// Clicks written to the store.
    pub clicks_persisted: u64,
    /// Clicks dropped because their ad did not exist.
    pub clicks_dropped_unknown_ad: u64,
    /// Clicks dropped because the store write failed.
    pub clicks_failed: u64,
    /// Events transitioned to processed.
    pub events_reconciled: u64,
    /// Failed reconcile fetches or per-event updates.
    pub reconcile_failures: u64,
    /// Analytics queries served.
    pub analytics_queries: u64,
}

impl TrackerMetrics {
    /// Creates a fresh registry with every metric registered at zero.
    ///
    /// # Errors
    ///
    /// Returns a [`prometheus::Error`] if a metric cannot be registered.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let counter = |name: &str, help: &str| -> Result<IntCounter, prometheus::Error> {
            let c = IntCounter::new(name, help)?;
            registry.register(Box::new(c.clone()))?;
            Ok(c)
        };

        let clicks_accepted = counter("ad_clicks_accepted_total", "Clicks queued for persistence")?;
        let clicks_rejected = counter(
            "ad_clicks_rejected_total",
            "Clicks refused because the ingest queue was full",
        )?;
        let clicks_persisted = counter("ad_clicks_persisted_total", "Clicks written to the store")?;
        let clicks_dropped_unknown_ad = counter(
            "ad_clicks_dropped_unknown_ad_total",
            "Clicks dropped because their ad did not exist",
        )?;
        let clicks_failed = counter(
            "ad_clicks_failed_total",
            "Clicks dropped because the store write failed",
        )?;
        let events_reconciled = counter(
            "click_events_reconciled_total",
            "Click events transitioned to processed",
        )?;
        let reconcile_failures = counter(
            "reconcile_failures_total",
            "Failed reconcile fetches or per-event updates",
        )?;
        let analytics_queries = counter("analytics_queries_total", "Analytics queries served")?;

        let http_requests = IntCounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests"),
            &["method", "endpoint", "status"],
        )?;
        registry.register(Box::new(http_requests.clone()))?;

        let http_request_duration = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "Duration of HTTP requests in seconds",
            ),
            &["method", "endpoint"],
        )?;
        registry.register(Box::new(http_request_duration.clone()))?;

        Ok(Self {
            registry,
            clicks_accepted,
            clicks_rejected,
            clicks_persisted,
            clicks_dropped_unknown_ad,
            clicks_failed,
            events_reconciled,
            reconcile_failures,
            analytics_queries,
            http_requests,
            http_request_duration,
        })
    }

    /// Records a click accepted into the ingest queue.
    pub fn click_accepted(&self) {
        self.clicks_accepted.inc();
    }

    /// Records a click refused by backpressure.
    pub fn click_rejected(&self) {
        self.clicks_rejected.inc();
    }

    /// Records a click written to the store.
    pub fn click_persisted(&self) {
        self.clicks_persisted.inc();
    }

    /// Records a click dropped for an unknown ad.
    pub fn click_dropped_unknown_ad(&self) {
        self.clicks_dropped_unknown_ad.inc();
    }

    /// Records a click lost to a store failure.
    pub fn click_failed(&self) {
        self.clicks_failed.inc();
    }

    /// Records `count` events marked processed.
    pub fn events_reconciled(&self, count: u64) {
        self.events_reconciled.inc_by(count);
    }

    /// Records a reconcile failure.
    pub fn reconcile_failure(&self) {
        self.reconcile_failures.inc();
    }

    /// Records an analytics query.
    pub fn analytics_query(&self) {
        self.analytics_queries.inc();
    }

    /// Records one completed HTTP request.
    ///
    /// `endpoint` should be the matched route template, not the raw path,
    /// to keep label cardinality bounded.
    pub fn observe_request(&self, method: &str, endpoint: &str, status: u16, elapsed: Duration) {
        let status = status.to_string();
        self.http_requests
            .with_label_values(&[method, endpoint, status.as_str()])
            .inc();
        self.http_request_duration
            .with_label_values(&[method, endpoint])
            .observe(elapsed.as_secs_f64());
    }

    /// Copies the current domain counter values.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            clicks_accepted: self.clicks_accepted.get(),
            clicks_rejected: self.clicks_rejected.get(),
            clicks_persisted: self.clicks_persisted.get(),
            clicks_dropped_unknown_ad: self.clicks_dropped_unknown_ad.get(),
            clicks_failed: self.clicks_failed.get(),
            events_reconciled: self.events_reconciled.get(),
            reconcile_failures: self.reconcile_failures.get(),
            analytics_queries: self.analytics_queries.get(),
        }
    }

    /// Encodes every registered metric in the Prometheus text format.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Internal`] if encoding fails.
    pub fn render(&self) -> Result<String, TrackerError> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| TrackerError::Internal(format!("failed to encode metrics: {e}")))?;
        String::from_utf8(buffer)
            .map_err(|e| TrackerError::Internal(format!("metrics are not valid UTF-8: {e}")))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn registry() -> TrackerMetrics {
        let Ok(metrics) = TrackerMetrics::new() else {
            panic!("metrics should register");
        };
        metrics
    }

    #[test]
    fn new_registry_is_zeroed() {
        let snapshot = registry().snapshot();
        assert_eq!(snapshot.clicks_accepted, 0);
        assert_eq!(snapshot.events_reconciled, 0);
    }

    #[test]
    fn counters_accumulate_independently() {
        let metrics = registry();
        metrics.click_accepted();
        metrics.click_accepted();
        metrics.click_dropped_unknown_ad();
        metrics.events_reconciled(5);
        metrics.events_reconciled(3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.clicks_accepted, 2);
        assert_eq!(snapshot.clicks_dropped_unknown_ad, 1);
        assert_eq!(snapshot.clicks_persisted, 0);
        assert_eq!(snapshot.events_reconciled, 8);
    }

    #[test]
    fn registries_are_independent() {
        let first = registry();
        let second = registry();
        first.click_persisted();
        assert_eq!(first.snapshot().clicks_persisted, 1);
        assert_eq!(second.snapshot().clicks_persisted, 0);
    }

    #[test]
    fn render_emits_text_exposition() {
        let metrics = registry();
        metrics.click_accepted();
        metrics.observe_request("GET", "/api/v1/ads", 200, Duration::from_millis(12));

        let Ok(text) = metrics.render() else {
            panic!("metrics should encode");
        };
        assert!(text.contains("# TYPE ad_clicks_accepted_total counter"));
        assert!(text.contains("ad_clicks_accepted_total 1"));
        assert!(text.contains(
            r#"http_requests_total{endpoint="/api/v1/ads",method="GET",status="200"} 1"#
        ));
        assert!(text.contains("http_request_duration_seconds_count"));
    }
}
