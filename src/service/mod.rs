//! Service layer: ingestion, reconciliation and analytics orchestration.
//!
//! [`ClickIngestor`] feeds clicks to the store through a bounded worker
//! pool, [`BacklogReconciler`] settles the unprocessed backlog, and
//! [`AnalyticsService`] computes snapshots on demand.

pub mod ads;
pub mod analytics;
pub mod ingest;
pub mod reconciler;

pub use ads::AdService;
pub use analytics::AnalyticsService;
pub use ingest::{ClickIngestor, IngestSettings, IngestWorkers};
pub use reconciler::BacklogReconciler;
