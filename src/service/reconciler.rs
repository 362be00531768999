//! Backlog reconciliation: settles unprocessed click events.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::TrackerError;
use crate::metrics::TrackerMetrics;
use crate::persistence::EventStore;

/// Default number of events settled per run.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Marks unprocessed click events as processed, oldest first.
///
/// Runs may overlap (the scheduled sweep and query preludes are not
/// coordinated). The store's conditional update makes that safe: an event
/// already processed by another run is skipped, not re-processed.
#[derive(Clone)]
pub struct BacklogReconciler {
    store: Arc<dyn EventStore>,
    metrics: Arc<TrackerMetrics>,
    batch_size: usize,
}

impl std::fmt::Debug for BacklogReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BacklogReconciler")
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl BacklogReconciler {
    /// Creates a reconciler that settles at most `batch_size` events per run.
    #[must_use]
    pub fn new(store: Arc<dyn EventStore>, metrics: Arc<TrackerMetrics>, batch_size: usize) -> Self {
        Self {
            store,
            metrics,
            batch_size: batch_size.max(1),
        }
    }

    /// Settles one batch of the backlog and returns how many events this
    /// run transitioned to processed.
    ///
    /// A failed update leaves that event unprocessed for a later run.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::PersistenceError`] if the backlog cannot be
    /// fetched; nothing is marked in that case.
    pub async fn reconcile(&self) -> Result<usize, TrackerError> {
        let pending = self
            .store
            .fetch_unprocessed(self.batch_size)
            .await
            .inspect_err(|_| self.metrics.reconcile_failure())?;

        let mut processed = 0_usize;
        for click in &pending {
            match self.store.mark_processed(click.id).await {
                Ok(true) => processed += 1,
                Ok(false) => {
                    tracing::debug!(click_id = click.id, "click already processed");
                }
                Err(e) => {
                    self.metrics.reconcile_failure();
                    tracing::error!(click_id = click.id, error = %e, "failed to mark click processed");
                }
            }
        }

        self.metrics
            .events_reconciled(u64::try_from(processed).unwrap_or(u64::MAX));
        if processed > 0 {
            tracing::debug!(fetched = pending.len(), processed, "backlog reconciled");
        }
        Ok(processed)
    }

    /// Spawns a task that reconciles on a fixed interval until aborted.
    #[must_use]
    pub fn spawn_sweep(self, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::info!(interval_secs = every.as_secs(), batch_size = self.batch_size, "reconcile sweep started");
            loop {
                ticker.tick().await;
                if let Err(e) = self.reconcile().await {
                    tracing::error!(error = %e, "reconcile sweep failed");
                }
            }
        })
    }
}
