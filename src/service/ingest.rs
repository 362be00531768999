//! Click ingestion through a bounded worker pool.
//!
//! Submissions go into a bounded `mpsc` queue and are written by a fixed
//! number of worker tasks. Delivery is at-most-once: a submission the store
//! rejects (unknown ad) or fails to write is logged and dropped, never
//! retried, and never reported to the submitter.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use crate::domain::NewClickEvent;
use crate::error::TrackerError;
use crate::metrics::TrackerMetrics;
use crate::persistence::EventStore;

/// Sizing of the ingest pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestSettings {
    /// Worker tasks draining the queue.
    pub workers: usize,
    /// Maximum submissions waiting in the queue.
    pub queue_capacity: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            workers: 8,
            queue_capacity: 10_000,
        }
    }
}

/// Handle used by request handlers to submit clicks.
///
/// Cheap to clone. The workers stop once every handle has been dropped and
/// the queue is empty.
#[derive(Debug, Clone)]
pub struct ClickIngestor {
    sender: mpsc::Sender<NewClickEvent>,
    metrics: Arc<TrackerMetrics>,
}

/// Join handles of the ingest workers.
#[derive(Debug)]
pub struct IngestWorkers {
    handles: Vec<JoinHandle<()>>,
}

impl ClickIngestor {
    /// Spawns the worker pool and returns the submission handle together
    /// with the workers' join handles.
    #[must_use]
    pub fn start(
        store: Arc<dyn EventStore>,
        metrics: Arc<TrackerMetrics>,
        settings: IngestSettings,
    ) -> (Self, IngestWorkers) {
        let (sender, receiver) = mpsc::channel(settings.queue_capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));

        let handles = (0..settings.workers.max(1))
            .map(|worker| {
                tokio::spawn(run_worker(
                    worker,
                    Arc::clone(&receiver),
                    Arc::clone(&store),
                    Arc::clone(&metrics),
                ))
            })
            .collect();

        tracing::info!(
            workers = settings.workers.max(1),
            queue_capacity = settings.queue_capacity.max(1),
            "click ingest workers started"
        );
        (Self { sender, metrics }, IngestWorkers { handles })
    }

    /// Queues a click for persistence without waiting on the store.
    ///
    /// Acceptance does not mean the click will be stored: the ad may not
    /// exist, or the write may fail, and neither outcome is reported back.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::IngestQueueFull`] when the queue is at
    /// capacity, or [`TrackerError::Internal`] if the workers have stopped.
    pub fn submit(&self, click: NewClickEvent) -> Result<(), TrackerError> {
        match self.sender.try_send(click) {
            Ok(()) => {
                self.metrics.click_accepted();
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(click)) => {
                self.metrics.click_rejected();
                tracing::warn!(ad_id = %click.ad_id, "ingest queue full, click rejected");
                Err(TrackerError::IngestQueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(TrackerError::Internal(
                "click ingest workers are not running".to_string(),
            )),
        }
    }

    /// Number of free slots left in the queue.
    #[must_use]
    pub fn available_capacity(&self) -> usize {
        self.sender.capacity()
    }
}

impl IngestWorkers {
    /// Waits for every worker to exit.
    ///
    /// Workers exit once all [`ClickIngestor`] handles are dropped and the
    /// queue has been drained, so this doubles as a drain on shutdown.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "ingest worker panicked");
            }
        }
    }
}

async fn run_worker(
    worker: usize,
    receiver: Arc<Mutex<mpsc::Receiver<NewClickEvent>>>,
    store: Arc<dyn EventStore>,
    metrics: Arc<TrackerMetrics>,
) {
    loop {
        let next = receiver.lock().await.recv().await;
        let Some(click) = next else {
            break;
        };
        persist_click(store.as_ref(), &metrics, &click).await;
    }
    tracing::debug!(worker, "ingest worker stopped");
}

/// Writes one click, absorbing every failure into logs and counters.
async fn persist_click(store: &dyn EventStore, metrics: &TrackerMetrics, click: &NewClickEvent) {
    match store.insert_click(click).await {
        Ok(click_id) => {
            metrics.click_persisted();
            tracing::info!(ad_id = %click.ad_id, click_id, "click event recorded");
        }
        Err(TrackerError::AdNotFound(ad_id)) => {
            metrics.click_dropped_unknown_ad();
            tracing::warn!(%ad_id, "ad not found, click dropped");
        }
        Err(e) => {
            metrics.click_failed();
            tracing::error!(ad_id = %click.ad_id, error = %e, "failed to insert click event");
        }
    }
}
