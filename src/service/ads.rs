//! Ad catalog lookups.

use std::sync::Arc;

use crate::domain::{AdId, AdRecord};
use crate::error::TrackerError;
use crate::persistence::EventStore;

/// Read-only access to ad definitions.
#[derive(Clone)]
pub struct AdService {
    store: Arc<dyn EventStore>,
}

impl std::fmt::Debug for AdService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdService").finish_non_exhaustive()
    }
}

impl AdService {
    /// Creates the service over a store.
    #[must_use]
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// Lists every ad, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::PersistenceError`] on store failure.
    pub async fn list_ads(&self) -> Result<Vec<AdRecord>, TrackerError> {
        self.store.list_ads().await
    }

    /// Fetches one ad.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::AdNotFound`] if no such ad exists, or
    /// [`TrackerError::PersistenceError`] on store failure.
    pub async fn get_ad(&self, ad_id: AdId) -> Result<AdRecord, TrackerError> {
        self.store
            .find_ad(ad_id)
            .await?
            .ok_or(TrackerError::AdNotFound(ad_id))
    }
}
