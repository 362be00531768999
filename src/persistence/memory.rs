//! In-process event store.
//!
//! [`MemoryEventStore`] keeps ads and click events in ordered maps behind a
//! single [`tokio::sync::RwLock`]. Every write takes the write lock, so the
//! ad-exists check and the click insert happen atomically, the same guarantee
//! the PostgreSQL foreign key gives.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Timelike, Utc};
use tokio::sync::RwLock;

use super::EventStore;
use crate::domain::{
    AdClickTotals, AdId, AdRecord, ClickEvent, HourBucket, HourlyClickTotals, NewAd,
    NewClickEvent,
};
use crate::error::TrackerError;

/// Volatile event store. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryEventStore {
    state: RwLock<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    ads: BTreeMap<AdId, AdRecord>,
    clicks: BTreeMap<i64, ClickEvent>,
    last_ad_id: i32,
    last_click_id: i64,
}

/// Running count and playback sum for one group of clicks.
#[derive(Debug, Default, Clone, Copy)]
struct Accumulator {
    count: i64,
    playback_sum: f64,
}

impl Accumulator {
    fn add(&mut self, playback: f64) {
        self.count += 1;
        self.playback_sum += playback;
    }

    #[allow(clippy::cast_precision_loss)]
    fn mean(self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.playback_sum / self.count as f64
        }
    }
}

impl MemoryEventStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Provisions a new ad and returns it with its assigned id.
    pub async fn insert_ad(&self, ad: NewAd) -> AdRecord {
        let mut state = self.state.write().await;
        state.last_ad_id += 1;
        let now = Utc::now();
        let record = AdRecord {
            id: AdId::new(state.last_ad_id),
            image_url: ad.image_url,
            target_url: ad.target_url,
            title: ad.title,
            description: ad.description,
            created_at: now,
            updated_at: now,
        };
        state.ads.insert(record.id, record.clone());
        record
    }

    /// Deletes an ad together with all of its click events. Returns `false`
    /// if the ad did not exist.
    pub async fn delete_ad(&self, ad_id: AdId) -> bool {
        let mut state = self.state.write().await;
        if state.ads.remove(&ad_id).is_none() {
            return false;
        }
        state.clicks.retain(|_, click| click.ad_id != ad_id);
        true
    }

    /// Inserts the sample ads when no ads exist. Returns how many were
    /// inserted.
    pub async fn seed_sample_ads(&self) -> usize {
        if !self.state.read().await.ads.is_empty() {
            return 0;
        }
        let samples = NewAd::samples();
        let count = samples.len();
        for ad in samples {
            self.insert_ad(ad).await;
        }
        count
    }

    /// Returns a copy of every stored click event in id order.
    pub async fn clicks(&self) -> Vec<ClickEvent> {
        self.state.read().await.clicks.values().cloned().collect()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn list_ads(&self) -> Result<Vec<AdRecord>, TrackerError> {
        let state = self.state.read().await;
        let mut ads: Vec<AdRecord> = state.ads.values().cloned().collect();
        ads.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(ads)
    }

    async fn find_ad(&self, ad_id: AdId) -> Result<Option<AdRecord>, TrackerError> {
        Ok(self.state.read().await.ads.get(&ad_id).cloned())
    }

    async fn insert_click(&self, click: &NewClickEvent) -> Result<i64, TrackerError> {
        let mut state = self.state.write().await;
        if !state.ads.contains_key(&click.ad_id) {
            return Err(TrackerError::AdNotFound(click.ad_id));
        }
        state.last_click_id += 1;
        let id = state.last_click_id;
        let now = Utc::now();
        state.clicks.insert(
            id,
            ClickEvent {
                id,
                ad_id: click.ad_id,
                timestamp: click.timestamp,
                ip_address: click.ip_address.clone(),
                video_playback_time: click.video_playback_time,
                user_agent: click.user_agent.clone(),
                processed: false,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    async fn fetch_unprocessed(&self, limit: usize) -> Result<Vec<ClickEvent>, TrackerError> {
        let state = self.state.read().await;
        let mut pending: Vec<ClickEvent> = state
            .clicks
            .values()
            .filter(|click| !click.processed)
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
        pending.truncate(limit);
        Ok(pending)
    }

    async fn mark_processed(&self, click_id: i64) -> Result<bool, TrackerError> {
        let mut state = self.state.write().await;
        match state.clicks.get_mut(&click_id) {
            Some(click) if !click.processed => {
                click.processed = true;
                click.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn window_totals(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<AdClickTotals>, TrackerError> {
        let state = self.state.read().await;
        let mut per_ad: BTreeMap<AdId, Accumulator> =
            state.ads.keys().map(|id| (*id, Accumulator::default())).collect();

        for click in state.clicks.values().filter(|c| c.timestamp >= cutoff) {
            if let Some(acc) = per_ad.get_mut(&click.ad_id) {
                acc.add(click.video_playback_time);
            }
        }

        Ok(per_ad
            .into_iter()
            .map(|(ad_id, acc)| AdClickTotals {
                ad_id,
                total_clicks: acc.count,
                avg_playback_time: acc.mean(),
            })
            .collect())
    }

    async fn hourly_totals(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<HourlyClickTotals>, TrackerError> {
        let state = self.state.read().await;
        let mut per_ad: BTreeMap<AdId, BTreeMap<u8, Accumulator>> =
            state.ads.keys().map(|id| (*id, BTreeMap::new())).collect();

        for click in state.clicks.values().filter(|c| c.timestamp >= since) {
            if let Some(hours) = per_ad.get_mut(&click.ad_id) {
                let hour = u8::try_from(click.timestamp.hour()).unwrap_or(u8::MAX);
                hours.entry(hour).or_default().add(click.video_playback_time);
            }
        }

        let mut rows = Vec::new();
        for (ad_id, hours) in per_ad {
            if hours.is_empty() {
                rows.push(HourlyClickTotals {
                    ad_id,
                    hour: HourBucket::NoClicks,
                    total_clicks: 0,
                    avg_playback_time: 0.0,
                });
                continue;
            }
            rows.extend(hours.into_iter().map(|(hour, acc)| HourlyClickTotals {
                ad_id,
                hour: HourBucket::Hour(hour),
                total_clicks: acc.count,
                avg_playback_time: acc.mean(),
            }));
        }
        Ok(rows)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    fn ad(title: &str) -> NewAd {
        NewAd {
            image_url: format!("https://cdn.test/{title}.jpg"),
            target_url: format!("https://shop.test/{title}"),
            title: title.to_string(),
            description: None,
        }
    }

    fn click_at(ad_id: AdId, playback: f64, timestamp: DateTime<Utc>) -> NewClickEvent {
        NewClickEvent {
            ad_id,
            video_playback_time: playback,
            ip_address: Some("10.0.0.1".to_string()),
            user_agent: None,
            timestamp,
        }
    }

    #[tokio::test]
    async fn insert_click_for_missing_ad_is_rejected() {
        let store = MemoryEventStore::new();
        let result = store
            .insert_click(&click_at(AdId::new(9999), 1.0, Utc::now()))
            .await;
        assert!(matches!(result, Err(TrackerError::AdNotFound(id)) if id == AdId::new(9999)));
        assert!(store.clicks().await.is_empty());
    }

    #[tokio::test]
    async fn inserted_click_starts_unprocessed() {
        let store = MemoryEventStore::new();
        let a = store.insert_ad(ad("a")).await;
        let Ok(id) = store.insert_click(&click_at(a.id, 4.5, Utc::now())).await else {
            panic!("insert should succeed");
        };
        let clicks = store.clicks().await;
        assert_eq!(clicks.len(), 1);
        let Some(click) = clicks.first() else {
            panic!("click missing");
        };
        assert_eq!(click.id, id);
        assert!(!click.processed);
        assert_eq!(click.video_playback_time, 4.5);
    }

    #[tokio::test]
    async fn fetch_unprocessed_orders_by_timestamp_then_id() {
        let store = MemoryEventStore::new();
        let a = store.insert_ad(ad("a")).await;
        let t0 = Utc::now() - TimeDelta::minutes(10);
        let t1 = t0 + TimeDelta::minutes(1);
        // Inserted out of time order, with a timestamp collision.
        let _ = store.insert_click(&click_at(a.id, 0.0, t1)).await;
        let _ = store.insert_click(&click_at(a.id, 0.0, t0)).await;
        let _ = store.insert_click(&click_at(a.id, 0.0, t0)).await;

        let Ok(pending) = store.fetch_unprocessed(10).await else {
            panic!("fetch should succeed");
        };
        let ids: Vec<i64> = pending.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);

        let Ok(limited) = store.fetch_unprocessed(2).await else {
            panic!("fetch should succeed");
        };
        assert_eq!(limited.len(), 2);
    }

    #[tokio::test]
    async fn mark_processed_is_one_way_and_idempotent() {
        let store = MemoryEventStore::new();
        let a = store.insert_ad(ad("a")).await;
        let Ok(id) = store.insert_click(&click_at(a.id, 0.0, Utc::now())).await else {
            panic!("insert should succeed");
        };
        assert!(matches!(store.mark_processed(id).await, Ok(true)));
        assert!(matches!(store.mark_processed(id).await, Ok(false)));
        assert!(matches!(store.mark_processed(12345).await, Ok(false)));
        assert!(store.clicks().await.iter().all(|c| c.processed));
    }

    #[tokio::test]
    async fn window_totals_left_join_includes_idle_ads() {
        let store = MemoryEventStore::new();
        let busy = store.insert_ad(ad("busy")).await;
        let idle = store.insert_ad(ad("idle")).await;
        let now = Utc::now();
        let _ = store.insert_click(&click_at(busy.id, 10.0, now)).await;
        let _ = store.insert_click(&click_at(busy.id, 30.0, now)).await;
        let _ = store
            .insert_click(&click_at(busy.id, 99.0, now - TimeDelta::hours(3)))
            .await;

        let Ok(totals) = store.window_totals(now - TimeDelta::hours(1)).await else {
            panic!("totals should succeed");
        };
        assert_eq!(totals.len(), 2);
        let Some(busy_totals) = totals.iter().find(|t| t.ad_id == busy.id) else {
            panic!("busy ad missing");
        };
        assert_eq!(busy_totals.total_clicks, 2);
        assert_eq!(busy_totals.avg_playback_time, 20.0);
        let Some(idle_totals) = totals.iter().find(|t| t.ad_id == idle.id) else {
            panic!("idle ad missing");
        };
        assert_eq!(idle_totals.total_clicks, 0);
        assert_eq!(idle_totals.avg_playback_time, 0.0);
    }

    #[tokio::test]
    async fn hourly_totals_bucket_by_utc_hour() {
        let store = MemoryEventStore::new();
        let a = store.insert_ad(ad("a")).await;
        let b = store.insert_ad(ad("b")).await;
        let now = Utc::now();
        let earlier = now - TimeDelta::hours(2);
        let _ = store.insert_click(&click_at(a.id, 6.0, now)).await;
        let _ = store.insert_click(&click_at(a.id, 2.0, earlier)).await;
        let _ = store.insert_click(&click_at(a.id, 4.0, earlier)).await;
        // Outside the trailing day.
        let _ = store
            .insert_click(&click_at(b.id, 1.0, now - TimeDelta::hours(30)))
            .await;

        let Ok(rows) = store.hourly_totals(now - TimeDelta::hours(24)).await else {
            panic!("hourly totals should succeed");
        };
        let a_rows: Vec<_> = rows.iter().filter(|r| r.ad_id == a.id).collect();
        assert_eq!(a_rows.len(), 2);
        let Some(earlier_row) = a_rows
            .iter()
            .find(|r| r.hour == HourBucket::Hour(u8::try_from(earlier.hour()).unwrap_or(0)))
        else {
            panic!("bucket for earlier hour missing");
        };
        assert_eq!(earlier_row.total_clicks, 2);
        assert_eq!(earlier_row.avg_playback_time, 3.0);

        let b_rows: Vec<_> = rows.iter().filter(|r| r.ad_id == b.id).collect();
        assert_eq!(b_rows.len(), 1);
        let Some(sentinel) = b_rows.first() else {
            panic!("sentinel missing");
        };
        assert_eq!(sentinel.hour, HourBucket::NoClicks);
        assert_eq!(sentinel.total_clicks, 0);
    }

    #[tokio::test]
    async fn delete_ad_cascades_to_clicks() {
        let store = MemoryEventStore::new();
        let a = store.insert_ad(ad("a")).await;
        let b = store.insert_ad(ad("b")).await;
        let _ = store.insert_click(&click_at(a.id, 0.0, Utc::now())).await;
        let _ = store.insert_click(&click_at(b.id, 0.0, Utc::now())).await;

        assert!(store.delete_ad(a.id).await);
        assert!(!store.delete_ad(a.id).await);
        let clicks = store.clicks().await;
        assert_eq!(clicks.len(), 1);
        assert!(clicks.iter().all(|c| c.ad_id == b.id));
    }

    #[tokio::test]
    async fn seeding_only_fills_an_empty_store() {
        let store = MemoryEventStore::new();
        assert_eq!(store.seed_sample_ads().await, 2);
        assert_eq!(store.seed_sample_ads().await, 0);
        let Ok(ads) = store.list_ads().await else {
            panic!("list should succeed");
        };
        assert_eq!(ads.len(), 2);
    }
}
