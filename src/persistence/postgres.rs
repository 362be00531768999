//! PostgreSQL implementation of the event store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::EventStore;
use super::models::{
    AdRow, ClickRow, HourlyTotalsRow, WindowTotalsRow, ad_from_row, click_from_row,
    hourly_totals_from_row, window_totals_from_row,
};
use crate::config::TrackerConfig;
use crate::domain::{AdClickTotals, AdId, AdRecord, ClickEvent, HourlyClickTotals, NewAd, NewClickEvent};
use crate::error::TrackerError;

const AD_COLUMNS: &str =
    "id, image_url, target_url, title, description, created_at, updated_at";

/// PostgreSQL-backed event store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    /// Creates a store over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool sized from the configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`TrackerError::PersistenceError`] if the database cannot
    /// be reached within the connect timeout.
    pub async fn connect(config: &TrackerConfig) -> Result<Self, TrackerError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(std::time::Duration::from_secs(
                config.database_connect_timeout_secs,
            ))
            .connect(&config.database_url)
            .await
            .map_err(|e| TrackerError::PersistenceError(e.to_string()))?;
        Ok(Self::new(pool))
    }

    /// Applies the embedded schema migrations.
    ///
    /// # Errors
    ///
    /// Returns a [`TrackerError::PersistenceError`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), TrackerError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| TrackerError::PersistenceError(e.to_string()))
    }

    /// Inserts the sample ads when the `ads` table is empty. Returns how
    /// many were inserted.
    ///
    /// # Errors
    ///
    /// Returns a [`TrackerError::PersistenceError`] on database failure.
    pub async fn seed_sample_ads(&self) -> Result<usize, TrackerError> {
        let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM ads")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| TrackerError::PersistenceError(e.to_string()))?;
        if existing > 0 {
            return Ok(0);
        }

        let samples = NewAd::samples();
        for ad in &samples {
            sqlx::query(
                "INSERT INTO ads (image_url, target_url, title, description) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(&ad.image_url)
            .bind(&ad.target_url)
            .bind(&ad.title)
            .bind(&ad.description)
            .execute(&self.pool)
            .await
            .map_err(|e| TrackerError::PersistenceError(e.to_string()))?;
        }
        Ok(samples.len())
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    async fn list_ads(&self) -> Result<Vec<AdRecord>, TrackerError> {
        let rows = sqlx::query_as::<_, AdRow>(&format!(
            "SELECT {AD_COLUMNS} FROM ads ORDER BY created_at DESC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TrackerError::PersistenceError(e.to_string()))?;

        Ok(rows.into_iter().map(ad_from_row).collect())
    }

    async fn find_ad(&self, ad_id: AdId) -> Result<Option<AdRecord>, TrackerError> {
        let row = sqlx::query_as::<_, AdRow>(&format!("SELECT {AD_COLUMNS} FROM ads WHERE id = $1"))
            .bind(ad_id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| TrackerError::PersistenceError(e.to_string()))?;

        Ok(row.map(ad_from_row))
    }

    async fn insert_click(&self, click: &NewClickEvent) -> Result<i64, TrackerError> {
        // The foreign key on ad_id rejects clicks for missing ads atomically.
        sqlx::query_scalar::<_, i64>(
            "INSERT INTO click_events \
             (ad_id, timestamp, ip_address, video_playback_time, user_agent, processed) \
             VALUES ($1, $2, $3, $4, $5, FALSE) RETURNING id",
        )
        .bind(click.ad_id.get())
        .bind(click.timestamp)
        .bind(&click.ip_address)
        .bind(click.video_playback_time)
        .bind(&click.user_agent)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db) if db.is_foreign_key_violation() => TrackerError::AdNotFound(click.ad_id),
            _ => TrackerError::PersistenceError(e.to_string()),
        })
    }

    async fn fetch_unprocessed(&self, limit: usize) -> Result<Vec<ClickEvent>, TrackerError> {
        let rows = sqlx::query_as::<_, ClickRow>(
            "SELECT id, ad_id, timestamp, ip_address, video_playback_time, user_agent, \
             processed, created_at, updated_at \
             FROM click_events WHERE processed = FALSE \
             ORDER BY timestamp ASC, id ASC LIMIT $1",
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TrackerError::PersistenceError(e.to_string()))?;

        Ok(rows.into_iter().map(click_from_row).collect())
    }

    async fn mark_processed(&self, click_id: i64) -> Result<bool, TrackerError> {
        let result = sqlx::query(
            "UPDATE click_events SET processed = TRUE, updated_at = NOW() \
             WHERE id = $1 AND processed = FALSE",
        )
        .bind(click_id)
        .execute(&self.pool)
        .await
        .map_err(|e| TrackerError::PersistenceError(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    async fn window_totals(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<AdClickTotals>, TrackerError> {
        let rows = sqlx::query_as::<_, WindowTotalsRow>(
            "SELECT a.id, COUNT(ce.id) AS total_clicks, \
                    COALESCE(AVG(ce.video_playback_time), 0)::float8 AS avg_playback_time \
             FROM ads a \
             LEFT JOIN click_events ce ON ce.ad_id = a.id AND ce.timestamp >= $1 \
             GROUP BY a.id \
             ORDER BY total_clicks DESC, a.id ASC",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TrackerError::PersistenceError(e.to_string()))?;

        Ok(rows.into_iter().map(window_totals_from_row).collect())
    }

    async fn hourly_totals(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<HourlyClickTotals>, TrackerError> {
        let rows = sqlx::query_as::<_, HourlyTotalsRow>(
            "SELECT a.id, \
                    COALESCE(EXTRACT(HOUR FROM ce.timestamp AT TIME ZONE 'UTC')::int4, -1) AS hour, \
                    COUNT(ce.id) AS total_clicks, \
                    COALESCE(AVG(ce.video_playback_time), 0)::float8 AS avg_playback_time \
             FROM ads a \
             LEFT JOIN click_events ce ON ce.ad_id = a.id AND ce.timestamp >= $1 \
             GROUP BY a.id, hour \
             ORDER BY a.id ASC, hour ASC",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TrackerError::PersistenceError(e.to_string()))?;

        Ok(rows.into_iter().map(hourly_totals_from_row).collect())
    }
}

// These run against a live PostgreSQL: `#[sqlx::test]` creates a scratch
// database per test from `DATABASE_URL` and applies `./migrations`.
// Run with `cargo test -- --ignored`.
#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::{TimeDelta, Timelike};

    use super::*;
    use crate::domain::HourBucket;

    async fn seeded(pool: PgPool) -> (PostgresEventStore, AdId, AdId) {
        let store = PostgresEventStore::new(pool);
        let Ok(2) = store.seed_sample_ads().await else {
            panic!("sample ads should seed");
        };
        let Ok(mut ads) = store.list_ads().await else {
            panic!("ads should list");
        };
        ads.sort_by_key(|ad| ad.id);
        let (Some(first), Some(second)) = (ads.first(), ads.get(1)) else {
            panic!("two ads expected");
        };
        (store, first.id, second.id)
    }

    async fn record(store: &PostgresEventStore, ad_id: AdId, playback: f64, at: DateTime<Utc>) -> i64 {
        let click = NewClickEvent {
            ad_id,
            video_playback_time: playback,
            ip_address: Some("203.0.113.9".into()),
            user_agent: None,
            timestamp: at,
        };
        let Ok(id) = store.insert_click(&click).await else {
            panic!("insert should succeed");
        };
        id
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn foreign_key_violation_maps_to_ad_not_found(pool: PgPool) {
        let (store, _, _) = seeded(pool).await;
        let click = NewClickEvent::now(AdId::new(9999), 1.0, None, None);

        let result = store.insert_click(&click).await;

        assert!(matches!(result, Err(TrackerError::AdNotFound(id)) if id == AdId::new(9999)));
        let Ok(pending) = store.fetch_unprocessed(10).await else {
            panic!("fetch should succeed");
        };
        assert!(pending.is_empty());
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn hourly_totals_bucket_by_utc_hour_with_idle_sentinel(pool: PgPool) {
        let (store, busy, idle) = seeded(pool).await;
        let now = Utc::now();
        let recent = now - TimeDelta::minutes(10);
        let earlier = now - TimeDelta::hours(5);
        record(&store, busy, 10.0, recent).await;
        record(&store, busy, 30.0, recent).await;
        record(&store, busy, 6.0, earlier).await;
        // Outside the trailing day.
        record(&store, busy, 99.0, now - TimeDelta::hours(30)).await;

        let Ok(rows) = store.hourly_totals(now - TimeDelta::hours(24)).await else {
            panic!("hourly query should succeed");
        };

        let busy_rows: Vec<_> = rows.iter().filter(|r| r.ad_id == busy).collect();
        assert_eq!(busy_rows.len(), 2);
        let recent_hour = HourBucket::Hour(u8::try_from(recent.hour()).unwrap_or(0));
        let Some(recent_row) = busy_rows.iter().find(|r| r.hour == recent_hour) else {
            panic!("recent bucket missing: {busy_rows:?}");
        };
        assert_eq!(recent_row.total_clicks, 2);
        assert_eq!(recent_row.avg_playback_time, 20.0);
        assert!(busy_rows.iter().all(|r| r.hour != HourBucket::NoClicks));

        let idle_rows: Vec<_> = rows.iter().filter(|r| r.ad_id == idle).collect();
        assert_eq!(idle_rows.len(), 1);
        assert!(idle_rows.iter().all(|r| r.hour == HourBucket::NoClicks && r.total_clicks == 0));
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn window_totals_keep_idle_ads_and_marking_is_idempotent(pool: PgPool) {
        let (store, busy, idle) = seeded(pool).await;
        let now = Utc::now();
        let first = record(&store, busy, 4.0, now - TimeDelta::minutes(3)).await;
        record(&store, busy, 8.0, now - TimeDelta::minutes(2)).await;

        let Ok(totals) = store.window_totals(now - TimeDelta::hours(1)).await else {
            panic!("window query should succeed");
        };
        let ids: Vec<AdId> = totals.iter().map(|t| t.ad_id).collect();
        assert_eq!(ids, vec![busy, idle]);
        assert!(totals.first().is_some_and(|t| t.total_clicks == 2 && t.avg_playback_time == 6.0));
        assert!(totals.get(1).is_some_and(|t| t.total_clicks == 0 && t.avg_playback_time == 0.0));

        let Ok(pending) = store.fetch_unprocessed(1).await else {
            panic!("fetch should succeed");
        };
        assert_eq!(pending.iter().map(|c| c.id).collect::<Vec<_>>(), vec![first]);

        assert!(matches!(store.mark_processed(first).await, Ok(true)));
        assert!(matches!(store.mark_processed(first).await, Ok(false)));
    }
}
