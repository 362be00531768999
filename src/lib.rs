//! # video-ad-tracker
//!
//! Click ingestion and windowed analytics service for video advertisements.
//!
//! Clicks are accepted over HTTP and queued for asynchronous persistence.
//! A background reconciler marks stored clicks as processed, and analytics
//! queries aggregate clicks per ad over lookback windows or UTC hour
//! buckets.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)
//!     │
//!     ├── REST Handlers (api/)
//!     │
//!     ├── AdService / AnalyticsService (service/)
//!     ├── ClickIngestor ── bounded queue ── ingest workers
//!     ├── BacklogReconciler ── interval sweep
//!     │
//!     ├── EventStore (persistence/)
//!     │
//!     └── PostgreSQL or in-memory store
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod persistence;
pub mod service;
