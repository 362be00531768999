//! REST endpoint handlers organized by resource.

pub mod ads;
pub mod analytics;
pub mod click;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(ads::routes())
        .merge(click::routes())
        .merge(analytics::routes())
}
