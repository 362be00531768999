//! REST API layer: route handlers, DTOs, and router composition.
//!
//! Resource endpoints are mounted under `/api/v1`; health and Prometheus
//! metrics sit at the root.

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod openapi;

use axum::Router;

use crate::app_state::AppState;

/// Builds the complete API router with all REST endpoints.
///
/// With the `swagger-ui` feature the interactive docs are served at
/// `/swagger-ui`.
pub fn build_router() -> Router<AppState> {
    let router = Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes());

    #[cfg(feature = "swagger-ui")]
    let router = {
        use utoipa::OpenApi;
        router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", openapi::ApiDoc::openapi()),
        )
    };

    router
}

/// Builds the API router with request metrics recorded on every route,
/// ready to serve.
pub fn build_app(state: AppState) -> Router {
    build_router()
        .route_layer(axum::middleware::from_fn_with_state(
            std::sync::Arc::clone(&state.metrics),
            middleware::track_requests,
        ))
        .with_state(state)
}
