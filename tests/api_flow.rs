//! End-to-end request flows through the router over the in-memory store.

#![allow(clippy::panic, clippy::indexing_slicing)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use video_ad_tracker::api;
use video_ad_tracker::app_state::AppState;
use video_ad_tracker::config::TrackerConfig;
use video_ad_tracker::metrics::TrackerMetrics;
use video_ad_tracker::persistence::MemoryEventStore;
use video_ad_tracker::service::BacklogReconciler;

struct Harness {
    app: Router,
    store: Arc<MemoryEventStore>,
}

async fn harness() -> Harness {
    let Ok(config) = TrackerConfig::from_lookup(|_| None) else {
        panic!("default config should load");
    };
    let store = Arc::new(MemoryEventStore::new());
    store.seed_sample_ads().await;

    let Ok(metrics) = TrackerMetrics::new() else {
        panic!("metrics should register");
    };
    let metrics = Arc::new(metrics);
    let reconciler = BacklogReconciler::new(
        store.clone(),
        Arc::clone(&metrics),
        config.reconcile_batch_size,
    );
    let (state, _workers) = AppState::new(store.clone(), reconciler, metrics, &config);
    let app = api::build_app(state);
    Harness { app, store }
}

async fn send_raw(app: &Router, request: Request<Body>) -> (StatusCode, String) {
    let Ok(response) = app.clone().oneshot(request).await else {
        panic!("router is infallible");
    };
    let status = response.status();
    let Ok(bytes) = axum::body::to_bytes(response.into_body(), usize::MAX).await else {
        panic!("body should be readable");
    };
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, text) = send_raw(app, request).await;
    (status, serde_json::from_str(&text).unwrap_or(Value::Null))
}

fn get(uri: &str) -> Request<Body> {
    let Ok(request) = Request::get(uri).body(Body::empty()) else {
        panic!("valid request");
    };
    request
}

fn post_click(body: &Value) -> Request<Body> {
    let Ok(request) = Request::post("/api/v1/ads/click")
        .header("content-type", "application/json")
        .header("x-forwarded-for", "198.51.100.7, 10.0.0.1")
        .header("user-agent", "integration-test/1.0")
        .body(Body::from(body.to_string()))
    else {
        panic!("valid request");
    };
    request
}

async fn wait_for_clicks(store: &MemoryEventStore, expected: usize) {
    for _ in 0..200 {
        if store.clicks().await.len() >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("clicks were not persisted in time");
}

#[tokio::test]
async fn clicks_flow_into_window_analytics() {
    let h = harness().await;

    for playback in [10.0, 20.0, 30.0] {
        let (status, body) = send(
            &h.app,
            post_click(&json!({"ad_id": 1, "video_playback_time": playback})),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["success"], json!(true));
    }
    wait_for_clicks(&h.store, 3).await;

    let clicks = h.store.clicks().await;
    assert!(clicks.iter().all(|c| c.ip_address.as_deref() == Some("198.51.100.7")));
    assert!(
        clicks
            .iter()
            .all(|c| c.user_agent.as_deref() == Some("integration-test/1.0"))
    );

    let (status, body) = send(&h.app, get("/api/v1/ads/analytics?timeframe=1h")).await;
    assert_eq!(status, StatusCode::OK);
    let Some(data) = body["data"].as_array() else {
        panic!("data should be an array: {body}");
    };
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["ad_id"], json!(1));
    assert_eq!(data[0]["total_clicks"], json!(3));
    assert_eq!(data[0]["avg_playback_time"], json!(20.0));
    assert_eq!(data[0]["ctr"], json!(0.3));
    assert_eq!(data[0]["time_frame"], json!("1h"));
    assert_eq!(data[1]["ad_id"], json!(2));
    assert_eq!(data[1]["total_clicks"], json!(0));
}

#[tokio::test]
async fn hourly_breakdown_reports_idle_ads_once() {
    let h = harness().await;
    let (status, _) = send(
        &h.app,
        post_click(&json!({"ad_id": 2, "video_playback_time": 4.0})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    wait_for_clicks(&h.store, 1).await;

    let (status, body) = send(&h.app, get("/api/v1/ads/analytics/hourly")).await;
    assert_eq!(status, StatusCode::OK);
    let Some(data) = body["data"].as_array() else {
        panic!("data should be an array: {body}");
    };
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["ad_id"], json!(1));
    assert_eq!(data[0]["time_frame"], json!("no_clicks"));
    assert_eq!(data[1]["ad_id"], json!(2));
    assert_eq!(data[1]["total_clicks"], json!(1));
    let Some(frame) = data[1]["time_frame"].as_str() else {
        panic!("time_frame should be a string");
    };
    assert!(frame.starts_with("hour_"));
}

#[tokio::test]
async fn unknown_ad_click_is_accepted_but_not_stored() {
    let h = harness().await;
    let (status, _) = send(
        &h.app,
        post_click(&json!({"ad_id": 9999, "video_playback_time": 1.0})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.store.clicks().await.is_empty());

    let (status, metrics) = send_raw(&h.app, get("/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(metrics.contains("ad_clicks_accepted_total 1"));
    assert!(metrics.contains("ad_clicks_dropped_unknown_ad_total 1"));
}

#[tokio::test]
async fn invalid_click_bodies_are_rejected() {
    let h = harness().await;

    let (status, body) = send(&h.app, post_click(&json!({"video_playback_time": 1.0}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!(1001));

    let (status, body) = send(
        &h.app,
        post_click(&json!({"ad_id": 1, "video_playback_time": -1.0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!(1001));
}

#[tokio::test]
async fn unsupported_timeframe_is_rejected() {
    let h = harness().await;
    let (status, body) = send(&h.app, get("/api/v1/ads/analytics?timeframe=2w")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!(1002));
    let Some(details) = body["error"]["details"].as_str() else {
        panic!("details should list valid tokens: {body}");
    };
    assert!(details.contains("24h"));
}

#[tokio::test]
async fn ads_can_be_listed_and_fetched() {
    let h = harness().await;

    let (status, body) = send(&h.app, get("/api/v1/ads")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));

    let (status, body) = send(&h.app, get("/api/v1/ads/1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], json!("Product 1"));

    let (status, body) = send(&h.app, get("/api/v1/ads/999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], json!(2001));
}

#[tokio::test]
async fn health_reports_healthy() {
    let h = harness().await;
    let (status, body) = send(&h.app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("healthy"));
}

#[tokio::test]
async fn analytics_query_settles_backlog_by_default() {
    let h = harness().await;
    let (status, _) = send(
        &h.app,
        post_click(&json!({"ad_id": 1, "video_playback_time": 3.0})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    wait_for_clicks(&h.store, 1).await;
    assert!(h.store.clicks().await.iter().all(|c| !c.processed));

    let (status, _) = send(&h.app, get("/api/v1/ads/analytics?timeframe=1h")).await;
    assert_eq!(status, StatusCode::OK);

    assert!(h.store.clicks().await.iter().all(|c| c.processed));
}

#[tokio::test]
async fn metrics_record_requests_by_route() {
    let h = harness().await;
    let (status, _) = send(&h.app, get("/api/v1/ads/1")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&h.app, get("/api/v1/ads/999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, text) = send_raw(&h.app, get("/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(text.contains(
        r#"http_requests_total{endpoint="/api/v1/ads/{id}",method="GET",status="200"} 1"#
    ));
    assert!(text.contains(
        r#"http_requests_total{endpoint="/api/v1/ads/{id}",method="GET",status="404"} 1"#
    ));
    assert!(text.contains(
        r#"http_request_duration_seconds_count{endpoint="/api/v1/ads/{id}",method="GET"} 2"#
    ));
}
