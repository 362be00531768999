//! Click submission handler.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{ClickAcceptedResponse, ClickRequest};
use crate::app_state::AppState;
use crate::domain::{AdId, NewClickEvent};
use crate::error::{ErrorResponse, TrackerError};

/// Longest textual IPv6 form; longer values do not fit the column.
const MAX_IP_LEN: usize = 45;

/// `POST /ads/click`: Record a click asynchronously.
///
/// The click is queued and the response returns before it is stored. An
/// unknown `ad_id` is still accepted here and dropped by the ingest worker.
///
/// # Errors
///
/// Returns [`TrackerError::InvalidRequest`] for a malformed body and
/// [`TrackerError::IngestQueueFull`] when the service is saturated.
#[utoipa::path(
    post,
    path = "/api/v1/ads/click",
    tag = "Clicks",
    summary = "Record a click",
    description = "Queues a click event for persistence and returns immediately. Client IP is taken from X-Forwarded-For or X-Real-IP when present.",
    request_body = ClickRequest,
    responses(
        (status = 202, description = "Click accepted", body = ClickAcceptedResponse),
        (status = 400, description = "Malformed request", body = ErrorResponse),
        (status = 503, description = "Ingest queue full", body = ErrorResponse),
    )
)]
pub async fn record_click(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<ClickRequest>, JsonRejection>,
) -> Result<impl IntoResponse, TrackerError> {
    let Json(req) = body.map_err(|e| TrackerError::InvalidRequest(e.body_text()))?;
    req.validate()?;

    let ip_address = client_ip(&headers, req.ip_address.as_deref());
    let user_agent = req.user_agent.or_else(|| header_str(&headers, header::USER_AGENT.as_str()));

    let click = NewClickEvent::now(
        AdId::new(req.ad_id),
        req.video_playback_time,
        ip_address,
        user_agent,
    );
    state.ingestor.submit(click)?;

    Ok((StatusCode::ACCEPTED, Json(ClickAcceptedResponse::accepted())))
}

/// Resolves the client address: first `X-Forwarded-For` entry, then
/// `X-Real-IP`, then the body value. Values too long to store are dropped.
fn client_ip(headers: &HeaderMap, body_ip: Option<&str>) -> Option<String> {
    let forwarded = header_str(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next().map(|first| first.trim().to_string()));
    forwarded
        .filter(|ip| !ip.is_empty())
        .or_else(|| header_str(headers, "x-real-ip").map(|ip| ip.trim().to_string()))
        .or_else(|| body_ip.map(str::to_string))
        .filter(|ip| !ip.is_empty() && ip.len() <= MAX_IP_LEN)
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Click routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/ads/click", post(record_click))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(*value));
        }
        map
    }

    #[test]
    fn forwarded_for_takes_first_hop() {
        let h = headers(&[
            ("x-forwarded-for", "198.51.100.7, 10.0.0.1"),
            ("x-real-ip", "10.0.0.2"),
        ]);
        assert_eq!(client_ip(&h, Some("192.0.2.1")).as_deref(), Some("198.51.100.7"));
    }

    #[test]
    fn real_ip_then_body_are_fallbacks() {
        let h = headers(&[("x-real-ip", "10.0.0.2")]);
        assert_eq!(client_ip(&h, Some("192.0.2.1")).as_deref(), Some("10.0.0.2"));
        assert_eq!(
            client_ip(&HeaderMap::new(), Some("192.0.2.1")).as_deref(),
            Some("192.0.2.1")
        );
        assert_eq!(client_ip(&HeaderMap::new(), None), None);
    }

    #[test]
    fn oversized_address_is_dropped() {
        let long = "1".repeat(MAX_IP_LEN + 1);
        assert_eq!(client_ip(&HeaderMap::new(), Some(long.as_str())), None);
    }
}
