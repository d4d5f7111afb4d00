// Common test utilities for integration tests.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

const MAX_BODY: usize = 64 * 1024;

/// Sends one request through the router and returns status and body.
pub async fn do_request(router: &Router, method: &str, uri: &str, body: &str) -> (StatusCode, String) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::from(body.to_string()))
        .expect("valid request");
    let resp = router.clone().oneshot(req).await.expect("router is infallible");
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), MAX_BODY).await.expect("body fits");
    (status, String::from_utf8(bytes.to_vec()).expect("utf-8 body"))
}

/// Sends a request and decodes a JSON reply.
pub async fn do_json<T: serde::de::DeserializeOwned>(
    router: &Router,
    method: &str,
    uri: &str,
) -> (StatusCode, T) {
    let (status, body) = do_request(router, method, uri, "").await;
    let value = serde_json::from_str(&body)
        .unwrap_or_else(|e| panic!("invalid json from {} {}: {} ({})", method, uri, e, body));
    (status, value)
}

pub fn speed_path(unit: u32) -> String {
    format!("/hatsune/units/{}/speed", unit)
}

/// Unit entry as served by GET /hatsune/units.
#[derive(Debug, serde::Deserialize)]
pub struct UnitView {
    pub id: u32,
    pub managed: bool,
    pub setspeed: u32,
    pub min: Option<u32>,
    pub max: Option<u32>,
    pub cur: Option<u32>,
}
