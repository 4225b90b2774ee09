//! # Request Metrics
//!
//! Records HTTP request counts, error counts and latency through the
//! `metrics` facade. Labels use the matched route template, not the raw
//! path, so application numbers do not explode label cardinality.
//!
//! Without an installed recorder the macros are no-ops.

use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;

pub const REQUESTS_TOTAL: &str = "http_requests_total";
pub const REQUEST_ERRORS_TOTAL: &str = "http_request_errors_total";
pub const REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";

pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    metrics::histogram!(
        REQUEST_DURATION_SECONDS,
        "method" => method.clone(),
        "path" => path.clone()
    )
    .record(start.elapsed().as_secs_f64());

    let labels = [
        ("method", method),
        ("path", path),
        ("status", status.as_u16().to_string()),
    ];
    metrics::counter!(REQUESTS_TOTAL, &labels).increment(1);
    if status.is_client_error() || status.is_server_error() {
        metrics::counter!(REQUEST_ERRORS_TOTAL, &labels).increment(1);
    }

    response
}
