//! Service middleware for request metrics.
//!
//! ## Metrics Exposed
//!
//! Emitted as structured `tracing` events under the `wayfinding_kernel::metrics`
//! target, aggregated downstream from logs:
//!
//! - `request` - path, method, status, latency
//! - `path` - hops, nodes expanded, graph cache hit, latency
//! - `route` - route kind, stage count, distance, latency

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::info;

use crate::context::RouteKind;

/// Metrics middleware that records request counts and latency.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status().as_u16();

    info!(
        target: "wayfinding_kernel::metrics",
        metric_type = "request",
        path = %path,
        method = %method,
        status = status,
        latency_ms = latency.as_millis() as u64,
        "request_metric"
    );

    response
}

/// Record point-to-point search metrics.
pub fn record_path_metrics(hop_count: usize, nodes_expanded: usize, cache_hit: bool, latency_ms: u64) {
    info!(
        target: "wayfinding_kernel::metrics",
        metric_type = "path",
        hop_count = hop_count,
        nodes_expanded = nodes_expanded,
        cache_hit = cache_hit,
        latency_ms = latency_ms,
        "path_metric"
    );
}

/// Record composed-route metrics.
pub fn record_route_metrics(kind: RouteKind, stage_count: usize, distance_m: f64, latency_ms: u64) {
    info!(
        target: "wayfinding_kernel::metrics",
        metric_type = "route",
        kind = %kind,
        stage_count = stage_count,
        distance_m = distance_m,
        latency_ms = latency_ms,
        "route_metric"
    );
}
