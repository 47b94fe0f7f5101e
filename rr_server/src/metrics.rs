//! Prometheus metrics for monitoring tournament traffic.
//!
//! Metrics are exposed in Prometheus text format on a separate listener for
//! scraping by monitoring systems. Without an installed exporter the recording
//! functions are no-ops.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use rr_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::http_requests_total("POST", "/api/v1/round-robin", 200);
//! metrics::registrations_total("joined");
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Tournament Metrics
// ============================================================================

/// Count a registration by how it was placed (joined, started, rescheduled).
pub fn registrations_total(outcome: &str) {
    metrics::counter!("registrations_total", "outcome" => outcome.to_string()).increment(1);
}

/// Count a withdrawal; `schedule_cleared` marks rosters that fell below four.
pub fn withdrawals_total(schedule_cleared: bool) {
    metrics::counter!("withdrawals_total",
        "schedule_cleared" => schedule_cleared.to_string()
    )
    .increment(1);
}

/// Count a game result applied to a crosstable.
pub fn games_recorded_total(platform: &str) {
    metrics::counter!("games_recorded_total", "platform" => platform.to_string()).increment(1);
}

/// Count a tournament close.
pub fn tournaments_closed_total() {
    metrics::counter!("tournaments_closed_total").increment(1);
}

// ============================================================================
// Error Metrics
// ============================================================================

/// Count a failed operation by error kind.
pub fn operation_errors_total(operation: &str, kind: &str) {
    metrics::counter!("operation_errors_total",
        "operation" => operation.to_string(),
        "kind" => kind.to_string()
    )
    .increment(1);
}
