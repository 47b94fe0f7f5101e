//! Structured logging configuration.
//!
//! The core crate logs through the `log` facade; those records are bridged
//! into the same `tracing` subscriber as the server's own events.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Levels come from `RUST_LOG`, defaulting to `info` with quieter database and
/// HTTP internals.
///
/// # Example
///
/// ```no_run
/// use rr_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,hyper=warn,reqwest=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log API request/response
///
/// Requests slower than a second are logged as warnings.
pub fn log_api_request(
    request_id: &str,
    method: &str,
    path: &str,
    status_code: u16,
    duration_ms: u64,
) {
    if duration_ms > 1000 {
        tracing::warn!(
            request_id = request_id,
            http_method = method,
            http_path = path,
            http_status = status_code,
            duration_ms = duration_ms,
            "Slow API request"
        );
    } else {
        tracing::info!(
            request_id = request_id,
            http_method = method,
            http_path = path,
            http_status = status_code,
            duration_ms = duration_ms,
            "API request completed"
        );
    }
}

/// Log a failed tournament operation
///
/// Client mistakes are logged at debug; failures of the server or its
/// collaborators at warn.
pub fn log_operation_failure(operation: &str, kind: &str, retryable: bool, message: &str) {
    if retryable {
        tracing::warn!(
            operation = operation,
            error_kind = kind,
            retryable = retryable,
            "Operation failed: {}",
            message
        );
    } else {
        tracing::debug!(
            operation = operation,
            error_kind = kind,
            "Operation rejected: {}",
            message
        );
    }
}
