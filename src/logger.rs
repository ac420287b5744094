use std::time::Duration;

use hyper::{Method, StatusCode};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `RUST_LOG` wins over the default filter.
pub fn init_logger(debug: bool) {
    let default = if debug { "easypub=debug" } else { "easypub=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_ids(true)
        .with_target(false)
        .with_file(debug)
        .with_line_number(debug)
        .try_init();
    if let Err(e) = result {
        eprintln!("Logger already initialized: {}", e);
    }
}

pub fn log_request(method: &Method, path: &str, status: StatusCode, duration: Duration) {
    info!(
        target: "easypub::request",
        method = %method,
        path = %path,
        status = status.as_u16(),
        duration_ms = %duration.as_millis(),
        "Request completed"
    );
}
