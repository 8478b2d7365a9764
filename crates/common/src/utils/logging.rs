use std::io;
use tracing_subscriber::{fmt, EnvFilter};

fn env_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Initialize tracing subscriber with sensible defaults and stdout writer.
/// - Respects `RUST_LOG` if set
/// - Falls back to `info,tower_http=info,axum=info`
/// - Writes to stdout to improve visibility in environments that hide stderr
pub fn init_logging_default() {
    let _ = fmt()
        .with_env_filter(env_filter("info,tower_http=info,axum=info"))
        .with_target(false)
        .compact()
        .with_writer(|| io::stdout())
        .try_init();
}

/// Initialize tracing subscriber with JSON structured output for container
/// logging. Defaults to `info` plus debug for the store internals; override
/// with RUST_LOG, e.g. `RUST_LOG=info,service::file=trace`.
pub fn init_logging_json() {
    let _ = fmt()
        .with_env_filter(env_filter("info,service::file=debug"))
        .with_target(false)
        .json()
        .with_writer(|| io::stdout())
        .try_init();
}
