//! Telemetry logic.
//! Support logging through `tracing`.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

const DEFAULT_FILTER: &str = "info";

/// Install the global `tracing` subscriber.
///
/// Verbosity follows `RUST_LOG`, `info` when unset. Calling it twice keeps
/// the first subscriber.
pub fn setup_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .try_init();

    if let Err(err) = result {
        tracing::debug!(error = %err, "logging already initialized");
    }
}
