//! Telemetry and observability setup
//!
//! Configures structured logging with tracing and tracing-subscriber.

use std::sync::Once;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Build the default filter directive for a configured level
///
/// HTTP client internals stay at `warn` so readiness polling does not flood
/// the log at `debug`.
pub fn default_directive(default_level: &str) -> String {
    format!(
        "scrapecheck={},reqwest=warn,hyper=warn",
        default_level
    )
}

/// Initialize tracing subscriber for structured logging
///
/// This can only be called once per process. Subsequent calls are silently ignored.
///
/// Reads log level from RUST_LOG environment variable, defaulting to the
/// level specified in config (or "info" if not set).
///
/// Logs go to stderr so `run --json` keeps stdout machine-readable.
///
/// # Examples
///
/// ```no_run
/// scrapecheck::telemetry::init("info");
/// tracing::info!("Conformance run started");
/// ```
pub fn init(default_level: &str) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directive(default_level)));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    });
}
