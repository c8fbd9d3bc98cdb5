//! Tracing/logging initialization.
//!
//! Logs go to stderr; stdout belongs to the binaries' own output.

use tracing_subscriber::EnvFilter;

/// Initialize tracing/logging for the process.
///
/// `RUST_LOG` overrides `default_directive`. `STOREOPS_LOG_FORMAT=text` switches
/// from JSON lines to compact human-readable output.
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init(default_directive: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let text = std::env::var("STOREOPS_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("text"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let _ = if text {
        builder.compact().try_init()
    } else {
        builder
            .json()
            .with_timer(tracing_subscriber::fmt::time::SystemTime)
            .try_init()
    };
}
