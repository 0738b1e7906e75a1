//! Logging setup
//!
//! Logs go to stderr so stdout stays parseable. `RUST_LOG` wins over the
//! verbosity flags when set.

use tracing_subscriber::EnvFilter;

/// Initialize tracing with a default filter directive ("warn", "debug", ...)
pub fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("zipindustry={}", default_level)));

    // A second init (e.g. from tests) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(default_level != "warn")
        .try_init();
}
