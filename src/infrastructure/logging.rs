//! Logging configuration
//!
//! Initializes tracing for the application.

use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable overriding the configured level
pub const LOG_ENV: &str = "JOBRUNNER_LOG";

/// Initializes logging with the specified level.
///
/// `JOBRUNNER_LOG`, when set, takes precedence over `level`. Calling this
/// more than once keeps the first subscriber.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .try_init();
}
