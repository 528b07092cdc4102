//! Infrastructure layer
//!
//! Configuration, batch files and logging setup.

mod batch;
mod config;
mod logging;

pub use batch::{BatchFile, JobSpec, SleepJob};
pub use config::{Config, ConfigError};
pub use logging::{LOG_ENV, init_logging};
