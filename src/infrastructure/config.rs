//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::runner::DEFAULT_PARALLELISM;

/// Errors raised while loading configuration or batch files
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The YAML could not be parsed
    #[error("Failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The content parsed but is not usable
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum concurrently running jobs; non-positive means the default
    pub parallelism: i64,
    /// Log level used when `JOBRUNNER_LOG` is not set
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            parallelism: DEFAULT_PARALLELISM as i64,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Parses configuration from YAML
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Reads configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read, or
    /// [`ConfigError::Parse`] on malformed YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = read_file(path)?;
        Self::from_yaml(&content)
    }

    /// Loads `path` if given, otherwise the defaults
    ///
    /// # Errors
    ///
    /// See [`Config::from_file`].
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        path.map_or_else(|| Ok(Self::default()), Self::from_file)
    }
}

pub(crate) fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}
