//! Configuration management for gator.
//!
//! Configuration is read from `~/.config/gator/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

pub mod duration;

pub use duration::{format_duration, parse_duration};

use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::daemon::selector::DEFAULT_BATCH_SIZE;

/// Main configuration struct.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// User that owns added feeds and whose follows are listed.
    pub user_id: i64,
    pub database: DatabaseConfig,
    pub aggregator: AggregatorConfig,
    pub fetcher: FetcherConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_id: 1,
            database: DatabaseConfig::default(),
            aggregator: AggregatorConfig::default(),
            fetcher: FetcherConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file; `None` means `<data_dir>/gator/gator.db`.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    #[serde(with = "duration::serde_duration")]
    pub interval: Duration,
    /// Cap on concurrent workers; one per feed when unset.
    pub workers: Option<usize>,
    /// Deadline per feed; the interval when unset.
    #[serde(deserialize_with = "duration::serde_duration::option::deserialize")]
    pub feed_timeout: Option<Duration>,
    pub max_batch_size: usize,
    pub logging: bool,
    pub log_file: Option<PathBuf>,
    pub fetch_on_start: bool,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            workers: None,
            feed_timeout: None,
            max_batch_size: DEFAULT_BATCH_SIZE,
            logging: false,
            log_file: None,
            fetch_on_start: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    pub user_agent: String,
    pub request_timeout_secs: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("gator/{}", env!("CARGO_PKG_VERSION")),
            request_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from `path`, creating it with defaults if missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            Self::create_default_config(path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/gator/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("gator").join("config.toml"))
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })
    }

    fn default_config_content() -> &'static str {
        r##"# gator configuration
#
# Durations are written as "<number><unit>" with units ms, s, m, h, d and
# may be combined ("1m30s"). A bare number means seconds.

# User that owns added feeds and whose follows are browsed
user_id = 1

[database]
# SQLite database file (defaults to the platform data directory)
# path = "/var/lib/gator/gator.db"

[aggregator]
# Time between aggregation cycles (minimum 1s)
interval = "1m"

# Maximum concurrent workers per cycle (defaults to one per feed)
# workers = 8

# Deadline for fetching and storing one feed (defaults to the interval)
# feed_timeout = "30s"

# Maximum feeds fetched per cycle
max_batch_size = 50

# Log cycle and per-feed progress
logging = false

# Also write logs to this file
# log_file = "/tmp/gator.log"

# Run a cycle immediately instead of waiting one interval
fetch_on_start = false

[fetcher]
# User-Agent header sent with every request
# user_agent = "gator/0.1.0"

# Overall HTTP request timeout in seconds
request_timeout_secs = 30
"##
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
