use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CSV_OUTPUT_PATH: &str = "data/live_data.csv";

/// Settings the consumer needs from its host process.
///
/// `FileConsumer` is built from any implementation, so tests and embedders can
/// supply paths without touching the process environment.
pub trait ConsumerSettings {
    /// Sleep between polls when a pass finds nothing new
    fn interval(&self) -> Duration;

    /// Live data file being tailed
    fn source_path(&self) -> &Path;

    /// SQLite database file
    fn store_path(&self) -> &Path;

    /// CSV log file
    fn csv_path(&self) -> &Path;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConsumerConfig {
    pub interval_secs: u64,
    pub live_data_path: PathBuf,
    pub sqlite_path: PathBuf,
    pub csv_path: PathBuf,
}

#[derive(Debug, PartialEq)]
pub enum ConfigError {
    MissingVariable(String),
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingVariable(var) => write!(f, "Missing environment variable: {}", var),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl ConsumerConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `MESSAGE_INTERVAL_SECONDS` (required, positive integer)
    /// - `LIVE_DATA_PATH` (required)
    /// - `SQLITE_PATH` (required)
    /// - `CSV_OUTPUT_PATH` (default: data/live_data.csv)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading values through `lookup` instead of the environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let interval_str = required(&lookup, "MESSAGE_INTERVAL_SECONDS")?;
        let interval_secs = match interval_str.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => secs,
            _ => {
                return Err(ConfigError::InvalidValue(format!(
                    "MESSAGE_INTERVAL_SECONDS must be a positive integer, got '{}'",
                    interval_str
                )))
            }
        };

        let live_data_path = PathBuf::from(required(&lookup, "LIVE_DATA_PATH")?);
        let sqlite_path = PathBuf::from(required(&lookup, "SQLITE_PATH")?);

        let csv_path = lookup("CSV_OUTPUT_PATH")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CSV_OUTPUT_PATH.to_string())
            .into();

        Ok(Self {
            interval_secs,
            live_data_path,
            sqlite_path,
            csv_path,
        })
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(key).ok_or_else(|| ConfigError::MissingVariable(key.to_string()))?;
    if value.trim().is_empty() {
        return Err(ConfigError::InvalidValue(format!("{} cannot be empty", key)));
    }
    Ok(value)
}

impl ConsumerSettings for ConsumerConfig {
    fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    fn source_path(&self) -> &Path {
        &self.live_data_path
    }

    fn store_path(&self) -> &Path {
        &self.sqlite_path
    }

    fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
