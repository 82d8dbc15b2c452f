use crate::analysis::ScanMode;
use crate::error::ConfigError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub detector: DetectorConfig,
    pub ingest: IngestConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
    pub output: OutputConfig,
}

/// Beacon detection parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Pairs need strictly more events than this to be analyzed
    pub min_occurrences: usize,
    /// Findings need confidence strictly above this percentage
    pub min_percent: f64,
    /// Sliding-window width in seconds
    pub window: i64,
    /// Gaps shorter than this many seconds are ignored
    pub min_interval: i64,
    /// Lookback applied by the ingestor
    pub period_hours: u32,
    pub worker_count: usize,
    /// Stop dispatching new pairs after this many seconds
    pub timeout_secs: Option<u64>,
    pub scan: ScanMode,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_occurrences: 10,
            min_percent: 5.0,
            window: 2,
            min_interval: 2,
            period_hours: 24,
            worker_count: 4,
            timeout_secs: None,
            scan: ScanMode::Sparse,
        }
    }
}

impl DetectorConfig {
    /// Reject parameter combinations before any work is dispatched
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window <= 0 {
            return Err(ConfigError::NonPositiveWindow(self.window));
        }
        if self.min_interval < 0 {
            return Err(ConfigError::NegativeMinInterval(self.min_interval));
        }
        if !self.min_percent.is_finite() || !(0.0..=100.0).contains(&self.min_percent) {
            return Err(ConfigError::InvalidMinPercent(self.min_percent));
        }
        if self.worker_count == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.period_hours == 0 {
            return Err(ConfigError::ZeroPeriod);
        }
        let period_secs = i64::from(self.period_hours) * 3600;
        if self.window > period_secs {
            return Err(ConfigError::WindowExceedsPeriod {
                window: self.window,
                period_secs,
            });
        }
        if self.timeout_secs == Some(0) {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Document field mapping and lookback anchor for the file ingestor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub sender_field: String,
    pub receiver_field: String,
    pub size_field: String,
    pub timestamp_field: String,
    /// End of the lookback window; newest event when unset
    pub until: Option<DateTime<Utc>>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            sender_field: "email.sender".to_string(),
            receiver_field: "email.receiver".to_string(),
            size_field: "email.size".to_string(),
            timestamp_field: "@timestamp".to_string(),
            until: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// "pretty" or "json"
    pub output: String,
    pub file_path: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            output: "pretty".to_string(),
            file_path: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    /// Where the CLI writes a text exposition snapshot
    pub export_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub csv_path: Option<PathBuf>,
    pub json_path: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Load(format!("{}: {}", path.as_ref().display(), e)))?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(contents).map_err(|e| ConfigError::Load(e.to_string()))?;
        config.detector.validate()?;
        Ok(config)
    }

    /// Load from an optional TOML file layered with `BEACON__SECTION__KEY`
    /// environment overrides.
    ///
    /// The file path falls back to `BEACON_CONFIG`, then `config/default.toml`.
    /// A missing file is not an error; every field has a default.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => std::env::var("BEACON_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH)),
        };

        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_path()).required(false))
            .add_source(
                config::Environment::with_prefix("BEACON")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        let config: AppConfig = settings
            .try_deserialize()
            .map_err(|e| ConfigError::Load(e.to_string()))?;
        config.detector.validate()?;
        Ok(config)
    }
}
