//! Error types for beacon detection.

use thiserror::Error;

/// Result type alias for detector operations.
pub type Result<T> = std::result::Result<T, DetectorError>;

/// Fatal errors that abort a detection run.
#[derive(Error, Debug)]
pub enum DetectorError {
    /// The event collection cannot be analyzed at all
    #[error("input error: {0}")]
    Input(#[from] InputError),

    /// Parameters rejected before any work was dispatched
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Metric registration failed
    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

/// Empty or malformed event collections.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("event collection is empty")]
    Empty,

    #[error("none of the {total} events carries both a sender and a receiver")]
    NoUsableEvents { total: usize },

    #[error("document {index} is not a JSON object")]
    NotAnObject { index: usize },

    #[error("failed to parse documents: {0}")]
    Parse(String),
}

/// Invalid parameter combinations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("window must be positive, got {0}")]
    NonPositiveWindow(i64),

    #[error("min_interval must not be negative, got {0}")]
    NegativeMinInterval(i64),

    #[error("min_percent must be a finite value in [0, 100], got {0}")]
    InvalidMinPercent(f64),

    #[error("worker_count must be at least 1")]
    NoWorkers,

    #[error("period_hours must be positive")]
    ZeroPeriod,

    #[error("window of {window}s is longer than the {period_secs}s lookback period")]
    WindowExceedsPeriod { window: i64, period_secs: i64 },

    #[error("timeout_secs must be positive when set")]
    ZeroTimeout,

    #[error("failed to load configuration: {0}")]
    Load(String),
}

/// Per-pair failures. These never abort a run; the pair is skipped and counted.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PairAnalysisError {
    #[error("unparseable timestamp {raw:?}")]
    MalformedTimestamp { raw: String },

    #[error("non-numeric size {raw:?}")]
    MalformedSize { raw: String },

    #[error("analysis panicked: {0}")]
    Panicked(String),
}

impl PairAnalysisError {
    /// Stable label used for skip counters and logs.
    pub fn reason(&self) -> SkipReason {
        match self {
            Self::MalformedTimestamp { .. } => SkipReason::MalformedTimestamp,
            Self::MalformedSize { .. } => SkipReason::MalformedSize,
            Self::Panicked(_) => SkipReason::Panicked,
        }
    }
}

/// Category of a skipped pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MalformedTimestamp,
    MalformedSize,
    Panicked,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedTimestamp => write!(f, "malformed_timestamp"),
            Self::MalformedSize => write!(f, "malformed_size"),
            Self::Panicked => write!(f, "panicked"),
        }
    }
}
