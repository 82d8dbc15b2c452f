pub mod data;
pub mod analysis;
pub mod detector;
pub mod report;
pub mod ingest;
pub mod error;
pub mod utils;

// Re-export commonly used types
pub use data::{Event, EventTime, SizeValue, PairKey, PairGroup, BeaconFinding, IntervalStats};
pub use analysis::{
    PairAggregator, IntervalAnalyzer, DeltaHistogram, ConfidenceScorer,
    ConfidenceScore, ScanMode,
};
pub use detector::{BeaconDetector, DetectionReport, RunStats, Dispatcher};
pub use report::{ResultTable, ReportRow};
pub use error::{DetectorError, InputError, ConfigError, PairAnalysisError, SkipReason};
pub use utils::{AppConfig, DetectorConfig, IngestConfig, DetectorMetrics};
