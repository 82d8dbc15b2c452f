pub mod config;
pub mod logger;
pub mod metrics;

pub use config::{AppConfig, DetectorConfig, IngestConfig, LoggingConfig, MetricsConfig, OutputConfig};
pub use logger::{init_logging, LogFormat};
pub use metrics::DetectorMetrics;
