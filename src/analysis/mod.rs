pub mod aggregator;
pub mod intervals;
pub mod confidence;

pub use aggregator::{Aggregation, PairAggregator};
pub use intervals::{DeltaHistogram, IntervalAnalysis, IntervalAnalyzer};
pub use confidence::{ConfidenceScore, ConfidenceScorer, ScanMode};
