use serde::{Deserialize, Serialize};

/// Spread of the retained inter-arrival deltas of one pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntervalStats {
    pub mean: f64,
    pub std_dev: f64,
    /// std_dev / mean; near 0 for machine-regular traffic
    pub cv: f64,
}

/// A pair whose inter-arrival deltas concentrate in one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeaconFinding {
    pub sender: String,
    pub receiver: String,
    pub interval_seconds: i64,
    pub confidence_percent: f64,
    /// Number of deltas that survived `min_interval` filtering
    pub total_events: u64,
    pub total_size: Option<f64>,
    pub average_size: Option<f64>,
    pub interval_stats: Option<IntervalStats>,
}
