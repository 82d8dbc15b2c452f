pub mod dispatch;
pub mod engine;

pub use dispatch::{DispatchOutcome, Dispatcher};
pub use engine::{BeaconDetector, DetectionReport, RunStats};
