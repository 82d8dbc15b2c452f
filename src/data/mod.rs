pub mod event;
pub mod pair;
pub mod finding;

pub use event::{Event, EventTime, SizeValue};
pub use pair::{PairGroup, PairKey};
pub use finding::{BeaconFinding, IntervalStats};
