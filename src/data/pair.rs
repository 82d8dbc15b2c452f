use super::event::Event;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a communication pair.
///
/// Compared by value on both components, so `("ab", "c")` and `("a", "bc")`
/// are distinct pairs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PairKey {
    pub sender: String,
    pub receiver: String,
}

impl PairKey {
    pub fn new(sender: impl Into<String>, receiver: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            receiver: receiver.into(),
        }
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.sender, self.receiver)
    }
}

/// All events of one pair, in timestamp order.
///
/// Built once per run by the aggregator and read-only afterwards.
#[derive(Debug, Clone)]
pub struct PairGroup {
    pub key: PairKey,
    pub events: Vec<Event>,
}

impl PairGroup {
    pub fn sender(&self) -> &str {
        &self.key.sender
    }

    pub fn receiver(&self) -> &str {
        &self.key.receiver
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
