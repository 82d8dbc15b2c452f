use crate::data::{Event, PairGroup, PairKey};
use std::collections::BTreeMap;
use tracing::debug;

/// Communication pair aggregator
///
/// Groups the event collection by (sender, receiver) and keeps only pairs
/// that communicate often enough to be worth an interval analysis.
///
/// Algorithm:
/// 1. Drop events whose sender or receiver is missing or blank
/// 2. Group the rest by an equality-compared `PairKey`
/// 3. Keep groups whose event count is strictly above `min_occurrences`
/// 4. Order each group's events by timestamp (stable, ingestion order on ties)
pub struct PairAggregator {
    /// Groups with this many events or fewer are discarded
    min_occurrences: usize,
}

/// Output of one aggregation pass
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    /// Retained groups, ordered by key
    pub groups: Vec<PairGroup>,
    pub events_total: usize,
    pub events_missing_identity: usize,
    /// Distinct pairs before the occurrence filter
    pub pairs_total: usize,
}

impl PairAggregator {
    pub fn new(min_occurrences: usize) -> Self {
        Self { min_occurrences }
    }

    /// Group `events` into pairs and apply the occurrence threshold
    pub fn aggregate(&self, events: &[Event]) -> Aggregation {
        let mut by_pair: BTreeMap<PairKey, Vec<Event>> = BTreeMap::new();
        let mut missing = 0usize;

        for event in events {
            match event.identity() {
                Some((sender, receiver)) => {
                    by_pair
                        .entry(PairKey::new(sender, receiver))
                        .or_default()
                        .push(event.clone());
                }
                None => missing += 1,
            }
        }

        let pairs_total = by_pair.len();

        let groups: Vec<PairGroup> = by_pair
            .into_iter()
            .filter(|(_, events)| events.len() > self.min_occurrences)
            .map(|(key, mut events)| {
                // Malformed timestamps sort first; the analyzer rejects the pair anyway
                events.sort_by_key(|e| e.timestamp.instant());
                PairGroup { key, events }
            })
            .collect();

        debug!(
            "Aggregated {} events into {} pairs, {} above {} occurrences ({} without identity)",
            events.len(),
            pairs_total,
            groups.len(),
            self.min_occurrences,
            missing
        );

        Aggregation {
            groups,
            events_total: events.len(),
            events_missing_identity: missing,
            pairs_total,
        }
    }
}
