use crate::data::{EventTime, IntervalStats, PairGroup, SizeValue};
use crate::error::PairAnalysisError;
use statrs::statistics::{Data, Distribution};
use std::collections::BTreeMap;

/// Exact count of each inter-arrival delta, in whole seconds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeltaHistogram {
    counts: BTreeMap<i64, u64>,
    total: u64,
}

impl DeltaHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_deltas<I: IntoIterator<Item = i64>>(deltas: I) -> Self {
        let mut hist = Self::new();
        for delta in deltas {
            hist.record(delta);
        }
        hist
    }

    pub fn record(&mut self, delta: i64) {
        *self.counts.entry(delta).or_insert(0) += 1;
        self.total += 1;
    }

    /// Sum of all counts
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Number of distinct delta values
    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    pub fn count(&self, delta: i64) -> u64 {
        self.counts.get(&delta).copied().unwrap_or(0)
    }

    pub fn min_delta(&self) -> Option<i64> {
        self.counts.keys().next().copied()
    }

    pub fn max_delta(&self) -> Option<i64> {
        self.counts.keys().next_back().copied()
    }

    /// Observed deltas in ascending order
    pub fn deltas(&self) -> impl Iterator<Item = i64> + '_ {
        self.counts.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, u64)> + '_ {
        self.counts.iter().map(|(d, c)| (*d, *c))
    }

    /// Sum of counts for deltas in `[start, start + width)`
    pub fn coverage(&self, start: i64, width: i64) -> u64 {
        if width <= 0 {
            return 0;
        }
        let end = start.saturating_add(width);
        self.counts.range(start..end).map(|(_, c)| c).sum()
    }
}

/// Per-pair interval analysis output
#[derive(Debug, Clone)]
pub struct IntervalAnalysis {
    pub histogram: DeltaHistogram,
    /// Retained deltas in timestamp order
    pub deltas: Vec<i64>,
    pub total_size: Option<f64>,
    pub average_size: Option<f64>,
}

impl IntervalAnalysis {
    pub fn total(&self) -> u64 {
        self.histogram.total()
    }

    /// Mean, standard deviation and coefficient of variation of retained deltas
    pub fn stats(&self) -> Option<IntervalStats> {
        if self.deltas.is_empty() {
            return None;
        }

        let data = Data::new(self.deltas.iter().map(|d| *d as f64).collect::<Vec<_>>());
        let mean = data.mean().unwrap_or(0.0);
        let std_dev = data.std_dev().filter(|s| s.is_finite()).unwrap_or(0.0);
        let cv = if mean > 0.0 { std_dev / mean } else { 0.0 };

        Some(IntervalStats { mean, std_dev, cv })
    }
}

/// Inter-arrival interval analyzer
///
/// Algorithm:
/// 1. Resolve every event's timestamp and size; any malformed field rejects the pair
/// 2. Stable-sort by timestamp
/// 3. delta[i] = t[i] - t[i-1], truncated to whole seconds
/// 4. Drop deltas below `min_interval` (bursts and duplicates)
/// 5. Count the remaining deltas exactly
pub struct IntervalAnalyzer {
    /// Minimum gap in seconds that counts as a real interval
    min_interval: i64,
}

impl IntervalAnalyzer {
    pub fn new(min_interval: i64) -> Self {
        Self { min_interval }
    }

    /// Analyze one pair
    ///
    /// Returns `Ok(None)` when the pair has fewer than two events or no delta
    /// survives filtering.
    pub fn analyze(&self, group: &PairGroup) -> Result<Option<IntervalAnalysis>, PairAnalysisError> {
        let mut times = Vec::with_capacity(group.events.len());
        let mut size_sum = 0.0;
        let mut sized = 0usize;

        for event in &group.events {
            match &event.timestamp {
                EventTime::At(ts) => times.push(*ts),
                EventTime::Malformed(raw) => {
                    return Err(PairAnalysisError::MalformedTimestamp { raw: raw.clone() });
                }
            }

            match &event.size {
                Some(SizeValue::Bytes(bytes)) => {
                    size_sum += bytes;
                    sized += 1;
                }
                Some(SizeValue::Malformed(raw)) => {
                    return Err(PairAnalysisError::MalformedSize { raw: raw.clone() });
                }
                None => {}
            }
        }

        if times.len() < 2 {
            return Ok(None);
        }

        times.sort();

        let deltas: Vec<i64> = times
            .windows(2)
            .map(|pair| (pair[1] - pair[0]).num_seconds())
            .filter(|delta| *delta >= self.min_interval)
            .collect();

        if deltas.is_empty() {
            return Ok(None);
        }

        let histogram = DeltaHistogram::from_deltas(deltas.iter().copied());
        let (total_size, average_size) = if sized > 0 {
            (Some(size_sum), Some(size_sum / sized as f64))
        } else {
            (None, None)
        };

        Ok(Some(IntervalAnalysis {
            histogram,
            deltas,
            total_size,
            average_size,
        }))
    }
}
