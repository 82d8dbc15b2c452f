use super::intervals::DeltaHistogram;
use serde::{Deserialize, Serialize};

/// How window starts are enumerated. Both produce identical scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// Every integer start from `min - window / 2` to `max`
    Dense,
    /// Only starts where an observed delta enters the window
    #[default]
    Sparse,
}

/// Best window found for one histogram
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceScore {
    pub window_start: i64,
    /// Midpoint of the winning window
    pub interval_seconds: i64,
    pub coverage: u64,
    pub total: u64,
    pub confidence_percent: f64,
}

/// Sliding-window confidence scorer
///
/// Slides a window of fixed width across the delta histogram and keeps the
/// start covering the most deltas. The reported interval is the window
/// midpoint (`start + window / 2`) and the confidence is the covered share
/// of all deltas in percent.
///
/// Window starts run from `min_delta - window / 2` to `max_delta`, so the
/// first window is centred on the smallest delta and the reported interval
/// never falls below it. The lowest start reaching the maximum wins.
pub struct ConfidenceScorer {
    /// Window width in seconds
    window: i64,

    /// Confidence must be strictly above this to qualify
    min_percent: f64,

    mode: ScanMode,
}

impl ConfidenceScorer {
    /// Create new confidence scorer
    ///
    /// # Arguments
    /// * `window` - Window width in seconds (typically 2)
    /// * `min_percent` - Qualification threshold in percent (typically 5)
    /// * `mode` - Start enumeration strategy
    pub fn new(window: i64, min_percent: f64, mode: ScanMode) -> Self {
        Self {
            window,
            min_percent,
            mode,
        }
    }

    /// Find the best-covering window regardless of the threshold
    pub fn best_window(&self, hist: &DeltaHistogram) -> Option<ConfidenceScore> {
        if hist.is_empty() || self.window <= 0 {
            return None;
        }

        let best = match self.mode {
            ScanMode::Dense => self.scan_dense(hist)?,
            ScanMode::Sparse => self.scan_sparse(hist)?,
        };

        let (window_start, coverage) = best;
        let total = hist.total();

        Some(ConfidenceScore {
            window_start,
            interval_seconds: window_start + self.window / 2,
            coverage,
            total,
            confidence_percent: coverage as f64 / total as f64 * 100.0,
        })
    }

    /// Best window, only if its confidence exceeds `min_percent`
    pub fn score(&self, hist: &DeltaHistogram) -> Option<ConfidenceScore> {
        self.best_window(hist).filter(|s| self.qualifies(s))
    }

    pub fn qualifies(&self, score: &ConfidenceScore) -> bool {
        score.confidence_percent > self.min_percent
    }

    /// Rolling sum over every integer start
    fn scan_dense(&self, hist: &DeltaHistogram) -> Option<(i64, u64)> {
        let first = self.first_start(hist)?;
        let max = hist.max_delta()?;

        let mut coverage = hist.coverage(first, self.window);
        let mut best = (first, coverage);

        for start in (first + 1)..=max {
            coverage = coverage - hist.count(start - 1) + hist.count(start + self.window - 1);
            if coverage > best.1 {
                best = (start, coverage);
            }
        }

        Some(best)
    }

    /// Coverage only grows when a delta enters at the right edge, so the first
    /// maximum sits either at the lowest start or at `k - window + 1` for some
    /// observed `k`.
    fn scan_sparse(&self, hist: &DeltaHistogram) -> Option<(i64, u64)> {
        let first = self.first_start(hist)?;
        let mut best: Option<(i64, u64)> = None;

        for delta in hist.deltas() {
            let start = (delta - self.window + 1).max(first);
            let coverage = hist.coverage(start, self.window);
            match best {
                Some((_, top)) if coverage <= top => {}
                _ => best = Some((start, coverage)),
            }
        }

        best
    }

    /// Start whose window midpoint is the smallest observed delta
    fn first_start(&self, hist: &DeltaHistogram) -> Option<i64> {
        hist.min_delta().map(|min| min - self.window / 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn both_modes(window: i64) -> [ConfidenceScorer; 2] {
        [
            ConfidenceScorer::new(window, 5.0, ScanMode::Dense),
            ConfidenceScorer::new(window, 5.0, ScanMode::Sparse),
        ]
    }

    #[test]
    fn test_single_interval_full_confidence() {
        let hist = DeltaHistogram::from_deltas(std::iter::repeat(300).take(19));

        for scorer in both_modes(2) {
            let score = scorer.score(&hist).unwrap();
            assert_eq!(score.interval_seconds, 300);
            assert_eq!(score.window_start, 299);
            assert_eq!(score.coverage, 19);
            assert_eq!(score.confidence_percent, 100.0);
        }
    }

    #[test]
    fn test_tie_break_prefers_lowest_start() {
        let hist = DeltaHistogram::from_deltas([10, 10, 10, 20, 20, 20]);

        for scorer in both_modes(2) {
            let score = scorer.best_window(&hist).unwrap();
            assert_eq!(score.window_start, 9);
            assert_eq!(score.interval_seconds, 10);
            assert_eq!(score.confidence_percent, 50.0);
        }
    }

    #[test]
    fn test_window_spanning_adjacent_deltas() {
        // 59/60/61 jitter around a one minute beacon, plus noise
        let hist = DeltaHistogram::from_deltas([59, 60, 60, 60, 61, 61, 400, 900]);

        for scorer in both_modes(3) {
            let score = scorer.best_window(&hist).unwrap();
            assert_eq!(score.window_start, 59);
            assert_eq!(score.interval_seconds, 60);
            assert_eq!(score.coverage, 6);
            assert_eq!(score.confidence_percent, 75.0);
        }
    }

    #[test]
    fn test_start_between_observed_deltas() {
        // Best window [11, 14) starts on a gap in the histogram
        let hist = DeltaHistogram::from_deltas([9, 12, 13]);

        for scorer in both_modes(3) {
            let score = scorer.best_window(&hist).unwrap();
            assert_eq!(score.window_start, 11);
            assert_eq!(score.coverage, 2);
        }
    }

    #[test]
    fn test_threshold_is_exclusive() {
        // 1 of 20 in the best window = exactly 5%
        let hist = DeltaHistogram::from_deltas((1..=20).map(|i| i * 100));
        let scorer = ConfidenceScorer::new(2, 5.0, ScanMode::Sparse);

        let best = scorer.best_window(&hist).unwrap();
        assert_eq!(best.confidence_percent, 5.0);
        assert!(scorer.score(&hist).is_none());

        let lenient = ConfidenceScorer::new(2, 4.9, ScanMode::Sparse);
        assert!(lenient.score(&hist).is_some());
    }

    #[test]
    fn test_single_gap_reported_for_any_window() {
        let hist = DeltaHistogram::from_deltas(std::iter::repeat(60).take(19));

        for window in [3, 10, 60] {
            for scorer in both_modes(window) {
                let score = scorer.score(&hist).unwrap();
                assert_eq!(score.interval_seconds, 60, "window {}", window);
                assert_eq!(score.window_start, 60 - window / 2);
                assert_eq!(score.confidence_percent, 100.0);
            }
        }
    }

    #[test]
    fn test_wide_window_never_reports_below_smallest_gap() {
        let hist = DeltaHistogram::from_deltas([3, 3, 3, 4, 3, 5]);

        for scorer in both_modes(10) {
            let score = scorer.best_window(&hist).unwrap();
            assert_eq!(score.window_start, -2);
            assert_eq!(score.interval_seconds, 3);
            assert_eq!(score.coverage, 6);
        }
    }

    #[test]
    fn test_empty_histogram() {
        for scorer in both_modes(2) {
            assert!(scorer.best_window(&DeltaHistogram::new()).is_none());
        }
    }
}
