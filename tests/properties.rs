//! Property tests for the scoring and detection invariants.

use beacon_scout::{
    BeaconDetector, ConfidenceScorer, DeltaHistogram, DetectorConfig, Event, PairKey, ScanMode,
};
use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use std::collections::HashMap;

fn arb_deltas() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(prop_oneof![0i64..50, 0i64..5_000], 1..120)
}

/// Up to six pairs, each a list of gaps drawn from a narrow or wide range
fn arb_log() -> impl Strategy<Value = Vec<Event>> {
    let pair = (0usize..3, 0usize..3, prop::collection::vec(prop_oneof![299i64..302, 1i64..4_000], 0..40));
    prop::collection::vec(pair, 1..6).prop_map(|pairs| {
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let mut events = Vec::new();
        for (s, r, gaps) in pairs {
            let sender = format!("s{}", s);
            let receiver = format!("r{}", r);
            let mut t = base;
            events.push(Event::new(sender.as_str(), receiver.as_str(), t));
            for gap in gaps {
                t += Duration::seconds(gap);
                events.push(Event::new(sender.as_str(), receiver.as_str(), t));
            }
        }
        events
    })
}

fn detector(workers: usize) -> BeaconDetector {
    let config = DetectorConfig {
        worker_count: workers,
        ..DetectorConfig::default()
    };
    BeaconDetector::new(config).unwrap()
}

proptest! {
    #[test]
    fn dense_and_sparse_pick_the_same_window(deltas in arb_deltas(), window in 1i64..20) {
        let hist = DeltaHistogram::from_deltas(deltas);
        let dense = ConfidenceScorer::new(window, 0.0, ScanMode::Dense).best_window(&hist);
        let sparse = ConfidenceScorer::new(window, 0.0, ScanMode::Sparse).best_window(&hist);
        prop_assert_eq!(dense, sparse);
    }

    #[test]
    fn coverage_never_exceeds_total(deltas in arb_deltas(), window in 1i64..20) {
        let hist = DeltaHistogram::from_deltas(deltas);
        let score = ConfidenceScorer::new(window, 0.0, ScanMode::Sparse)
            .best_window(&hist)
            .unwrap();

        prop_assert!(score.coverage >= 1);
        prop_assert!(score.coverage <= score.total);
        prop_assert!(score.confidence_percent > 0.0);
        prop_assert!(score.confidence_percent <= 100.0);
        prop_assert_eq!(score.coverage, hist.coverage(score.window_start, window));
    }

    #[test]
    fn interval_stays_within_observed_range(deltas in arb_deltas(), window in 1i64..200) {
        let hist = DeltaHistogram::from_deltas(deltas);
        for mode in [ScanMode::Dense, ScanMode::Sparse] {
            let score = ConfidenceScorer::new(window, 0.0, mode).best_window(&hist).unwrap();
            prop_assert!(score.interval_seconds >= hist.min_delta().unwrap());
            prop_assert!(score.interval_seconds <= hist.max_delta().unwrap() + window / 2);
        }
    }

    #[test]
    fn no_window_covers_more_than_the_winner(deltas in arb_deltas(), window in 1i64..10) {
        let hist = DeltaHistogram::from_deltas(deltas);
        let score = ConfidenceScorer::new(window, 0.0, ScanMode::Sparse)
            .best_window(&hist)
            .unwrap();

        let lo = hist.min_delta().unwrap() - window / 2;
        let hi = hist.max_delta().unwrap();
        for start in lo..=hi {
            let covered = hist.coverage(start, window);
            prop_assert!(covered <= score.coverage);
            if start < score.window_start {
                prop_assert!(covered < score.coverage);
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn findings_respect_thresholds(events in arb_log()) {
        let config = DetectorConfig::default();
        let report = detector(2).detect(&events).unwrap();

        let mut counts: HashMap<PairKey, usize> = HashMap::new();
        for event in &events {
            if let Some((sender, receiver)) = event.identity() {
                *counts.entry(PairKey::new(sender, receiver)).or_default() += 1;
            }
        }

        for finding in &report.findings {
            let key = PairKey::new(finding.sender.as_str(), finding.receiver.as_str());
            prop_assert!(counts[&key] > config.min_occurrences);
            prop_assert!(finding.confidence_percent > config.min_percent);
            prop_assert!(finding.confidence_percent <= 100.0);
            prop_assert!(finding.total_events as usize <= counts[&key] - 1);
        }
        prop_assert_eq!(report.stats.pairs_retained,
            counts.values().filter(|&&n| n > config.min_occurrences).count());
    }

    #[test]
    fn worker_count_does_not_change_results(events in arb_log()) {
        let single = detector(1).detect(&events).unwrap();
        let pooled = detector(4).detect(&events).unwrap();

        prop_assert_eq!(single.table(), pooled.table());
        prop_assert_eq!(single.stats.pairs_analyzed, pooled.stats.pairs_analyzed);
    }

    #[test]
    fn detection_is_repeatable(events in arb_log()) {
        let detector = detector(3);
        let first = detector.detect(&events).unwrap().table();
        let second = detector.detect(&events).unwrap().table();
        prop_assert_eq!(first, second);
    }
}
