use crate::data::{BeaconFinding, PairGroup};
use crate::error::{PairAnalysisError, SkipReason};
use crate::utils::DetectorMetrics;
use crossbeam::channel;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Outcome of one dispatch over all retained pairs
#[derive(Debug, Clone, Default)]
pub struct DispatchOutcome {
    /// Collected in completion order, not sorted
    pub findings: Vec<BeaconFinding>,
    pub analyzed: usize,
    pub without_finding: usize,
    pub skipped: BTreeMap<SkipReason, usize>,
    /// Jobs still queued when the run was stopped
    pub not_dispatched: usize,
    pub interrupted: bool,
}

impl DispatchOutcome {
    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }
}

/// Fixed-size worker pool over a pre-seeded job queue
///
/// The queue holds one job per pair and is closed before workers start, so
/// workers exit as soon as it drains. The only shared mutable state is the
/// finding sink (mutex) and the counters.
pub struct Dispatcher {
    worker_count: usize,
    timeout: Option<Duration>,
    cancel: Option<Arc<AtomicBool>>,
    metrics: Option<DetectorMetrics>,
}

impl Dispatcher {
    pub fn new(worker_count: usize) -> Self {
        Self {
            worker_count: worker_count.max(1),
            timeout: None,
            cancel: None,
            metrics: None,
        }
    }

    /// Stop pulling new jobs once `timeout` has elapsed
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Stop pulling new jobs once `flag` is set
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn with_metrics(mut self, metrics: DetectorMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Run `analyze` for every group across the pool
    pub fn run<F>(&self, groups: Vec<PairGroup>, analyze: F) -> DispatchOutcome
    where
        F: Fn(&PairGroup) -> Result<Option<BeaconFinding>, PairAnalysisError> + Sync,
    {
        let job_count = groups.len();
        if job_count == 0 {
            return DispatchOutcome::default();
        }

        let (job_tx, job_rx) = channel::bounded::<PairGroup>(job_count);
        for group in groups {
            // Capacity equals job count and the receiver is alive
            if job_tx.send(group).is_err() {
                break;
            }
        }
        drop(job_tx);

        let deadline = self.timeout.map(|t| Instant::now() + t);
        let findings = Mutex::new(Vec::new());
        let skipped: DashMap<SkipReason, usize> = DashMap::new();
        let analyzed = AtomicUsize::new(0);
        let without_finding = AtomicUsize::new(0);
        let stopped = AtomicBool::new(false);

        let workers = self.worker_count.min(job_count);
        debug!("Dispatching {} pairs across {} workers", job_count, workers);

        thread::scope(|scope| {
            for worker_id in 0..workers {
                let job_rx = job_rx.clone();
                let analyze = &analyze;
                let findings = &findings;
                let skipped = &skipped;
                let analyzed = &analyzed;
                let without_finding = &without_finding;
                let stopped = &stopped;

                scope.spawn(move || {
                    let mut handled = 0usize;

                    loop {
                        if self.should_stop(deadline) {
                            stopped.store(true, Ordering::Relaxed);
                            break;
                        }

                        let group = match job_rx.recv() {
                            Ok(group) => group,
                            Err(_) => break,
                        };
                        handled += 1;

                        let started = Instant::now();
                        let outcome = panic::catch_unwind(AssertUnwindSafe(|| analyze(&group)))
                            .unwrap_or_else(|payload| Err(PairAnalysisError::Panicked(panic_message(payload))));

                        if let Some(metrics) = &self.metrics {
                            metrics.pair_analysis_seconds.observe(started.elapsed().as_secs_f64());
                        }

                        match outcome {
                            Ok(Some(finding)) => {
                                analyzed.fetch_add(1, Ordering::Relaxed);
                                if let Some(metrics) = &self.metrics {
                                    metrics.pairs_analyzed.inc();
                                    metrics.findings.inc();
                                }
                                findings
                                    .lock()
                                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                                    .push(finding);
                            }
                            Ok(None) => {
                                analyzed.fetch_add(1, Ordering::Relaxed);
                                without_finding.fetch_add(1, Ordering::Relaxed);
                                if let Some(metrics) = &self.metrics {
                                    metrics.pairs_analyzed.inc();
                                }
                            }
                            Err(e) => {
                                warn!("Skipping pair {}: {}", group.key, e);
                                *skipped.entry(e.reason()).or_insert(0) += 1;
                                if let Some(metrics) = &self.metrics {
                                    let reason = e.reason().to_string();
                                    metrics.pairs_skipped.with_label_values(&[reason.as_str()]).inc();
                                }
                            }
                        }
                    }

                    debug!("Worker {} exiting after {} pairs", worker_id, handled);
                });
            }
        });

        let not_dispatched = job_rx.len();
        let interrupted = stopped.load(Ordering::Relaxed) && not_dispatched > 0;
        if interrupted {
            warn!("Run stopped early, {} pairs were not analyzed", not_dispatched);
        }

        DispatchOutcome {
            findings: findings.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner()),
            analyzed: analyzed.into_inner(),
            without_finding: without_finding.into_inner(),
            skipped: skipped.into_iter().collect(),
            not_dispatched,
            interrupted,
        }
    }

    fn should_stop(&self, deadline: Option<Instant>) -> bool {
        if let Some(flag) = &self.cancel {
            if flag.load(Ordering::Relaxed) {
                return true;
            }
        }
        deadline.map_or(false, |d| Instant::now() >= d)
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Event, PairKey};
    use chrono::{TimeZone, Utc};

    fn groups(n: usize) -> Vec<PairGroup> {
        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        (0..n)
            .map(|i| PairGroup {
                key: PairKey::new(format!("s{}", i), "r"),
                events: vec![Event::new(format!("s{}", i), "r", ts)],
            })
            .collect()
    }

    fn finding_for(group: &PairGroup) -> BeaconFinding {
        BeaconFinding {
            sender: group.sender().to_string(),
            receiver: group.receiver().to_string(),
            interval_seconds: 60,
            confidence_percent: 100.0,
            total_events: 1,
            total_size: None,
            average_size: None,
            interval_stats: None,
        }
    }

    #[test]
    fn test_every_job_processed_once() {
        for workers in [1, 3, 16] {
            let outcome = Dispatcher::new(workers).run(groups(25), |g| Ok(Some(finding_for(g))));

            assert_eq!(outcome.analyzed, 25);
            assert_eq!(outcome.findings.len(), 25);
            assert_eq!(outcome.not_dispatched, 0);
            assert!(!outcome.interrupted);

            let mut senders: Vec<_> = outcome.findings.iter().map(|f| f.sender.clone()).collect();
            senders.sort();
            senders.dedup();
            assert_eq!(senders.len(), 25);
        }
    }

    #[test]
    fn test_failures_are_isolated() {
        let outcome = Dispatcher::new(4).run(groups(10), |g| {
            if g.sender() == "s3" {
                Err(PairAnalysisError::MalformedSize { raw: "x".into() })
            } else if g.sender() == "s7" {
                panic!("boom");
            } else {
                Ok(Some(finding_for(g)))
            }
        });

        assert_eq!(outcome.findings.len(), 8);
        assert_eq!(outcome.skipped_total(), 2);
        assert_eq!(outcome.skipped[&SkipReason::MalformedSize], 1);
        assert_eq!(outcome.skipped[&SkipReason::Panicked], 1);
    }

    #[test]
    fn test_no_finding_counted() {
        let outcome = Dispatcher::new(2).run(groups(5), |_| Ok(None));
        assert_eq!(outcome.analyzed, 5);
        assert_eq!(outcome.without_finding, 5);
        assert!(outcome.findings.is_empty());
    }

    #[test]
    fn test_cancel_flag_stops_dispatch() {
        let flag = Arc::new(AtomicBool::new(true));
        let outcome = Dispatcher::new(2)
            .with_cancel_flag(flag)
            .run(groups(10), |g| Ok(Some(finding_for(g))));

        assert!(outcome.interrupted);
        assert_eq!(outcome.not_dispatched, 10);
        assert!(outcome.findings.is_empty());
    }

    #[test]
    fn test_timeout_returns_partial_results() {
        let outcome = Dispatcher::new(1)
            .with_timeout(Some(Duration::from_millis(50)))
            .run(groups(20), |g| {
                thread::sleep(Duration::from_millis(20));
                Ok(Some(finding_for(g)))
            });

        assert!(outcome.interrupted);
        assert!(outcome.not_dispatched > 0);
        assert_eq!(outcome.findings.len() + outcome.not_dispatched, 20);
    }

    #[test]
    fn test_metrics_recorded() {
        let metrics = DetectorMetrics::new().unwrap();
        Dispatcher::new(2)
            .with_metrics(metrics.clone())
            .run(groups(4), |g| {
                if g.sender() == "s0" {
                    Err(PairAnalysisError::MalformedTimestamp { raw: "?".into() })
                } else {
                    Ok(Some(finding_for(g)))
                }
            });

        assert_eq!(metrics.pairs_analyzed.get(), 3);
        assert_eq!(metrics.findings.get(), 3);
        assert_eq!(
            metrics.pairs_skipped.with_label_values(&["malformed_timestamp"]).get(),
            1
        );
    }

    #[test]
    fn test_empty_input() {
        let outcome = Dispatcher::new(4).run(Vec::new(), |_| Ok(None));
        assert_eq!(outcome.analyzed, 0);
        assert!(!outcome.interrupted);
    }
}
