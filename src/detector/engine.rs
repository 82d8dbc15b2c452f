use crate::analysis::{ConfidenceScorer, IntervalAnalyzer, PairAggregator};
use crate::data::{BeaconFinding, Event, PairGroup};
use crate::detector::dispatch::Dispatcher;
use crate::error::{InputError, PairAnalysisError, Result, SkipReason};
use crate::report::ResultTable;
use crate::utils::{DetectorConfig, DetectorMetrics};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Diagnostics for one detection run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub events_total: usize,
    pub events_missing_identity: usize,
    pub pairs_total: usize,
    /// Pairs above `min_occurrences`
    pub pairs_retained: usize,
    pub pairs_analyzed: usize,
    pub pairs_without_finding: usize,
    pub pairs_skipped: usize,
    pub skip_reasons: BTreeMap<SkipReason, usize>,
    pub pairs_not_dispatched: usize,
    pub interrupted: bool,
    pub elapsed_ms: u64,
}

/// Findings plus diagnostics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionReport {
    /// Unordered; use [`DetectionReport::table`] for a sorted view
    pub findings: Vec<BeaconFinding>,
    pub stats: RunStats,
}

impl DetectionReport {
    pub fn table(&self) -> ResultTable {
        ResultTable::from_findings(&self.findings)
    }
}

/// Beacon detection engine
///
/// Pipeline: aggregate pairs → (per pair, in parallel) interval analysis →
/// confidence scoring → collect findings.
pub struct BeaconDetector {
    config: DetectorConfig,
    cancel: Option<Arc<AtomicBool>>,
    metrics: Option<DetectorMetrics>,
}

impl BeaconDetector {
    /// Create a detector, validating the configuration up front
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            cancel: None,
            metrics: None,
        })
    }

    /// Stop dispatching new pairs once `flag` is set
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn with_metrics(mut self, metrics: DetectorMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Run detection over a materialized event collection
    ///
    /// Fails only on empty/unusable input. Per-pair problems are skipped and
    /// counted in [`RunStats`].
    pub fn detect(&self, events: &[Event]) -> Result<DetectionReport> {
        let started = Instant::now();

        if events.is_empty() {
            return Err(InputError::Empty.into());
        }

        let aggregation = PairAggregator::new(self.config.min_occurrences).aggregate(events);
        if aggregation.events_missing_identity == aggregation.events_total {
            return Err(InputError::NoUsableEvents { total: aggregation.events_total }.into());
        }

        info!(
            "Analyzing {} of {} pairs ({} events, {} workers)",
            aggregation.groups.len(),
            aggregation.pairs_total,
            aggregation.events_total,
            self.config.worker_count
        );

        let mut dispatcher = Dispatcher::new(self.config.worker_count).with_timeout(self.config.timeout());
        if let Some(flag) = &self.cancel {
            dispatcher = dispatcher.with_cancel_flag(Arc::clone(flag));
        }
        if let Some(metrics) = &self.metrics {
            dispatcher = dispatcher.with_metrics(metrics.clone());
        }

        let pairs_retained = aggregation.groups.len();
        let outcome = dispatcher.run(aggregation.groups, |group| self.analyze_pair(group));

        let stats = RunStats {
            events_total: aggregation.events_total,
            events_missing_identity: aggregation.events_missing_identity,
            pairs_total: aggregation.pairs_total,
            pairs_retained,
            pairs_analyzed: outcome.analyzed,
            pairs_without_finding: outcome.without_finding,
            pairs_skipped: outcome.skipped_total(),
            skip_reasons: outcome.skipped.clone(),
            pairs_not_dispatched: outcome.not_dispatched,
            interrupted: outcome.interrupted,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            "Detection finished: {} findings, {} pairs skipped, {} ms",
            outcome.findings.len(),
            stats.pairs_skipped,
            stats.elapsed_ms
        );

        Ok(DetectionReport {
            findings: outcome.findings,
            stats,
        })
    }

    /// Interval analysis and confidence scoring for a single pair
    pub fn analyze_pair(&self, group: &PairGroup) -> std::result::Result<Option<BeaconFinding>, PairAnalysisError> {
        let analysis = match IntervalAnalyzer::new(self.config.min_interval).analyze(group)? {
            Some(analysis) => analysis,
            None => return Ok(None),
        };

        let scorer = ConfidenceScorer::new(self.config.window, self.config.min_percent, self.config.scan);
        let score = match scorer.score(&analysis.histogram) {
            Some(score) => score,
            None => return Ok(None),
        };

        debug!(
            "Beacon {}: every {}s, {:.1}% of {} intervals",
            group.key, score.interval_seconds, score.confidence_percent, score.total
        );

        Ok(Some(BeaconFinding {
            sender: group.sender().to_string(),
            receiver: group.receiver().to_string(),
            interval_seconds: score.interval_seconds,
            confidence_percent: score.confidence_percent,
            total_events: analysis.total(),
            total_size: analysis.total_size,
            average_size: analysis.average_size,
            interval_stats: analysis.stats(),
        }))
    }
}
