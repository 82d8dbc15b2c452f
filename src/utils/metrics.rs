use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Prometheus instruments for detector runs, held in a private registry.
#[derive(Clone)]
pub struct DetectorMetrics {
    registry: Registry,
    pub pairs_analyzed: IntCounter,
    pub pairs_skipped: IntCounterVec,
    pub findings: IntCounter,
    pub pair_analysis_seconds: Histogram,
}

impl DetectorMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new_custom(Some("beacon".to_string()), None)?;

        let pairs_analyzed = IntCounter::new("pairs_analyzed_total", "Pairs that completed interval analysis")?;
        let pairs_skipped = IntCounterVec::new(
            Opts::new("pairs_skipped_total", "Pairs skipped because of malformed fields"),
            &["reason"],
        )?;
        let findings = IntCounter::new("findings_total", "Pairs reported as beaconing")?;
        let pair_analysis_seconds = Histogram::with_opts(
            HistogramOpts::new("pair_analysis_seconds", "Time spent analyzing one pair")
                .buckets(vec![0.00001, 0.0001, 0.001, 0.01, 0.1, 1.0]),
        )?;

        registry.register(Box::new(pairs_analyzed.clone()))?;
        registry.register(Box::new(pairs_skipped.clone()))?;
        registry.register(Box::new(findings.clone()))?;
        registry.register(Box::new(pair_analysis_seconds.clone()))?;

        Ok(Self {
            registry,
            pairs_analyzed,
            pairs_skipped,
            findings,
            pair_analysis_seconds,
        })
    }

    /// Text exposition format snapshot
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!("Failed to encode metrics: {}", e);
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_counters() {
        let metrics = DetectorMetrics::new().unwrap();
        metrics.pairs_analyzed.inc_by(3);
        metrics.pairs_skipped.with_label_values(&["malformed_size"]).inc();
        metrics.findings.inc();

        let text = metrics.render();
        assert!(text.contains("beacon_pairs_analyzed_total 3"));
        assert!(text.contains("beacon_pairs_skipped_total{reason=\"malformed_size\"} 1"));
        assert!(text.contains("beacon_findings_total 1"));
    }

    #[test]
    fn test_instances_are_independent() {
        let a = DetectorMetrics::new().unwrap();
        let b = DetectorMetrics::new().unwrap();
        a.findings.inc();
        assert_eq!(b.findings.get(), 0);
    }
}
