use anyhow::Context;
use beacon_scout::ingest::ingest_str;
use beacon_scout::utils::init_logging;
use beacon_scout::{AppConfig, BeaconDetector, DetectorMetrics, ScanMode};
use chrono::{DateTime, Utc};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Detect periodic sender→receiver communication in an exported event log
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON array or NDJSON file of search documents
    input: PathBuf,

    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Pairs need more than this many events
    #[arg(long)]
    min_occurrences: Option<usize>,

    /// Findings need confidence above this percentage
    #[arg(long)]
    min_percent: Option<f64>,

    /// Sliding window width in seconds
    #[arg(long, allow_hyphen_values = true)]
    window: Option<i64>,

    /// Ignore gaps shorter than this many seconds
    #[arg(long, allow_hyphen_values = true)]
    min_interval: Option<i64>,

    /// Lookback period in hours
    #[arg(long)]
    period: Option<u32>,

    /// End of the lookback period (RFC 3339); newest event when omitted
    #[arg(long, value_parser = parse_instant)]
    until: Option<DateTime<Utc>>,

    /// Worker pool size
    #[arg(short, long)]
    workers: Option<usize>,

    /// Stop dispatching new pairs after this many seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Scan every integer window start instead of observed deltas only
    #[arg(long)]
    dense: bool,

    /// Write findings as CSV
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Write findings as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Write a Prometheus text snapshot
    #[arg(long)]
    metrics: Option<PathBuf>,
}

impl Args {
    /// Command-line values win over file and environment
    fn apply(&self, config: &mut AppConfig) {
        let detector = &mut config.detector;
        if let Some(v) = self.min_occurrences {
            detector.min_occurrences = v;
        }
        if let Some(v) = self.min_percent {
            detector.min_percent = v;
        }
        if let Some(v) = self.window {
            detector.window = v;
        }
        if let Some(v) = self.min_interval {
            detector.min_interval = v;
        }
        if let Some(v) = self.period {
            detector.period_hours = v;
        }
        if let Some(v) = self.workers {
            detector.worker_count = v;
        }
        if self.timeout.is_some() {
            detector.timeout_secs = self.timeout;
        }
        if self.dense {
            detector.scan = ScanMode::Dense;
        }
        if self.until.is_some() {
            config.ingest.until = self.until;
        }
        if self.csv.is_some() {
            config.output.csv_path = self.csv.clone();
        }
        if self.json.is_some() {
            config.output.json_path = self.json.clone();
        }
        if self.metrics.is_some() {
            config.metrics.export_path = self.metrics.clone();
        }
    }
}

fn parse_instant(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| format!("expected RFC 3339 timestamp: {}", e))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    let args = Args::parse();

    let mut config = AppConfig::load(args.config.as_deref())?;
    args.apply(&mut config);
    config.detector.validate()?;

    init_logging(&config.logging).context("failed to initialize logging")?;

    info!("Reading events from {}", args.input.display());
    let input = tokio::fs::read_to_string(&args.input)
        .await
        .with_context(|| format!("failed to read {}", args.input.display()))?;

    let events = ingest_str(&input, &config.ingest, config.detector.period_hours)?;

    let metrics = if config.metrics.enabled || config.metrics.export_path.is_some() {
        Some(DetectorMetrics::new()?)
    } else {
        None
    };

    let cancel = Arc::new(AtomicBool::new(false));
    let mut detector = BeaconDetector::new(config.detector.clone())?.with_cancel_flag(Arc::clone(&cancel));
    if let Some(metrics) = &metrics {
        detector = detector.with_metrics(metrics.clone());
    }

    let mut task = tokio::task::spawn_blocking(move || detector.detect(&events));

    let report = tokio::select! {
        result = &mut task => result??,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, waiting for in-flight pairs");
            cancel.store(true, Ordering::Relaxed);
            task.await??
        }
    };

    let table = report.table();
    table.print_summary(&report.stats);

    if let Some(path) = &config.output.csv_path {
        tokio::fs::write(path, table.to_csv()).await?;
        info!("Findings saved to: {}", path.display());
    }

    if let Some(path) = &config.output.json_path {
        tokio::fs::write(path, table.to_json()?).await?;
        info!("Findings saved to: {}", path.display());
    }

    if let (Some(metrics), Some(path)) = (&metrics, &config.metrics.export_path) {
        tokio::fs::write(path, metrics.render()).await?;
        info!("Metrics snapshot saved to: {}", path.display());
    }

    Ok(())
}
