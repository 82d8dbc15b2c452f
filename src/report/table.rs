use crate::data::BeaconFinding;
use crate::detector::RunStats;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::Write as _;

/// CSV header for exported findings
pub const CSV_HEADER: &str = "sender,receiver,detected_interval,confidence,total_events,total_size,average_size";

/// One exported finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub sender: String,
    pub receiver: String,
    pub detected_interval: i64,
    pub confidence: f64,
    pub total_events: u64,
    pub total_size: Option<f64>,
    pub average_size: Option<f64>,
}

impl From<&BeaconFinding> for ReportRow {
    fn from(f: &BeaconFinding) -> Self {
        Self {
            sender: f.sender.clone(),
            receiver: f.receiver.clone(),
            detected_interval: f.interval_seconds,
            confidence: f.confidence_percent,
            total_events: f.total_events,
            total_size: f.total_size,
            average_size: f.average_size,
        }
    }
}

/// Findings in a stable order: confidence descending, then sender,
/// receiver and interval ascending.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultTable {
    rows: Vec<ReportRow>,
}

impl ResultTable {
    pub fn from_findings(findings: &[BeaconFinding]) -> Self {
        let mut rows: Vec<ReportRow> = findings.iter().map(ReportRow::from).collect();
        rows.sort_by(compare_rows);
        Self { rows }
    }

    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render as CSV with a header line
    pub fn to_csv(&self) -> String {
        let mut out = String::with_capacity(64 * (self.rows.len() + 1));
        out.push_str(CSV_HEADER);
        out.push('\n');

        for row in &self.rows {
            let _ = writeln!(
                out,
                "{},{},{},{:.1},{},{},{}",
                csv_field(&row.sender),
                csv_field(&row.receiver),
                row.detected_interval,
                row.confidence,
                row.total_events,
                optional(row.total_size),
                optional(row.average_size),
            );
        }

        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.rows)
    }

    /// Console summary of findings and run diagnostics
    pub fn render_summary(&self, stats: &RunStats) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "╔════════════════════════════════════════════════╗");
        let _ = writeln!(out, "║         BEACON DETECTION SUMMARY               ║");
        let _ = writeln!(out, "╠════════════════════════════════════════════════╣");
        let _ = writeln!(out, "║ Events: {:<38} ║", stats.events_total);
        let _ = writeln!(out, "║ Events Without Identity: {:<21} ║", stats.events_missing_identity);
        let _ = writeln!(out, "║ Pairs: {:<39} ║", stats.pairs_total);
        let _ = writeln!(out, "║ Pairs Analyzed: {:<30} ║", stats.pairs_analyzed);
        let _ = writeln!(out, "║ Pairs Skipped: {:<31} ║", stats.pairs_skipped);
        for (reason, count) in &stats.skip_reasons {
            let _ = writeln!(out, "║   {:<24} {:<19} ║", reason.to_string(), count);
        }
        if stats.interrupted {
            let _ = writeln!(out, "║ Not Dispatched (stopped early): {:<14} ║", stats.pairs_not_dispatched);
        }
        let _ = writeln!(out, "║ Findings: {:<36} ║", self.rows.len());
        let _ = writeln!(out, "║ Elapsed: {:<34} ms ║", stats.elapsed_ms);
        let _ = writeln!(out, "╚════════════════════════════════════════════════╝");

        if !self.rows.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(
                out,
                "{:<30} {:<30} {:>10} {:>11} {:>8}",
                "SENDER", "RECEIVER", "INTERVAL", "CONFIDENCE", "EVENTS"
            );
            for row in &self.rows {
                let _ = writeln!(
                    out,
                    "{:<30} {:<30} {:>9}s {:>10.1}% {:>8}",
                    row.sender, row.receiver, row.detected_interval, row.confidence, row.total_events
                );
            }
        }

        out
    }

    pub fn print_summary(&self, stats: &RunStats) {
        println!("\n{}", self.render_summary(stats));
    }
}

fn compare_rows(a: &ReportRow, b: &ReportRow) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then_with(|| a.sender.cmp(&b.sender))
        .then_with(|| a.receiver.cmp(&b.receiver))
        .then_with(|| a.detected_interval.cmp(&b.detected_interval))
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
