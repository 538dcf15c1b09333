use serde::Serialize;
use std::collections::BTreeMap;

use crate::percentile::PercentileSet;
use crate::run::Run;
use crate::validate::Measurement;

/// Label of the run-wide statistics row.
pub const TOTAL_LABEL: &str = "Total";

/// One row of the request statistics table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsRow {
    pub label: String,
    pub is_controller: bool,
    pub samples: u64,
    pub errors: u64,
    /// Errors as a percentage of samples.
    pub error_pct: f64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
    /// Transactions per second over the row's own time span.
    pub throughput: f64,
    pub received_kb_per_sec: f64,
    pub sent_kb_per_sec: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub total: StatisticsRow,
    pub rows: Vec<StatisticsRow>,
}

impl Statistics {
    pub fn row(&self, label: &str) -> Option<&StatisticsRow> {
        self.rows.iter().find(|r| r.label == label)
    }
}

#[derive(Default)]
struct RowAcc {
    elapsed: Vec<f64>,
    errors: u64,
    bytes_received: u128,
    bytes_sent: u128,
    first_start: Option<i64>,
    last_end: Option<f64>,
}

impl RowAcc {
    fn add(&mut self, m: &Measurement) {
        self.elapsed.push(m.elapsed());
        if !m.success() {
            self.errors += 1;
        }
        self.bytes_received += u128::from(m.sample.bytes_received.unwrap_or(0));
        self.bytes_sent += u128::from(m.sample.bytes_sent.unwrap_or(0));
        let end = m.timestamp() as f64 + m.elapsed();
        self.first_start = Some(self.first_start.map_or(m.timestamp(), |t| t.min(m.timestamp())));
        self.last_end = Some(self.last_end.map_or(end, |t| t.max(end)));
    }

    /// `None` for an accumulator that never saw a sample.
    fn finish(self, label: &str, is_controller: bool) -> Option<StatisticsRow> {
        let set = PercentileSet::from_values(&self.elapsed)?;
        let samples = self.elapsed.len() as u64;
        let span_secs = match (self.first_start, self.last_end) {
            (Some(start), Some(end)) => (end - start as f64) / 1_000.0,
            _ => 0.0,
        };
        let per_sec = |v: f64| if span_secs > 0.0 { v / span_secs } else { 0.0 };
        Some(StatisticsRow {
            label: label.to_string(),
            is_controller,
            samples,
            errors: self.errors,
            error_pct: self.errors as f64 * 100.0 / samples as f64,
            mean: self.elapsed.iter().sum::<f64>() / samples as f64,
            min: set.min,
            max: set.max,
            median: set.median,
            p90: set.p90,
            p95: set.p95,
            p99: set.p99,
            throughput: per_sec(samples as f64),
            received_kb_per_sec: per_sec(self.bytes_received as f64 / 1_024.0),
            sent_kb_per_sec: per_sec(self.bytes_sent as f64 / 1_024.0),
        })
    }
}

/// Per-label rows plus the `Total` row, which counts every sample behind a
/// row once. `None` when no row has samples.
pub(crate) fn build(run: &Run) -> Option<Statistics> {
    let mut total = RowAcc::default();
    let mut rows: BTreeMap<&str, RowAcc> = BTreeMap::new();
    for m in run.all() {
        total.add(m);
        for target in run.targets(m) {
            rows.entry(target).or_default().add(m);
        }
    }
    let total = total.finish(TOTAL_LABEL, false)?;
    let rows = rows
        .into_iter()
        .filter_map(|(label, acc)| acc.finish(label, run.is_controller(label)))
        .collect();
    Some(Statistics { total, rows })
}
