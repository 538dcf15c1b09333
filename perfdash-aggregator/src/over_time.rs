//! Graph families whose x axis is a bucket timestamp.

use std::collections::BTreeMap;

use crate::percentile::{sorted, PercentileSet};
use crate::run::{overall, Run};
use crate::series::{GraphData, Grid, MeanAcc, Point, Series, ValuesAcc};
use crate::validate::Measurement;

pub const TRANSACTION_SUCCESS: &str = "Transaction-success";
pub const TRANSACTION_FAILURE: &str = "Transaction-failure";
pub const BYTES_RECEIVED: &str = "Bytes received per second";
pub const BYTES_SENT: &str = "Bytes sent per second";

pub(crate) fn response_times(run: &Run) -> Option<GraphData> {
    mean_over_time(run, |m| Some(m.elapsed()))
}

pub(crate) fn latencies(run: &Run) -> Option<GraphData> {
    mean_over_time(run, |m| m.latency)
}

pub(crate) fn connect_times(run: &Run) -> Option<GraphData> {
    mean_over_time(run, |m| m.connect)
}

/// Per-label mean of `value` per bucket. Samples without a value add nothing.
fn mean_over_time<F>(run: &Run, value: F) -> Option<GraphData>
where
    F: Fn(&Measurement) -> Option<f64>,
{
    let mut grid: Grid<MeanAcc> = Grid::new();
    for m in run.all() {
        let Some(v) = value(m) else { continue };
        let bucket = run.bucket(m.timestamp());
        for target in run.targets(m) {
            grid.cell(target, bucket).add(v);
        }
    }
    let series = grid.into_series(|k, acc| acc.mean().map(|y| Point(k as f64, y)), run.per_label());
    GraphData::collect(series, Some(run.config.granularity_ms))
}

pub(crate) fn hits_per_second(run: &Run) -> Option<GraphData> {
    let mut grid: Grid<u64> = Grid::new();
    for m in run.all() {
        let bucket = run.bucket(m.timestamp());
        for target in run.targets(m) {
            *grid.cell(target, bucket) += 1;
        }
    }
    let series = grid.into_series(rate(run), run.per_label());
    GraphData::collect(series, Some(run.config.granularity_ms))
}

/// `<label>-success` and `<label>-failure` transactions per second.
pub(crate) fn transactions_per_second(run: &Run) -> Option<GraphData> {
    let mut grid: Grid<u64> = Grid::new();
    for m in run.all() {
        let bucket = run.bucket(m.timestamp());
        let suffix = outcome_suffix(m.success());
        for target in run.targets(m) {
            *grid.cell(&format!("{target}-{suffix}"), bucket) += 1;
        }
    }
    let classify = |label: &str| {
        let base = label
            .strip_suffix("-success")
            .or_else(|| label.strip_suffix("-failure"))
            .unwrap_or(label);
        (run.is_controller(base), false)
    };
    let series = grid.into_series(rate(run), classify);
    GraphData::collect(series, Some(run.config.granularity_ms))
}

/// Run-wide transactions per second split by outcome. Controller rows are
/// derived, so each sample is counted once.
pub(crate) fn total_tps(run: &Run) -> Option<GraphData> {
    let mut grid: Grid<u64> = Grid::new();
    for m in &run.measurements {
        let label = if m.success() { TRANSACTION_SUCCESS } else { TRANSACTION_FAILURE };
        *grid.cell(label, run.bucket(m.timestamp())) += 1;
    }
    let series = grid.into_series(rate(run), overall);
    GraphData::collect(series, Some(run.config.granularity_ms))
}

pub(crate) fn codes_per_second(run: &Run) -> Option<GraphData> {
    let mut grid: Grid<u64> = Grid::new();
    for m in &run.measurements {
        let Some(code) = m.sample.response_code.as_deref() else { continue };
        *grid.cell(code, run.bucket(m.timestamp())) += 1;
    }
    let series = grid.into_series(rate(run), overall);
    GraphData::collect(series, Some(run.config.granularity_ms))
}

/// Bytes received and sent per second; missing byte counts contribute zero.
/// Totals are `u128`; summed `u64` byte counts cannot overflow them.
pub(crate) fn bytes_throughput(run: &Run) -> Option<GraphData> {
    let mut grid: Grid<u128> = Grid::new();
    for m in &run.measurements {
        let bucket = run.bucket(m.timestamp());
        *grid.cell(BYTES_RECEIVED, bucket) += u128::from(m.sample.bytes_received.unwrap_or(0));
        *grid.cell(BYTES_SENT, bucket) += u128::from(m.sample.bytes_sent.unwrap_or(0));
    }
    let secs = run.granularity_secs();
    let series =
        grid.into_series(move |k, total| Some(Point(k as f64, *total as f64 / secs)), overall);
    GraphData::collect(series, Some(run.config.granularity_ms))
}

/// Mean active threads per thread group; the request label stands in when a
/// sample carries no group.
pub(crate) fn active_threads(run: &Run) -> Option<GraphData> {
    let mut grid: Grid<MeanAcc> = Grid::new();
    for m in &run.measurements {
        let Some(threads) = m.sample.active_threads else { continue };
        let group = m.sample.thread_group.as_deref().unwrap_or(m.label);
        grid.cell(group, run.bucket(m.timestamp())).add(f64::from(threads));
    }
    let series =
        grid.into_series(|k, acc| acc.mean().map(|y| Point(k as f64, y)), |_| (false, false));
    GraphData::collect(series, Some(run.config.granularity_ms))
}

/// Run-wide percentile set per bucket, one series per statistic.
pub(crate) fn percentiles_over_time(run: &Run) -> Option<GraphData> {
    let mut buckets: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
    for m in &run.measurements {
        buckets.entry(run.bucket(m.timestamp())).or_default().push(m.elapsed());
    }

    let sets: Vec<(f64, PercentileSet)> = buckets
        .iter()
        .filter_map(|(x, values)| PercentileSet::from_values(values).map(|s| (*x as f64, s)))
        .collect();

    let stats: [(&str, fn(&PercentileSet) -> f64); 6] = [
        ("Min", |s| s.min),
        ("Median", |s| s.median),
        ("90th percentile", |s| s.p90),
        ("95th percentile", |s| s.p95),
        ("99th percentile", |s| s.p99),
        ("Max", |s| s.max),
    ];
    let series = stats
        .iter()
        .map(|(label, stat)| Series {
            label: label.to_string(),
            data: sets.iter().map(|(x, s)| Point(*x, stat(s))).collect(),
            is_controller: false,
            is_overall: true,
        })
        .collect();
    GraphData::collect(series, Some(run.config.granularity_ms))
}

/// Per-label percentile set of every occupied bucket, in bucket order.
pub(crate) fn label_percentiles(run: &Run) -> BTreeMap<String, Vec<BucketPercentiles>> {
    let mut grid: Grid<ValuesAcc> = Grid::new();
    for m in run.all() {
        let bucket = run.bucket(m.timestamp());
        for target in run.targets(m) {
            grid.cell(target, bucket).0.push(m.elapsed());
        }
    }
    grid.into_rows()
        .into_iter()
        .map(|(label, row)| {
            let sets = row
                .into_iter()
                .map(|(x, acc)| BucketPercentiles {
                    x,
                    percentiles: PercentileSet::from_sorted(&sorted(&acc.0)),
                })
                .collect();
            (label, sets)
        })
        .collect()
}

/// A percentile set tagged with its bucket start.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct BucketPercentiles {
    pub x: i64,
    pub percentiles: PercentileSet,
}

fn outcome_suffix(success: bool) -> &'static str {
    if success {
        "success"
    } else {
        "failure"
    }
}

/// Finalizer turning a per-bucket total into a per-second rate.
fn rate(run: &Run) -> impl FnMut(i64, &u64) -> Option<Point> {
    let secs = run.granularity_secs();
    move |k, total| Some(Point(k as f64, *total as f64 / secs))
}
