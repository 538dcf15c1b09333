//! Graph families over the whole run: percentile curve, histogram and the
//! satisfied/tolerated/frustrated breakdown.

use crate::percentile::{nearest_rank, sorted};
use crate::run::Run;
use crate::series::{GraphData, Grid, Point, Series, ValuesAcc};

/// Percentile ranks plotted on the response time percentiles curve.
const PERCENTILE_RANKS: std::ops::RangeInclusive<u32> = 0..=100;

pub const REQUESTS_IN_ERROR: &str = "Requests in error";

/// Per label, the nearest-rank response time at every integer percentile.
pub(crate) fn response_time_percentiles(run: &Run) -> Option<GraphData> {
    let mut grid: Grid<ValuesAcc> = Grid::new();
    for m in run.all() {
        for target in run.targets(m) {
            grid.cell(target, 0).0.push(m.elapsed());
        }
    }
    let series = grid
        .into_rows()
        .into_iter()
        .map(|(label, mut row)| {
            let values = row.remove(&0).map(|acc| sorted(&acc.0)).unwrap_or_default();
            let data = PERCENTILE_RANKS
                .map(|p| Point(f64::from(p), nearest_rank(&values, f64::from(p))))
                .collect();
            Series { is_controller: run.is_controller(&label), is_overall: false, label, data }
        })
        .collect();
    GraphData::collect(series, None)
}

/// Per label, sample count in each fixed-width elapsed-time bin. The x value
/// is the lower bound of the bin.
pub(crate) fn response_time_distribution(run: &Run) -> Option<GraphData> {
    let bin = run.config.bin_width_ms as f64;
    let mut grid: Grid<u64> = Grid::new();
    for m in run.all() {
        let lower = ((m.elapsed() / bin).floor() * bin) as i64;
        for target in run.targets(m) {
            *grid.cell(target, lower) += 1;
        }
    }
    let series = grid.into_series(|k, count| Some(Point(k as f64, *count as f64)), run.per_label());
    GraphData::collect(series, None)
}

/// Four category counts: satisfied, tolerated, frustrated, failed. Failed
/// samples are only counted as errors, whatever their response time.
pub(crate) fn synthetic_distribution(run: &Run) -> Option<GraphData> {
    let satisfied = run.config.satisfied_ms as f64;
    let tolerated = run.config.tolerated_ms as f64;
    let mut counts = [0u64; 4];
    for m in &run.measurements {
        let category = if !m.success() {
            3
        } else if m.elapsed() <= satisfied {
            0
        } else if m.elapsed() <= tolerated {
            1
        } else {
            2
        };
        counts[category] += 1;
    }

    let labels = synthetic_labels(run.config.satisfied_ms, run.config.tolerated_ms);
    let series = labels
        .into_iter()
        .zip(counts)
        .enumerate()
        .map(|(i, (label, count))| Series {
            label,
            data: vec![Point(i as f64, count as f64)],
            is_controller: false,
            is_overall: true,
        })
        .collect();
    GraphData::collect(series, None).filter(|_| !run.measurements.is_empty())
}

/// Category names of the synthetic distribution, in x order.
pub fn synthetic_labels(satisfied_ms: u64, tolerated_ms: u64) -> [String; 4] {
    [
        format!("Requests having response time <= {satisfied_ms}ms"),
        format!("Requests having response time > {satisfied_ms}ms and <= {tolerated_ms}ms"),
        format!("Requests having response time > {tolerated_ms}ms"),
        REQUESTS_IN_ERROR.to_string(),
    ]
}

