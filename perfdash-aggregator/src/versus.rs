//! Graph families plotting one metric against another instead of time.

use std::collections::BTreeMap;

use crate::percentile::{median, sorted};
use crate::run::{overall, Run};
use crate::series::{GraphData, Grid, MeanAcc, Point, Series, ValuesAcc};
use crate::validate::Measurement;

pub const SUCCESSES: &str = "Successes";
pub const FAILURES: &str = "Failures";

/// Suffix of the roll-up row that averages a label over all thread counts.
pub const AGGREGATED_SUFFIX: &str = "-Aggregated";

/// Per label, mean elapsed time at each active thread count, followed by a
/// `<label>-Aggregated` row holding a single point: mean thread count against
/// mean elapsed time over the whole run.
pub(crate) fn time_vs_threads(run: &Run) -> Option<GraphData> {
    let mut grid: Grid<MeanAcc> = Grid::new();
    let mut rollup: BTreeMap<&str, (MeanAcc, MeanAcc)> = BTreeMap::new();
    for m in run.all() {
        let Some(threads) = m.sample.active_threads else { continue };
        for target in run.targets(m) {
            grid.cell(target, i64::from(threads)).add(m.elapsed());
            let (x, y) = rollup.entry(target).or_default();
            x.add(f64::from(threads));
            y.add(m.elapsed());
        }
    }

    let mut series =
        grid.into_series(|k, acc| acc.mean().map(|y| Point(k as f64, y)), run.per_label());
    let aggregated: Vec<Series> = rollup
        .into_iter()
        .filter_map(|(label, (x, y))| {
            Some(Series {
                label: format!("{label}{AGGREGATED_SUFFIX}"),
                data: vec![Point(x.mean()?, y.mean()?)],
                is_controller: run.is_controller(label),
                is_overall: false,
            })
        })
        .collect();
    series.extend(aggregated);
    GraphData::collect(series, None)
}

pub(crate) fn response_time_vs_request(run: &Run) -> Option<GraphData> {
    median_vs_request(run, |m| Some(m.elapsed()))
}

pub(crate) fn latency_vs_request(run: &Run) -> Option<GraphData> {
    median_vs_request(run, |m| m.latency)
}

/// Median of `value` for successes and failures, keyed by the run-wide
/// request rate of the bucket each sample fell in.
fn median_vs_request<F>(run: &Run, value: F) -> Option<GraphData>
where
    F: Fn(&Measurement) -> Option<f64>,
{
    let mut hits: BTreeMap<i64, i64> = BTreeMap::new();
    for m in &run.measurements {
        *hits.entry(run.bucket(m.timestamp())).or_default() += 1;
    }

    // Keyed by the bucket's hit count; the rate is that count over a fixed
    // bucket width, so ordering by count orders by rate.
    let mut grid: Grid<ValuesAcc> = Grid::new();
    for m in &run.measurements {
        let Some(v) = value(m) else { continue };
        let count = hits.get(&run.bucket(m.timestamp())).copied().unwrap_or_default();
        let label = if m.success() { SUCCESSES } else { FAILURES };
        grid.cell(label, count).0.push(v);
    }

    let secs = run.granularity_secs();
    let series: Vec<Series> = grid.into_series(
        |count, acc| Some(Point(count as f64 / secs, median(&sorted(&acc.0)))),
        overall,
    );
    GraphData::collect(series, None)
}
