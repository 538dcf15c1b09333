use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// One `[x, y]` pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point(pub f64, pub f64);

impl Point {
    pub fn x(&self) -> f64 {
        self.0
    }

    pub fn y(&self) -> f64 {
        self.1
    }
}

impl Serialize for Point {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        [self.0, self.1].serialize(serializer)
    }
}

/// Ordered points for one label of one graph. Ascending x, one point per x.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    pub label: String,
    pub data: Vec<Point>,
    pub is_controller: bool,
    /// Run-level series not tied to a single request label.
    pub is_overall: bool,
}

impl Series {
    pub fn y_at(&self, x: f64) -> Option<f64> {
        self.data.iter().find(|p| p.0 == x).map(|p| p.1)
    }
}

/// The graph families a dashboard draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum GraphKind {
    ResponseTimesOverTime,
    LatenciesOverTime,
    ConnectTimeOverTime,
    HitsPerSecond,
    TransactionsPerSecond,
    TotalTps,
    CodesPerSecond,
    BytesThroughputOverTime,
    ActiveThreadsOverTime,
    ResponseTimePercentilesOverTime,
    ResponseTimePercentiles,
    ResponseTimeDistribution,
    SyntheticResponseTimeDistribution,
    TimeVsThreads,
    ResponseTimeVsRequest,
    LatencyVsRequest,
}

impl GraphKind {
    /// Graphs whose x axis is a bucket timestamp.
    pub fn is_time_based(&self) -> bool {
        matches!(
            self,
            GraphKind::ResponseTimesOverTime
                | GraphKind::LatenciesOverTime
                | GraphKind::ConnectTimeOverTime
                | GraphKind::HitsPerSecond
                | GraphKind::TransactionsPerSecond
                | GraphKind::TotalTps
                | GraphKind::CodesPerSecond
                | GraphKind::BytesThroughputOverTime
                | GraphKind::ActiveThreadsOverTime
                | GraphKind::ResponseTimePercentilesOverTime
        )
    }
}

/// One chart's series with the axis bounds a renderer scales against.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphData {
    pub series: Vec<Series>,
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    /// Bucket width for time-based graphs, `None` otherwise.
    pub granularity: Option<u64>,
}

impl GraphData {
    /// Drop empty series and compute bounds. `None` when nothing is left.
    pub fn collect(series: Vec<Series>, granularity: Option<u64>) -> Option<Self> {
        let series: Vec<Series> = series.into_iter().filter(|s| !s.data.is_empty()).collect();
        let mut points = series.iter().flat_map(|s| s.data.iter());
        let first = points.next()?;
        let (mut min_x, mut max_x, mut min_y, mut max_y) = (first.0, first.0, first.1, first.1);
        for p in points {
            min_x = min_x.min(p.0);
            max_x = max_x.max(p.0);
            min_y = min_y.min(p.1);
            max_y = max_y.max(p.1);
        }
        Some(Self { series, min_x, max_x, min_y, max_y, granularity })
    }

    pub fn series(&self, label: &str) -> Option<&Series> {
        self.series.iter().find(|s| s.label == label)
    }
}

/// Accumulator grid: series label → x key → accumulator.
///
/// Integer x keys keep ordering exact and deduplicate points; each graph maps
/// the key back to its real x value when the grid is finalized.
pub(crate) struct Grid<A> {
    cells: BTreeMap<String, BTreeMap<i64, A>>,
}

impl<A: Default> Grid<A> {
    pub(crate) fn new() -> Self {
        Self { cells: BTreeMap::new() }
    }

    pub(crate) fn cell(&mut self, label: &str, key: i64) -> &mut A {
        self.cells
            .entry(label.to_string())
            .or_default()
            .entry(key)
            .or_default()
    }

    pub(crate) fn into_rows(self) -> BTreeMap<String, BTreeMap<i64, A>> {
        self.cells
    }

    /// Finalize every cell with `point`; cells for which it yields `None` are
    /// left out.
    pub(crate) fn into_series<F, C>(self, mut point: F, classify: C) -> Vec<Series>
    where
        F: FnMut(i64, &A) -> Option<Point>,
        C: Fn(&str) -> (bool, bool),
    {
        self.cells
            .into_iter()
            .map(|(label, row)| {
                let data = row.iter().filter_map(|(k, acc)| point(*k, acc)).collect();
                let (is_controller, is_overall) = classify(&label);
                Series { label, data, is_controller, is_overall }
            })
            .collect()
    }
}

/// Running sum and count; mean at finalize.
#[derive(Debug, Default, Clone)]
pub(crate) struct MeanAcc {
    pub sum: f64,
    pub count: u64,
}

impl MeanAcc {
    pub(crate) fn add(&mut self, v: f64) {
        self.sum += v;
        self.count += 1;
    }

    pub(crate) fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// All values of a cell, for median and percentile finalizers.
#[derive(Debug, Default, Clone)]
pub(crate) struct ValuesAcc(pub Vec<f64>);
