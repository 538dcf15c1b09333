//! Turns a load-test sample log into the series a performance dashboard draws.
//!
//! [`SeriesAggregator::ingest`] is a pure batch fold: validate each sample,
//! bucket by time, then finalize every graph family. Controller rows draw on
//! all valid member samples; the label filter decides which rows are shown.
//! The same input and configuration always yield the same result.

use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

use perfdash_common::{PerfDashError, Result, Sample};

pub mod config;
pub mod distribution;
pub mod over_time;
pub mod percentile;
mod run;
pub mod series;
pub mod statistics;
pub mod validate;
pub mod versus;

pub use config::{AggregatorConfig, SeriesFilter};
pub use over_time::BucketPercentiles;
pub use percentile::PercentileSet;
pub use run::bucket_of;
pub use series::{GraphData, GraphKind, Point, Series};
pub use statistics::{Statistics, StatisticsRow};
pub use validate::RejectReason;

use run::Run;

/// Everything a renderer needs from one aggregation pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationResult {
    /// `true` when no label survived validation and filtering; callers should
    /// stop before rendering.
    pub empty: bool,
    pub granularity: u64,
    /// Samples skipped as malformed.
    pub dropped: usize,
    pub rejections: BTreeMap<RejectReason, usize>,
    /// Emitted labels, request labels and controllers, sorted.
    pub labels: Vec<String>,
    pub graphs: BTreeMap<GraphKind, GraphData>,
    /// Per-label percentile set of every occupied bucket.
    pub bucket_percentiles: BTreeMap<String, Vec<BucketPercentiles>>,
    pub statistics: Option<Statistics>,
}

impl AggregationResult {
    fn empty(granularity: u64, rejections: BTreeMap<RejectReason, usize>) -> Self {
        Self {
            empty: true,
            granularity,
            dropped: rejections.values().sum(),
            rejections,
            labels: Vec::new(),
            graphs: BTreeMap::new(),
            bucket_percentiles: BTreeMap::new(),
            statistics: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn graph(&self, kind: GraphKind) -> Option<&GraphData> {
        self.graphs.get(&kind)
    }

    pub fn series(&self, kind: GraphKind, label: &str) -> Option<&Series> {
        self.graph(kind)?.series(label)
    }

    /// Percentile set of `label` in the bucket starting at `x`.
    pub fn percentiles_at(&self, label: &str, x: i64) -> Option<&PercentileSet> {
        self.bucket_percentiles
            .get(label)?
            .iter()
            .find(|b| b.x == x)
            .map(|b| &b.percentiles)
    }
}

type GraphBuilder = fn(&Run) -> Option<GraphData>;

const GRAPHS: [(GraphKind, GraphBuilder); 16] = [
    (GraphKind::ResponseTimesOverTime, over_time::response_times),
    (GraphKind::LatenciesOverTime, over_time::latencies),
    (GraphKind::ConnectTimeOverTime, over_time::connect_times),
    (GraphKind::HitsPerSecond, over_time::hits_per_second),
    (GraphKind::TransactionsPerSecond, over_time::transactions_per_second),
    (GraphKind::TotalTps, over_time::total_tps),
    (GraphKind::CodesPerSecond, over_time::codes_per_second),
    (GraphKind::BytesThroughputOverTime, over_time::bytes_throughput),
    (GraphKind::ActiveThreadsOverTime, over_time::active_threads),
    (GraphKind::ResponseTimePercentilesOverTime, over_time::percentiles_over_time),
    (GraphKind::ResponseTimePercentiles, distribution::response_time_percentiles),
    (GraphKind::ResponseTimeDistribution, distribution::response_time_distribution),
    (GraphKind::SyntheticResponseTimeDistribution, distribution::synthetic_distribution),
    (GraphKind::TimeVsThreads, versus::time_vs_threads),
    (GraphKind::ResponseTimeVsRequest, versus::response_time_vs_request),
    (GraphKind::LatencyVsRequest, versus::latency_vs_request),
];

/// Batch aggregator over a fully collected sample log.
#[derive(Debug, Clone)]
pub struct SeriesAggregator {
    config: AggregatorConfig,
}

impl SeriesAggregator {
    /// Validate `config` and build an aggregator around it.
    pub fn new(config: AggregatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Aggregate `samples`. Malformed samples are skipped and counted, never
    /// fatal; an input with nothing left to draw yields an empty result.
    pub fn ingest(&self, samples: &[Sample]) -> AggregationResult {
        let filter = &self.config.filter;
        let mut rejections: BTreeMap<RejectReason, usize> = BTreeMap::new();
        let mut filtered_out = 0usize;
        let mut shown = Vec::with_capacity(samples.len());
        let mut hidden = Vec::new();

        for (idx, sample) in samples.iter().enumerate() {
            match validate::validate(sample, &self.config.controllers) {
                Ok(m) if filter.matches(m.label) => shown.push(m),
                Ok(m) => {
                    filtered_out += 1;
                    hidden.push(m);
                }
                // A raw controller record the filter hides is filtered, not malformed.
                Err(RejectReason::ControllerSample)
                    if sample.label.as_deref().is_some_and(|l| !filter.matches(l)) =>
                {
                    filtered_out += 1;
                }
                Err(reason) => {
                    debug!(index = idx, ?reason, label = ?sample.label, "skipping sample");
                    *rejections.entry(reason).or_default() += 1;
                }
            }
        }

        let granularity = self.config.granularity_ms;
        let run = Run::new(&self.config, shown, hidden);
        let labels: Vec<String> = run.labels().into_iter().map(str::to_string).collect();
        if labels.is_empty() {
            info!(total = samples.len(), filtered_out, "no labels left to aggregate");
            return AggregationResult::empty(granularity, rejections);
        }

        let graphs: BTreeMap<GraphKind, GraphData> = GRAPHS
            .iter()
            .filter_map(|(kind, build)| build(&run).map(|g| (*kind, g)))
            .collect();
        let result = AggregationResult {
            empty: false,
            granularity,
            dropped: rejections.values().sum(),
            rejections,
            labels,
            graphs,
            bucket_percentiles: over_time::label_percentiles(&run),
            statistics: statistics::build(&run),
        };
        info!(
            total = samples.len(),
            shown = run.measurements.len(),
            dropped = result.dropped,
            filtered_out,
            labels = result.labels.len(),
            graphs = result.graphs.len(),
            "aggregation finished"
        );
        result
    }
}

/// Aggregate `samples` with default settings and the given bucket width.
pub fn ingest(samples: &[Sample], granularity: Duration) -> Result<AggregationResult> {
    let granularity_ms = u64::try_from(granularity.as_millis())
        .map_err(|_| PerfDashError::InvalidConfig("granularity out of range".to_string()))?;
    let aggregator = SeriesAggregator::new(AggregatorConfig::with_granularity(granularity_ms))?;
    Ok(aggregator.ingest(samples))
}
