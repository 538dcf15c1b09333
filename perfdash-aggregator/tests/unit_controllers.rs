use perfdash_aggregator::{AggregatorConfig, GraphKind, Point, RejectReason, SeriesAggregator, SeriesFilter};
use perfdash_common::{ControllerMap, Sample};

fn flow() -> ControllerMap {
    ControllerMap::new().with_controller("Flow", ["A", "B"])
}

fn aggregator(controllers: ControllerMap) -> SeriesAggregator {
    SeriesAggregator::new(AggregatorConfig { controllers, ..AggregatorConfig::with_granularity(1_000) })
        .unwrap()
}

fn samples() -> Vec<Sample> {
    vec![
        Sample::new(0, "A", 100.0, true),
        Sample::new(100, "A", 100.0, true),
        Sample::new(1_500, "A", 400.0, false),
        Sample::new(200, "B", 400.0, true),
        Sample::new(1_200, "B", 200.0, true),
        Sample::new(300, "C", 50.0, true),
    ]
}

#[test]
fn test_controller_is_emitted_and_flagged() {
    let result = aggregator(flow()).ingest(&samples());
    assert_eq!(result.labels, vec!["A", "B", "C", "Flow"]);

    let flow = result.series(GraphKind::HitsPerSecond, "Flow").unwrap();
    assert!(flow.is_controller);
    assert!(!result.series(GraphKind::HitsPerSecond, "A").unwrap().is_controller);
    assert!(result.statistics.as_ref().unwrap().row("Flow").unwrap().is_controller);
}

#[test]
fn test_controller_throughput_is_sum_of_members() {
    let result = aggregator(flow()).ingest(&samples());
    let hits = result.graph(GraphKind::HitsPerSecond).unwrap();
    let a = hits.series("A").unwrap();
    let b = hits.series("B").unwrap();
    let flow = hits.series("Flow").unwrap();

    assert_eq!(flow.data, vec![Point(0.0, 3.0), Point(1_000.0, 2.0)]);
    for p in &flow.data {
        let sum = a.y_at(p.0).unwrap_or(0.0) + b.y_at(p.0).unwrap_or(0.0);
        assert_eq!(p.1, sum);
    }
}

#[test]
fn test_controller_response_time_derives_from_members() {
    let result = aggregator(flow()).ingest(&samples());
    let flow = result.series(GraphKind::ResponseTimesOverTime, "Flow").unwrap();
    // Bucket 0: A 100, A 100, B 400 → 200. Bucket 1000: A 400, B 200 → 300.
    assert_eq!(flow.data, vec![Point(0.0, 200.0), Point(1_000.0, 300.0)]);

    let row = result.statistics.as_ref().unwrap().row("Flow").unwrap().clone();
    assert_eq!(row.samples, 5);
    assert_eq!(row.errors, 1);
    assert_eq!(row.min, 100.0);
    assert_eq!(row.max, 400.0);
}

#[test]
fn test_controller_transactions_split_by_outcome() {
    let result = aggregator(flow()).ingest(&samples());
    let tps = result.graph(GraphKind::TransactionsPerSecond).unwrap();
    let failure = tps.series("Flow-failure").unwrap();
    assert!(failure.is_controller);
    assert_eq!(failure.data, vec![Point(1_000.0, 1.0)]);
    assert!(!tps.series("A-failure").unwrap().is_controller);
}

#[test]
fn test_raw_controller_samples_are_skipped() {
    let mut input = samples();
    input.push(Sample::new(0, "Flow", 9_999.0, true));
    let result = aggregator(flow()).ingest(&input);

    assert_eq!(result.dropped, 1);
    assert_eq!(result.rejections.get(&RejectReason::ControllerSample), Some(&1));
    assert_eq!(result.statistics.as_ref().unwrap().row("Flow").unwrap().max, 400.0);
}

#[test]
fn test_run_level_graphs_count_each_sample_once() {
    let result = aggregator(flow()).ingest(&samples());
    let total_tps = result.graph(GraphKind::TotalTps).unwrap();
    let success = total_tps.series("Transaction-success").unwrap();
    assert!(success.is_overall);
    // Bucket 0: four successes (A, A, B, C); bucket 1000: B.
    assert_eq!(success.data, vec![Point(0.0, 4.0), Point(1_000.0, 1.0)]);
    assert_eq!(result.statistics.as_ref().unwrap().total.samples, 6);
}

#[test]
fn test_controller_without_member_samples_is_not_emitted() {
    let controllers = flow().with_controller("Idle", ["Z"]);
    let result = aggregator(controllers).ingest(&samples());
    assert!(!result.labels.contains(&"Idle".to_string()));
}

#[test]
fn test_filter_applies_to_controller_labels() {
    let config = AggregatorConfig {
        controllers: flow(),
        filter: SeriesFilter::predicate(|l| l != "Flow"),
        ..AggregatorConfig::with_granularity(1_000)
    };
    let result = SeriesAggregator::new(config).unwrap().ingest(&samples());
    assert_eq!(result.labels, vec!["A", "B", "C"]);
    assert!(result.series(GraphKind::HitsPerSecond, "Flow").is_none());
}

#[test]
fn test_controller_time_vs_threads_rollup() {
    let input = vec![
        Sample::new(0, "A", 100.0, true).with_threads(2),
        Sample::new(0, "B", 300.0, true).with_threads(4),
    ];
    let result = aggregator(flow()).ingest(&input);
    let aggregated = result.series(GraphKind::TimeVsThreads, "Flow-Aggregated").unwrap();
    assert!(aggregated.is_controller);
    assert_eq!(aggregated.data, vec![Point(3.0, 200.0)]);
}

#[test]
fn test_filter_keeping_only_the_controller() {
    let config = AggregatorConfig {
        controllers: flow(),
        filter: SeriesFilter::predicate(|l| l == "Flow"),
        ..AggregatorConfig::with_granularity(1_000)
    };
    let result = SeriesAggregator::new(config).unwrap().ingest(&samples());

    assert!(!result.is_empty());
    assert_eq!(result.labels, vec!["Flow"]);
    assert_eq!(result.dropped, 0);

    // Same rows as without the filter, built from the hidden members.
    let unfiltered = aggregator(flow()).ingest(&samples());
    for kind in [GraphKind::HitsPerSecond, GraphKind::ResponseTimesOverTime] {
        assert_eq!(result.series(kind, "Flow"), unfiltered.series(kind, "Flow"));
        assert!(result.series(kind, "A").is_none());
    }
    assert_eq!(result.bucket_percentiles.keys().collect::<Vec<_>>(), vec!["Flow"]);

    let stats = result.statistics.as_ref().unwrap();
    assert_eq!(stats.rows.len(), 1);
    assert_eq!(stats.row("Flow"), unfiltered.statistics.as_ref().unwrap().row("Flow"));
    // Total covers the five member samples; C is neither shown nor a member.
    assert_eq!(stats.total.samples, 5);

    // Run-level graphs count only samples whose own label is shown.
    assert!(result.graph(GraphKind::TotalTps).is_none());
    assert!(result.graph(GraphKind::SyntheticResponseTimeDistribution).is_none());
}

#[test]
fn test_hidden_raw_controller_sample_is_filtered_not_dropped() {
    let mut input = samples();
    input.push(Sample::new(0, "Flow", 9_999.0, true));
    let config = AggregatorConfig {
        controllers: flow(),
        filter: SeriesFilter::predicate(|l| l != "Flow"),
        ..AggregatorConfig::with_granularity(1_000)
    };
    let result = SeriesAggregator::new(config).unwrap().ingest(&input);

    assert_eq!(result.dropped, 0);
    assert!(result.rejections.is_empty());
    assert_eq!(result.labels, vec!["A", "B", "C"]);
}
