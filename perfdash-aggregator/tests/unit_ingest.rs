use std::time::Duration;

use perfdash_aggregator::{
    bucket_of, ingest, AggregatorConfig, GraphKind, Point, RejectReason, SeriesAggregator,
};
use perfdash_common::{PerfDashError, Sample};

fn ok(ts: i64, label: &str, elapsed: f64) -> Sample {
    Sample::new(ts, label, elapsed, true)
}

fn aggregator(granularity_ms: u64) -> SeriesAggregator {
    SeriesAggregator::new(AggregatorConfig::with_granularity(granularity_ms)).unwrap()
}

// --- Basic ---

#[test]
fn test_two_samples_one_bucket() {
    let samples = vec![ok(0, "A", 100.0), ok(0, "A", 300.0)];
    let result = ingest(&samples, Duration::from_millis(60_000)).unwrap();

    assert!(!result.is_empty());
    assert_eq!(result.labels, vec!["A".to_string()]);

    let set = result.percentiles_at("A", 0).unwrap();
    assert_eq!(set.min, 100.0);
    assert_eq!(set.median, 200.0);
    assert_eq!(set.max, 300.0);

    let rt = result.series(GraphKind::ResponseTimesOverTime, "A").unwrap();
    assert_eq!(rt.data, vec![Point(0.0, 200.0)]);
    assert!(!rt.is_controller);
}

#[test]
fn test_empty_input_is_marked_empty() {
    let result = aggregator(60_000).ingest(&[]);
    assert!(result.is_empty());
    assert!(result.labels.is_empty());
    assert!(result.graphs.is_empty());
    assert!(result.bucket_percentiles.is_empty());
    assert!(result.statistics.is_none());
    assert_eq!(result.dropped, 0);
}

#[test]
fn test_zero_granularity_rejected() {
    let err = ingest(&[], Duration::ZERO).unwrap_err();
    assert_eq!(err, PerfDashError::InvalidGranularity(0));

    let err = SeriesAggregator::new(AggregatorConfig::with_granularity(0)).unwrap_err();
    assert_eq!(err, PerfDashError::InvalidGranularity(0));
}

#[test]
fn test_granularity_beyond_signed_range_rejected() {
    let err = SeriesAggregator::new(AggregatorConfig::with_granularity(u64::MAX)).unwrap_err();
    assert_eq!(err, PerfDashError::InvalidGranularity(u64::MAX));

    let err = ingest(&[], Duration::from_millis(u64::MAX)).unwrap_err();
    assert_eq!(err, PerfDashError::InvalidGranularity(u64::MAX));

    let config = AggregatorConfig { bin_width_ms: i64::MAX as u64 + 1, ..Default::default() };
    assert!(matches!(SeriesAggregator::new(config), Err(PerfDashError::InvalidConfig(_))));
}

#[test]
fn test_widest_granularity_is_one_bucket() {
    let samples = vec![ok(5, "A", 10.0), ok(7, "A", 10.0)];
    let result = aggregator(i64::MAX as u64).ingest(&samples);
    let hits = result.series(GraphKind::HitsPerSecond, "A").unwrap();
    assert_eq!(hits.data.len(), 1);
    assert_eq!(hits.data[0].0, 0.0);
}

#[test]
fn test_invalid_thresholds_rejected() {
    let config = AggregatorConfig { satisfied_ms: 2_000, tolerated_ms: 1_000, ..Default::default() };
    assert!(matches!(SeriesAggregator::new(config), Err(PerfDashError::InvalidConfig(_))));

    let config = AggregatorConfig { bin_width_ms: 0, ..Default::default() };
    assert!(matches!(SeriesAggregator::new(config), Err(PerfDashError::InvalidConfig(_))));
}

// --- Fail-soft validation ---

#[test]
fn test_negative_elapsed_is_dropped() {
    let samples = vec![ok(0, "A", -5.0), ok(0, "A", 120.0)];
    let result = aggregator(60_000).ingest(&samples);

    assert_eq!(result.dropped, 1);
    assert_eq!(result.rejections.get(&RejectReason::InvalidElapsed), Some(&1));
    assert_eq!(
        result.series(GraphKind::ResponseTimesOverTime, "A").unwrap().data,
        vec![Point(0.0, 120.0)]
    );
    assert_eq!(result.statistics.as_ref().unwrap().total.samples, 1);
}

#[test]
fn test_every_malformed_kind_is_counted() {
    let mut no_label = ok(0, "x", 10.0);
    no_label.label = None;
    let samples = vec![
        no_label,
        ok(0, "", 10.0),
        ok(0, "A", f64::NAN),
        ok(0, "A", f64::INFINITY),
        ok(0, &"x".repeat(2_000), 10.0),
        ok(0, "A", 10.0),
    ];
    let result = aggregator(60_000).ingest(&samples);

    assert_eq!(result.dropped, 5);
    assert_eq!(result.rejections.get(&RejectReason::MissingLabel), Some(&2));
    assert_eq!(result.rejections.get(&RejectReason::InvalidElapsed), Some(&2));
    assert_eq!(result.rejections.get(&RejectReason::LabelTooLarge), Some(&1));
    assert_eq!(result.labels, vec!["A".to_string()]);
}

#[test]
fn test_only_malformed_samples_yields_empty() {
    let result = aggregator(60_000).ingest(&[ok(0, "A", -1.0)]);
    assert!(result.is_empty());
    assert_eq!(result.dropped, 1);
}

#[test]
fn test_corrupt_latency_is_cleared_not_dropped() {
    let samples = vec![ok(0, "A", 100.0).with_latency(-3.0), ok(0, "A", 200.0).with_latency(40.0)];
    let result = aggregator(60_000).ingest(&samples);

    assert_eq!(result.dropped, 0);
    assert_eq!(
        result.series(GraphKind::LatenciesOverTime, "A").unwrap().data,
        vec![Point(0.0, 40.0)]
    );
    assert_eq!(
        result.series(GraphKind::ResponseTimesOverTime, "A").unwrap().data,
        vec![Point(0.0, 150.0)]
    );
}

#[test]
fn test_missing_optional_fields_contribute_nothing() {
    // No latency, connect, bytes or thread counts anywhere.
    let result = aggregator(60_000).ingest(&[ok(0, "A", 100.0)]);

    assert!(result.graph(GraphKind::LatenciesOverTime).is_none());
    assert!(result.graph(GraphKind::ConnectTimeOverTime).is_none());
    assert!(result.graph(GraphKind::ActiveThreadsOverTime).is_none());
    assert!(result.graph(GraphKind::TimeVsThreads).is_none());
    assert!(result.graph(GraphKind::CodesPerSecond).is_none());

    // Bytes default to zero and the sample still counts as a hit.
    let bytes = result.graph(GraphKind::BytesThroughputOverTime).unwrap();
    assert_eq!(bytes.max_y, 0.0);
    assert_eq!(
        result.series(GraphKind::HitsPerSecond, "A").unwrap().data,
        vec![Point(0.0, 1.0 / 60.0)]
    );
}

// --- Bucketing ---

#[test]
fn test_bucket_of_floors_toward_negative_infinity() {
    assert_eq!(bucket_of(0, 1_000), 0);
    assert_eq!(bucket_of(999, 1_000), 0);
    assert_eq!(bucket_of(1_000, 1_000), 1_000);
    assert_eq!(bucket_of(-1, 1_000), -1_000);
    assert_eq!(bucket_of(1_700_000_012_345, 60_000), 1_699_999_980_000);
}

#[test]
fn test_bucket_of_saturates_at_the_edges() {
    // floor((i64::MIN + 1) / 1000) * 1000 lies below i64::MIN.
    assert_eq!(bucket_of(i64::MIN + 1, 1_000), i64::MIN);
    assert_eq!(bucket_of(i64::MIN, 1), i64::MIN);
    assert_eq!(bucket_of(i64::MAX, 1_000), i64::MAX - 807);
    // Widths past i64::MAX are clamped rather than wrapping negative.
    assert_eq!(bucket_of(5, u64::MAX), 0);
    assert_eq!(bucket_of(7, u64::MAX), 0);
}

#[test]
fn test_unsorted_samples_with_gaps() {
    let samples = vec![
        ok(125_000, "A", 10.0),
        ok(0, "A", 10.0),
        ok(59_999, "A", 10.0),
        ok(60_000, "A", 10.0),
    ];
    let result = aggregator(60_000).ingest(&samples);
    let hits = result.series(GraphKind::HitsPerSecond, "A").unwrap();
    assert_eq!(
        hits.data,
        vec![
            Point(0.0, 2.0 / 60.0),
            Point(60_000.0, 1.0 / 60.0),
            Point(120_000.0, 1.0 / 60.0),
        ]
    );
}

#[test]
fn test_points_never_exceed_occupied_buckets() {
    let samples: Vec<Sample> = (0..500)
        .map(|i| ok((i * 7_919) % 600_000, if i % 3 == 0 { "A" } else { "B" }, f64::from(i as u32)))
        .collect();
    let result = aggregator(30_000).ingest(&samples);

    for label in ["A", "B"] {
        let occupied: std::collections::BTreeSet<i64> = samples
            .iter()
            .filter(|s| s.label.as_deref() == Some(label))
            .map(|s| bucket_of(s.timestamp, 30_000))
            .collect();
        for kind in [GraphKind::HitsPerSecond, GraphKind::ResponseTimesOverTime] {
            let series = result.series(kind, label).unwrap();
            assert_eq!(series.data.len(), occupied.len());
            assert!(series.data.windows(2).all(|w| w[0].0 < w[1].0), "x must be strictly ascending");
        }
    }
}

// --- Purity ---

#[test]
fn test_ingest_is_idempotent() {
    let samples: Vec<Sample> = (0..200)
        .map(|i| {
            ok(i * 1_337, ["A", "B", "C"][(i % 3) as usize], f64::from((i * 31 % 977) as u32))
                .with_latency(5.0)
                .with_threads((i % 10) as u32 + 1)
                .with_response_code(if i % 17 == 0 { "500" } else { "200" })
        })
        .collect();
    let agg = aggregator(10_000);
    let first = agg.ingest(&samples);
    let second = agg.ingest(&samples);
    assert_eq!(first, second);
    assert_eq!(serde_json::to_string(&first).unwrap(), serde_json::to_string(&second).unwrap());
}

// --- Output contract ---

#[test]
fn test_json_contract_fields() {
    let samples = vec![ok(0, "A", 100.0).with_threads(2), ok(1_000, "A", 300.0).with_threads(2)];
    let result = aggregator(1_000).ingest(&samples);
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["empty"], false);
    assert_eq!(json["granularity"], 1_000);
    let hits = &json["graphs"]["hitsPerSecond"];
    assert_eq!(hits["granularity"], 1_000);
    assert_eq!(hits["minX"], 0.0);
    assert_eq!(hits["maxX"], 1_000.0);
    assert_eq!(hits["minY"], 1.0);
    assert_eq!(hits["maxY"], 1.0);
    let series = &hits["series"][0];
    assert_eq!(series["label"], "A");
    assert_eq!(series["isController"], false);
    assert_eq!(series["data"], serde_json::json!([[0.0, 1.0], [1000.0, 1.0]]));

    // Non-time axes carry no granularity.
    assert!(json["graphs"]["timeVsThreads"]["granularity"].is_null());
}
