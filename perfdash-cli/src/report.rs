use perfdash_aggregator::{AggregationResult, GraphKind};
use std::fmt::Write;

/// Human-readable run summary printed after aggregation.
pub fn render_summary(result: &AggregationResult, input_samples: usize, malformed_lines: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Performance Report Aggregation");
    let _ = writeln!(out, "==============================");
    let _ = writeln!(out, "Samples read:          {}", format_thousands(input_samples as u64));
    let _ = writeln!(out, "Unreadable lines:      {malformed_lines}");
    let _ = writeln!(out, "Dropped (malformed):   {}", result.dropped);
    for (reason, count) in &result.rejections {
        let _ = writeln!(out, "  {reason:?}: {count}");
    }
    let _ = writeln!(out, "Granularity:           {:.1} s", result.granularity as f64 / 1_000.0);
    let _ = writeln!(out);

    if result.is_empty() {
        let _ = writeln!(out, "Result: EMPTY (no labels left to render)");
        return out;
    }

    let _ = writeln!(out, "Labels:                {}", result.labels.len());
    let _ = writeln!(out, "Graphs:                {}", result.graphs.len());
    if let Some(stats) = &result.statistics {
        let t = &stats.total;
        let _ = writeln!(out, "Requests:              {}", format_thousands(t.samples));
        let _ = writeln!(out, "Throughput:            {:.1} tx/s", t.throughput);
        let _ = writeln!(out, "Median response:       {:.1} ms", t.median);
        let _ = writeln!(out, "P99 response:          {:.1} ms", t.p99);
        let _ = writeln!(out, "Error rate:            {:.3}%", t.error_pct);
    }
    if let Some(graph) = result.graph(GraphKind::ActiveThreadsOverTime) {
        let _ = writeln!(out, "Peak active threads:   {:.0}", graph.max_y);
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Result: OK");
    out
}

pub fn format_thousands(n: u64) -> String {
    if n >= 1_000_000 {
        format!("~{}M", n / 1_000_000)
    } else if n >= 1_000 {
        format!("~{}K", n / 1_000)
    } else {
        n.to_string()
    }
}
