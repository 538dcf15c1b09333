use serde::Serialize;

/// Sort `values` ascending. The sort is stable, so equal values keep their
/// insertion order.
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

/// Nearest-rank percentile over an already sorted slice: the element at index
/// `ceil(p/100 * n) - 1`, clamped to `[0, n-1]`. Returns 0 for an empty slice.
pub fn nearest_rank(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let n = sorted.len();
    let rank = (p / 100.0 * n as f64).ceil() as i64 - 1;
    let idx = rank.clamp(0, n as i64 - 1) as usize;
    sorted[idx]
}

/// Median of an already sorted slice; the mean of the two middle values when
/// `n` is even. Returns 0 for an empty slice.
pub fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    match n {
        0 => 0.0,
        _ if n % 2 == 1 => sorted[n / 2],
        _ => (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0,
    }
}

/// `{min, median, p90, p95, p99, max}` over one bucket (or one run).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PercentileSet {
    pub min: f64,
    pub median: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
    pub max: f64,
}

impl PercentileSet {
    /// `None` for an empty slice; there is no meaningful percentile of nothing.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let sorted = sorted(values);
        Some(Self::from_sorted(&sorted))
    }

    pub(crate) fn from_sorted(sorted: &[f64]) -> Self {
        Self {
            min: sorted[0],
            median: median(sorted),
            p90: nearest_rank(sorted, 90.0),
            p95: nearest_rank(sorted, 95.0),
            p99: nearest_rank(sorted, 99.0),
            max: sorted[sorted.len() - 1],
        }
    }
}
