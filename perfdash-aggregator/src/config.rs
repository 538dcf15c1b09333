use perfdash_common::{ControllerMap, PerfDashError, Result};
use regex::Regex;
use std::fmt;
use std::sync::Arc;

/// Bucket width shared by every time-series graph (ms).
pub const DEFAULT_GRANULARITY_MS: u64 = 60_000;

/// Bin width of the response time distribution histogram (ms).
pub const DEFAULT_BIN_WIDTH_MS: u64 = 100;

/// Upper bound of the "satisfied" band in the synthetic distribution (ms).
pub const DEFAULT_SATISFIED_MS: u64 = 500;

/// Upper bound of the "tolerated" band in the synthetic distribution (ms).
pub const DEFAULT_TOLERATED_MS: u64 = 1_500;

/// Decides which labels take part in aggregation.
#[derive(Clone, Default)]
pub enum SeriesFilter {
    #[default]
    All,
    Regex(Regex),
    Substring(String),
    Predicate(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl SeriesFilter {
    /// Compile `pattern`; an invalid pattern is a setup error, not an empty result.
    pub fn regex(pattern: &str) -> Result<Self> {
        Regex::new(pattern)
            .map(SeriesFilter::Regex)
            .map_err(|e| PerfDashError::InvalidFilter(e.to_string()))
    }

    pub fn substring(needle: &str) -> Self {
        SeriesFilter::Substring(needle.to_string())
    }

    pub fn predicate(f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        SeriesFilter::Predicate(Arc::new(f))
    }

    pub fn matches(&self, label: &str) -> bool {
        match self {
            SeriesFilter::All => true,
            SeriesFilter::Regex(re) => re.is_match(label),
            SeriesFilter::Substring(needle) => label.contains(needle.as_str()),
            SeriesFilter::Predicate(f) => f(label),
        }
    }
}

impl fmt::Debug for SeriesFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesFilter::All => write!(f, "All"),
            SeriesFilter::Regex(re) => write!(f, "Regex({:?})", re.as_str()),
            SeriesFilter::Substring(s) => write!(f, "Substring({s:?})"),
            SeriesFilter::Predicate(_) => write!(f, "Predicate(..)"),
        }
    }
}

/// Aggregator configuration
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    pub granularity_ms: u64,
    pub bin_width_ms: u64,
    pub satisfied_ms: u64,
    pub tolerated_ms: u64,
    pub filter: SeriesFilter,
    pub controllers: ControllerMap,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            granularity_ms: DEFAULT_GRANULARITY_MS,
            bin_width_ms: DEFAULT_BIN_WIDTH_MS,
            satisfied_ms: DEFAULT_SATISFIED_MS,
            tolerated_ms: DEFAULT_TOLERATED_MS,
            filter: SeriesFilter::All,
            controllers: ControllerMap::default(),
        }
    }
}

impl AggregatorConfig {
    pub fn with_granularity(granularity_ms: u64) -> Self {
        Self { granularity_ms, ..Self::default() }
    }

    pub fn validate(&self) -> Result<()> {
        // Bucket keys are signed millisecond timestamps.
        let max_width = i64::MAX as u64;
        if self.granularity_ms == 0 || self.granularity_ms > max_width {
            return Err(PerfDashError::InvalidGranularity(self.granularity_ms));
        }
        if self.bin_width_ms == 0 || self.bin_width_ms > max_width {
            return Err(PerfDashError::InvalidConfig(format!(
                "distribution bin width must be in 1..={max_width}ms, got {}",
                self.bin_width_ms
            )));
        }
        if self.satisfied_ms > self.tolerated_ms {
            return Err(PerfDashError::InvalidConfig(format!(
                "satisfied threshold {}ms exceeds tolerated threshold {}ms",
                self.satisfied_ms, self.tolerated_ms
            )));
        }
        self.controllers.validate()
    }

    /// Bucket width in seconds, the divisor of every per-second rate.
    pub(crate) fn granularity_secs(&self) -> f64 {
        self.granularity_ms as f64 / 1_000.0
    }
}
