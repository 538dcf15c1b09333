use std::path::{Path, PathBuf};

use perfdash_aggregator::{AggregationResult, AggregatorConfig, SeriesAggregator, SeriesFilter};
use perfdash_common::{ControllerMap, PerfDashError, Result};
use tracing::info;

pub mod input;
pub mod logging;
pub mod report;
pub mod synthetic;

use input::{InputFormat, SampleLog};

/// Everything `perfdash aggregate` needs, resolved from the command line.
#[derive(Debug, Clone)]
pub struct AggregateOptions {
    pub input: PathBuf,
    pub format: Option<InputFormat>,
    pub granularity_ms: u64,
    pub bin_width_ms: u64,
    pub satisfied_ms: u64,
    pub tolerated_ms: u64,
    pub filter: Option<String>,
    /// Treat `filter` as a plain substring instead of a regex.
    pub substring: bool,
    pub controllers: Option<PathBuf>,
}

/// A finished aggregation along with what the reader saw.
#[derive(Debug)]
pub struct Outcome {
    pub result: AggregationResult,
    pub samples_read: usize,
    pub malformed_lines: usize,
}

/// Read a controller membership file: a JSON object mapping each controller
/// label to its member request labels.
pub async fn load_controllers(path: &Path) -> Result<ControllerMap> {
    let text = tokio::fs::read_to_string(path).await?;
    let map: ControllerMap = serde_json::from_str(&text)
        .map_err(|e| PerfDashError::InvalidControllerMap(format!("{}: {e}", path.display())))?;
    map.validate()?;
    Ok(map)
}

pub fn build_filter(pattern: Option<&str>, substring: bool) -> Result<SeriesFilter> {
    match pattern {
        None => Ok(SeriesFilter::All),
        Some(p) if substring => Ok(SeriesFilter::substring(p)),
        Some(p) => SeriesFilter::regex(p),
    }
}

/// Read the sample log, aggregate it off the async runtime, and return the result.
pub async fn run_aggregate(opts: &AggregateOptions) -> Result<Outcome> {
    let controllers = match &opts.controllers {
        Some(path) => load_controllers(path).await?,
        None => ControllerMap::default(),
    };
    let config = AggregatorConfig {
        granularity_ms: opts.granularity_ms,
        bin_width_ms: opts.bin_width_ms,
        satisfied_ms: opts.satisfied_ms,
        tolerated_ms: opts.tolerated_ms,
        filter: build_filter(opts.filter.as_deref(), opts.substring)?,
        controllers,
    };
    let aggregator = SeriesAggregator::new(config)?;

    let format = opts.format.unwrap_or_else(|| InputFormat::from_path(&opts.input));
    let text = tokio::fs::read_to_string(&opts.input).await?;
    info!(path = %opts.input.display(), format = format.as_name(), "reading sample log");

    let SampleLog { samples, malformed } = input::parse(&text, format)?;
    let samples_read = samples.len();
    let result = tokio::task::spawn_blocking(move || aggregator.ingest(&samples))
        .await
        .map_err(|e| PerfDashError::Io(format!("aggregation task failed: {e}")))?;

    Ok(Outcome { result, samples_read, malformed_lines: malformed })
}
