use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use perfdash_common::{PerfDashError, Result, Sample};
use tracing::{debug, warn};

/// Sample log encodings the CLI understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// JMeter-style CSV with a header row.
    Csv,
    /// One JSON `Sample` object per line.
    JsonLines,
}

impl InputFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "csv" | "jtl" => Some(InputFormat::Csv),
            "jsonl" | "json" => Some(InputFormat::JsonLines),
            _ => None,
        }
    }

    pub fn as_name(&self) -> &'static str {
        match self {
            InputFormat::Csv => "csv",
            InputFormat::JsonLines => "jsonl",
        }
    }

    /// Guess from the file extension; anything unknown is read as CSV.
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|e| Self::from_name(&e.to_ascii_lowercase()))
            .unwrap_or(InputFormat::Csv)
    }
}

/// Samples read from a log plus the number of lines that could not be read at all.
#[derive(Debug, Default)]
pub struct SampleLog {
    pub samples: Vec<Sample>,
    pub malformed: usize,
}

pub fn parse(text: &str, format: InputFormat) -> Result<SampleLog> {
    match format {
        InputFormat::Csv => read_csv(text.as_bytes()),
        InputFormat::JsonLines => Ok(read_json_lines(text)),
    }
}

/// Column positions resolved from the header row.
struct Columns {
    timestamp: usize,
    elapsed: usize,
    label: usize,
    optional: HashMap<&'static str, usize>,
}

const OPTIONAL_COLUMNS: [&str; 9] = [
    "responseCode",
    "success",
    "bytes",
    "sentBytes",
    "grpThreads",
    "allThreads",
    "Latency",
    "Connect",
    "threadName",
];

impl Columns {
    fn resolve(headers: &csv::StringRecord) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name));
        let required = |name: &str| {
            find(name).ok_or_else(|| PerfDashError::Parse {
                line: 1,
                message: format!("missing required column {name:?}"),
            })
        };
        Ok(Self {
            timestamp: required("timeStamp")?,
            elapsed: required("elapsed")?,
            label: required("label")?,
            optional: OPTIONAL_COLUMNS
                .iter()
                .filter_map(|name| find(name).map(|idx| (*name, idx)))
                .collect(),
        })
    }

    fn get<'r>(&self, record: &'r csv::StringRecord, name: &str) -> Option<&'r str> {
        let idx = *self.optional.get(name)?;
        record.get(idx).map(str::trim).filter(|v| !v.is_empty())
    }
}

/// Read a JMeter-style CSV log. Columns may appear in any order and unknown
/// columns are ignored. A row whose timestamp cannot be read is counted as
/// malformed; an unreadable elapsed time is kept as NaN so the aggregator
/// rejects and counts it.
pub fn read_csv<R: Read>(reader: R) -> Result<SampleLog> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).trim(csv::Trim::None).from_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| PerfDashError::Parse { line: 1, message: e.to_string() })?
        .clone();
    let columns = Columns::resolve(&headers)?;

    let mut log = SampleLog::default();
    for (idx, row) in rdr.records().enumerate() {
        let line = idx + 2;
        let record = match row {
            Ok(r) => r,
            Err(e) => {
                warn!(line, error = %e, "unreadable CSV row");
                log.malformed += 1;
                continue;
            }
        };
        match sample_from_record(&record, &columns) {
            Some(sample) => log.samples.push(sample),
            None => {
                debug!(line, "row without a usable timestamp");
                log.malformed += 1;
            }
        }
    }
    Ok(log)
}

fn sample_from_record(record: &csv::StringRecord, columns: &Columns) -> Option<Sample> {
    let field = |idx: usize| record.get(idx).map(str::trim).filter(|v| !v.is_empty());
    let timestamp: i64 = field(columns.timestamp)?.parse().ok()?;
    let elapsed = field(columns.elapsed)
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(f64::NAN);
    let opt = |name: &str| columns.get(record, name);
    let number = |name: &str| opt(name).and_then(|v| v.parse::<u64>().ok());
    let millis = |name: &str| opt(name).and_then(|v| v.parse::<f64>().ok());
    let threads = |name: &str| opt(name).and_then(|v| v.parse::<u32>().ok());

    Some(Sample {
        timestamp,
        label: field(columns.label).map(str::to_string),
        elapsed,
        latency: millis("Latency"),
        connect: millis("Connect"),
        success: opt("success").map_or(true, |v| v.eq_ignore_ascii_case("true")),
        bytes_sent: number("sentBytes"),
        bytes_received: number("bytes"),
        active_threads: threads("allThreads").or_else(|| threads("grpThreads")),
        response_code: opt("responseCode").map(str::to_string),
        thread_group: opt("threadName").map(thread_group_of),
    })
}

/// `"Checkout Users 1-17"` → `"Checkout Users"`: drop the trailing
/// `<group>-<thread>` counter the load generator appends to each thread name.
pub fn thread_group_of(thread_name: &str) -> String {
    let is_counter = |s: &str| {
        s.split_once('-').is_some_and(|(a, b)| {
            !a.is_empty()
                && !b.is_empty()
                && a.bytes().all(|c| c.is_ascii_digit())
                && b.bytes().all(|c| c.is_ascii_digit())
        })
    };
    match thread_name.trim().rsplit_once(' ') {
        Some((group, counter)) if is_counter(counter) => group.trim_end().to_string(),
        _ => thread_name.trim().to_string(),
    }
}

/// Read one JSON sample per line. Blank lines are skipped; lines that are not
/// valid samples are counted and logged, never fatal.
pub fn read_json_lines(text: &str) -> SampleLog {
    let mut log = SampleLog::default();
    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Sample>(line) {
            Ok(sample) => log.samples.push(sample),
            Err(e) => {
                warn!(line = idx + 1, error = %e, "unreadable JSON sample");
                log.malformed += 1;
            }
        }
    }
    log
}
