use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Labels longer than this are treated as corrupt log lines.
pub const MAX_LABEL_SIZE: usize = 1_024;

/// Error types for report setup. Per-record data problems are never errors;
/// the aggregator skips and counts those instead.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PerfDashError {
    #[error("Invalid series filter: {0}")]
    InvalidFilter(String),

    #[error("Granularity must be between 1 and 9223372036854775807 milliseconds, got {0}")]
    InvalidGranularity(u64),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid controller map: {0}")]
    InvalidControllerMap(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
}

impl From<std::io::Error> for PerfDashError {
    fn from(e: std::io::Error) -> Self {
        PerfDashError::Io(e.to_string())
    }
}

/// Result type for perfdash operations
pub type Result<T> = std::result::Result<T, PerfDashError>;

fn missing_elapsed() -> f64 {
    f64::NAN
}

fn default_success() -> bool {
    true
}

/// One recorded request outcome as it appears in a sample log.
///
/// Fields a log may omit are optional. `elapsed` is a float so that corrupt
/// values (negative, NaN) survive parsing and can be rejected per record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    /// Start of the request, epoch milliseconds.
    pub timestamp: i64,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default = "missing_elapsed")]
    pub elapsed: f64,
    #[serde(default)]
    pub latency: Option<f64>,
    #[serde(default)]
    pub connect: Option<f64>,
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub bytes_sent: Option<u64>,
    #[serde(default)]
    pub bytes_received: Option<u64>,
    #[serde(default)]
    pub active_threads: Option<u32>,
    #[serde(default)]
    pub response_code: Option<String>,
    #[serde(default)]
    pub thread_group: Option<String>,
}

impl Sample {
    /// A sample carrying only the mandatory fields.
    pub fn new(timestamp: i64, label: &str, elapsed: f64, success: bool) -> Self {
        Self {
            timestamp,
            label: Some(label.to_string()),
            elapsed,
            latency: None,
            connect: None,
            success,
            bytes_sent: None,
            bytes_received: None,
            active_threads: None,
            response_code: None,
            thread_group: None,
        }
    }

    pub fn with_latency(mut self, latency: f64) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn with_connect(mut self, connect: f64) -> Self {
        self.connect = Some(connect);
        self
    }

    pub fn with_bytes(mut self, sent: u64, received: u64) -> Self {
        self.bytes_sent = Some(sent);
        self.bytes_received = Some(received);
        self
    }

    pub fn with_threads(mut self, active_threads: u32) -> Self {
        self.active_threads = Some(active_threads);
        self
    }

    pub fn with_response_code(mut self, code: &str) -> Self {
        self.response_code = Some(code.to_string());
        self
    }

    pub fn with_thread_group(mut self, group: &str) -> Self {
        self.thread_group = Some(group.to_string());
        self
    }
}

/// Transaction-controller membership: controller label → member request labels.
///
/// Serialized as a plain JSON object, e.g.
/// `{"Checkout": ["GET /cart", "POST /order"]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ControllerMap {
    pub controllers: BTreeMap<String, BTreeSet<String>>,
}

impl ControllerMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a controller with the given members, replacing any previous entry.
    pub fn with_controller<I, S>(mut self, controller: &str, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.controllers
            .insert(controller.to_string(), members.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    pub fn is_controller(&self, label: &str) -> bool {
        self.controllers.contains_key(label)
    }

    /// Controllers that list `label` as a member, in label order.
    pub fn controllers_of<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.controllers
            .iter()
            .filter(move |(_, members)| members.contains(label))
            .map(|(name, _)| name.as_str())
    }

    /// Reject empty controllers and nesting. Members must be request labels;
    /// a controller that lists another controller (or itself) is refused.
    pub fn validate(&self) -> Result<()> {
        for (name, members) in &self.controllers {
            if members.is_empty() {
                return Err(PerfDashError::InvalidControllerMap(format!(
                    "controller {name:?} has no members"
                )));
            }
            if let Some(nested) = members.iter().find(|m| self.is_controller(m)) {
                return Err(PerfDashError::InvalidControllerMap(format!(
                    "controller {name:?} lists controller {nested:?} as a member"
                )));
            }
        }
        Ok(())
    }
}
