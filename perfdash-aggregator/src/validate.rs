use perfdash_common::{ControllerMap, Sample, MAX_LABEL_SIZE};
use serde::Serialize;

/// Why a sample was left out of the aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// No label, or an empty one.
    MissingLabel,
    /// Label longer than `MAX_LABEL_SIZE`; almost always a corrupt line.
    LabelTooLarge,
    /// Elapsed time negative, NaN or infinite.
    InvalidElapsed,
    /// Labelled with a controller name. Controller rows are derived from
    /// their members, so such records are not an independent stream.
    ControllerSample,
}

/// A sample that passed validation, borrowed from the input.
///
/// Corrupt optional timings (negative or NaN latency/connect) are cleared
/// here rather than rejecting the whole sample.
#[derive(Debug, Clone, Copy)]
pub struct Measurement<'a> {
    pub sample: &'a Sample,
    pub label: &'a str,
    pub latency: Option<f64>,
    pub connect: Option<f64>,
}

impl Measurement<'_> {
    pub fn timestamp(&self) -> i64 {
        self.sample.timestamp
    }

    pub fn elapsed(&self) -> f64 {
        self.sample.elapsed
    }

    pub fn success(&self) -> bool {
        self.sample.success
    }
}

/// Check a single sample. Never fails the batch; the caller counts the reason.
pub fn validate<'a>(
    sample: &'a Sample,
    controllers: &ControllerMap,
) -> Result<Measurement<'a>, RejectReason> {
    let label = match sample.label.as_deref() {
        Some(l) if !l.is_empty() => l,
        _ => return Err(RejectReason::MissingLabel),
    };
    if label.len() > MAX_LABEL_SIZE {
        return Err(RejectReason::LabelTooLarge);
    }
    if !is_valid_duration(sample.elapsed) {
        return Err(RejectReason::InvalidElapsed);
    }
    if controllers.is_controller(label) {
        return Err(RejectReason::ControllerSample);
    }

    Ok(Measurement {
        sample,
        label,
        latency: sample.latency.filter(|v| is_valid_duration(*v)),
        connect: sample.connect.filter(|v| is_valid_duration(*v)),
    })
}

fn is_valid_duration(v: f64) -> bool {
    v.is_finite() && v >= 0.0
}
