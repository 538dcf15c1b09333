use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::Write;

use perfdash_common::{PerfDashError, Result, Sample};

/// Request labels a synthetic run issues, with the base response time (ms)
/// of each.
///
/// | Label          | Mix % | Base ms |
/// |----------------|-------|---------|
/// | GET /home      |   40  |    80   |
/// | GET /search    |   30  |   250   |
/// | POST /login    |   15  |   400   |
/// | POST /checkout |   15  |   900   |
pub const LABELS: [(&str, f64); 4] = [
    ("GET /home", 80.0),
    ("GET /search", 250.0),
    ("POST /login", 400.0),
    ("POST /checkout", 900.0),
];

pub const THREAD_GROUP: &str = "Virtual Users";

/// Load shapes controlling how many virtual users are active over the run.
///
/// | Profile | Threads over time                              | Error % |
/// |---------|------------------------------------------------|---------|
/// | Steady  | constant `max_threads`                         |    1    |
/// | RampUp  | linear 1 → `max_threads` over the first half   |    2    |
/// | Spiky   | `max_threads / 4`, full load every 5th minute  |    5    |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadProfile {
    Steady,
    RampUp,
    Spiky,
}

impl WorkloadProfile {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "steady" => Some(WorkloadProfile::Steady),
            "ramp-up" => Some(WorkloadProfile::RampUp),
            "spiky" => Some(WorkloadProfile::Spiky),
            _ => None,
        }
    }

    pub fn as_name(&self) -> &'static str {
        match self {
            WorkloadProfile::Steady => "steady",
            WorkloadProfile::RampUp => "ramp-up",
            WorkloadProfile::Spiky => "spiky",
        }
    }

    /// Active virtual users `offset_secs` into a run of `duration_secs`.
    pub fn threads_at(&self, offset_secs: u64, duration_secs: u64, max_threads: u32) -> u32 {
        let max_threads = max_threads.max(1);
        match self {
            WorkloadProfile::Steady => max_threads,
            WorkloadProfile::RampUp => {
                let ramp = (duration_secs / 2).max(1);
                if offset_secs >= ramp {
                    max_threads
                } else {
                    1 + ((max_threads - 1) as u64 * offset_secs / ramp) as u32
                }
            }
            WorkloadProfile::Spiky => {
                if (offset_secs / 60) % 5 == 4 {
                    max_threads
                } else {
                    (max_threads / 4).max(1)
                }
            }
        }
    }

    /// Fraction of requests that fail, in percent.
    pub fn error_pct(&self) -> u32 {
        match self {
            WorkloadProfile::Steady => 1,
            WorkloadProfile::RampUp => 2,
            WorkloadProfile::Spiky => 5,
        }
    }

    /// Map a roll in `0..100` to a label index according to the mix above.
    /// Exposed for deterministic testing.
    pub fn label_for_roll(roll: u32) -> usize {
        if roll < 40 {
            0
        } else if roll < 70 {
            1
        } else if roll < 85 {
            2
        } else {
            3
        }
    }
}

/// Parameters of a synthetic run.
#[derive(Debug, Clone)]
pub struct GenerateParams {
    pub profile: WorkloadProfile,
    pub duration_secs: u64,
    pub max_threads: u32,
    /// Epoch milliseconds of the first sample.
    pub start_ms: i64,
    pub seed: u64,
}

/// Generate a sample log. Every virtual user issues one request per second;
/// response times grow with the number of active users. The same parameters always
/// yields the same samples.
pub fn generate(params: &GenerateParams) -> Vec<Sample> {
    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut samples = Vec::new();

    for offset in 0..params.duration_secs {
        let threads = params.profile.threads_at(offset, params.duration_secs, params.max_threads);
        let load_factor = 1.0 + f64::from(threads) / f64::from(params.max_threads.max(1));
        for _ in 0..threads {
            let (label, base_ms) = LABELS[WorkloadProfile::label_for_roll(rng.gen_range(0..100))];
            let failed = rng.gen_range(0..100) < params.profile.error_pct();
            let elapsed = (base_ms * load_factor * rng.gen_range(0.5..1.5)).round();
            let connect = rng.gen_range(1.0..15.0_f64).round();
            let latency = (elapsed * rng.gen_range(0.6..0.95)).round().max(connect);
            let timestamp = params.start_ms + offset as i64 * 1_000 + rng.gen_range(0..1_000);

            samples.push(Sample {
                timestamp,
                label: Some(label.to_string()),
                elapsed,
                latency: Some(latency),
                connect: Some(connect),
                success: !failed,
                bytes_sent: Some(rng.gen_range(200..800)),
                bytes_received: Some(if failed { 512 } else { rng.gen_range(2_000..40_000) }),
                active_threads: Some(threads),
                response_code: Some(if failed { "500" } else { "200" }.to_string()),
                thread_group: Some(THREAD_GROUP.to_string()),
            });
        }
    }
    samples
}

/// Write samples as a JMeter-style CSV log.
pub fn write_csv<W: Write>(samples: &[Sample], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    let to_io = |e: csv::Error| PerfDashError::Io(e.to_string());
    wtr.write_record([
        "timeStamp",
        "elapsed",
        "label",
        "responseCode",
        "threadName",
        "success",
        "bytes",
        "sentBytes",
        "grpThreads",
        "allThreads",
        "Latency",
        "Connect",
    ])
    .map_err(to_io)?;

    let cell = |v: Option<String>| v.unwrap_or_default();
    for s in samples {
        wtr.write_record([
            s.timestamp.to_string(),
            s.elapsed.to_string(),
            s.label.clone().unwrap_or_default(),
            s.response_code.clone().unwrap_or_default(),
            s.thread_group.clone().unwrap_or_default(),
            s.success.to_string(),
            cell(s.bytes_received.map(|v| v.to_string())),
            cell(s.bytes_sent.map(|v| v.to_string())),
            cell(s.active_threads.map(|v| v.to_string())),
            cell(s.active_threads.map(|v| v.to_string())),
            cell(s.latency.map(|v| v.to_string())),
            cell(s.connect.map(|v| v.to_string())),
        ])
        .map_err(to_io)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write samples as JSON lines.
pub fn write_json_lines<W: Write>(samples: &[Sample], mut writer: W) -> Result<()> {
    for s in samples {
        let line = serde_json::to_string(s)
            .map_err(|e| PerfDashError::Io(e.to_string()))?;
        writeln!(writer, "{line}")?;
    }
    Ok(())
}
