use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process;
use std::time::{SystemTime, UNIX_EPOCH};

use perfdash_aggregator::config::{
    DEFAULT_BIN_WIDTH_MS, DEFAULT_GRANULARITY_MS, DEFAULT_SATISFIED_MS, DEFAULT_TOLERATED_MS,
};
use perfdash_cli::input::InputFormat;
use perfdash_cli::synthetic::{self, GenerateParams, WorkloadProfile};
use perfdash_cli::{logging, report, run_aggregate, AggregateOptions};
use tracing::error;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Csv,
    Jsonl,
}

impl From<Format> for InputFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Csv => InputFormat::Csv,
            Format::Jsonl => InputFormat::JsonLines,
        }
    }
}

#[derive(Parser)]
#[command(name = "perfdash", about = "Aggregate load-test sample logs into dashboard series")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging (per-record rejections)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Aggregate a sample log and write the result as JSON
    Aggregate {
        /// Sample log to read
        #[arg(long)]
        input: PathBuf,

        /// Input format; guessed from the file extension when omitted
        #[arg(long)]
        format: Option<Format>,

        /// Bucket width of the time-series graphs (ms)
        #[arg(long, default_value_t = DEFAULT_GRANULARITY_MS)]
        granularity_ms: u64,

        /// Bin width of the response time distribution (ms)
        #[arg(long, default_value_t = DEFAULT_BIN_WIDTH_MS)]
        bin_width_ms: u64,

        /// Upper bound of the satisfied band (ms)
        #[arg(long, default_value_t = DEFAULT_SATISFIED_MS)]
        satisfied_ms: u64,

        /// Upper bound of the tolerated band (ms)
        #[arg(long, default_value_t = DEFAULT_TOLERATED_MS)]
        tolerated_ms: u64,

        /// Keep only labels matching this regex
        #[arg(long)]
        filter: Option<String>,

        /// Match --filter as a plain substring
        #[arg(long, requires = "filter")]
        substring: bool,

        /// JSON file mapping controller labels to member labels
        #[arg(long)]
        controllers: Option<PathBuf>,

        /// Write the result here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print the JSON result
        #[arg(long)]
        pretty: bool,
    },

    /// Write a synthetic sample log
    Generate {
        /// Where to write the log
        #[arg(long)]
        output: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Csv)]
        format: Format,

        /// Load profile: steady | ramp-up | spiky
        #[arg(long, default_value = "steady")]
        profile: String,

        /// Length of the run (seconds)
        #[arg(long, default_value_t = 300)]
        duration_secs: u64,

        /// Peak number of virtual users
        #[arg(long, default_value_t = 20)]
        max_threads: u32,

        /// RNG seed; the same seed reproduces the same log
        #[arg(long, default_value_t = 1)]
        seed: u64,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let code = match cli.command {
        Command::Aggregate {
            input,
            format,
            granularity_ms,
            bin_width_ms,
            satisfied_ms,
            tolerated_ms,
            filter,
            substring,
            controllers,
            output,
            pretty,
        } => {
            let opts = AggregateOptions {
                input,
                format: format.map(InputFormat::from),
                granularity_ms,
                bin_width_ms,
                satisfied_ms,
                tolerated_ms,
                filter,
                substring,
                controllers,
            };
            aggregate(&opts, output, pretty).await
        }
        Command::Generate { output, format, profile, duration_secs, max_threads, seed } => {
            let Some(profile) = WorkloadProfile::from_name(&profile) else {
                eprintln!("Unknown profile {profile:?}. Valid values: steady, ramp-up, spiky");
                process::exit(3);
            };
            generate(output, format, profile, duration_secs, max_threads, seed).await
        }
    };
    process::exit(code);
}

/// Exit 0 on success, 1 when the result is empty, 3 on setup failure.
async fn aggregate(opts: &AggregateOptions, output: Option<PathBuf>, pretty: bool) -> i32 {
    let outcome = match run_aggregate(opts).await {
        Ok(o) => o,
        Err(e) => {
            error!("{e}");
            return 3;
        }
    };

    let json = if pretty {
        serde_json::to_string_pretty(&outcome.result)
    } else {
        serde_json::to_string(&outcome.result)
    };
    let json = match json {
        Ok(j) => j,
        Err(e) => {
            error!("Failed to encode result: {e}");
            return 3;
        }
    };

    let summary =
        report::render_summary(&outcome.result, outcome.samples_read, outcome.malformed_lines);
    match output {
        Some(path) => {
            if let Err(e) = tokio::fs::write(&path, json).await {
                error!("Failed to write {}: {e}", path.display());
                return 3;
            }
            print!("{summary}");
        }
        None => {
            println!("{json}");
            eprint!("{summary}");
        }
    }

    if outcome.result.is_empty() {
        1
    } else {
        0
    }
}

async fn generate(
    output: PathBuf,
    format: Format,
    profile: WorkloadProfile,
    duration_secs: u64,
    max_threads: u32,
    seed: u64,
) -> i32 {
    let start_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default();
    let params = GenerateParams { profile, duration_secs, max_threads, start_ms, seed };
    let samples = synthetic::generate(&params);

    let mut buf = Vec::new();
    let written = match format {
        Format::Csv => synthetic::write_csv(&samples, &mut buf),
        Format::Jsonl => synthetic::write_json_lines(&samples, &mut buf),
    };
    if let Err(e) = written {
        error!("{e}");
        return 3;
    }
    if let Err(e) = tokio::fs::write(&output, buf).await {
        error!("Failed to write {}: {e}", output.display());
        return 3;
    }

    println!(
        "Wrote {} samples ({} profile, {}s) to {}",
        report::format_thousands(samples.len() as u64),
        profile.as_name(),
        duration_secs,
        output.display()
    );
    0
}
