//! Opsim CLI - Command-line interface for the metrics engine
//!
//! Commands:
//! - replay: Run a recorded frame stream through the engine and emit the report
//! - validate: Validate replay frame input
//! - doctor: Diagnose engine configuration and input health
//! - schema: Print input/output schema information

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use opsim_metrics::registry::{MetricsSink, SessionRecord, SessionReport};
use opsim_metrics::{
    Engine, MetricParameters, MetricsError, ReplayFrame, ENGINE_VERSION, PRODUCER_NAME,
};

/// Opsim - Behavioral metrics engine for simulation-based operator training
#[derive(Parser)]
#[command(name = "opsim")]
#[command(author = "Opsim Labs")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Replay recorded training sessions through the metrics engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a recorded frame stream through the engine and emit the report
    Replay {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path for the session report (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Scenario name recorded in the report
        #[arg(long, default_value = "replay")]
        scenario: String,

        /// Sampling rate applied to every metric (Hz)
        #[arg(long, default_value = "90.0")]
        sampling_rate: f64,

        /// Also write interval session records as NDJSON to this file
        #[arg(long)]
        records: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,
    },

    /// Validate replay frame input
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose engine configuration and input health
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Input schema (replay frames)
    Input,
    /// Output schema (session report)
    Output,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), OpsimCliError> {
    match cli.command {
        Commands::Replay {
            input,
            output,
            scenario,
            sampling_rate,
            records,
            output_format,
        } => cmd_replay(
            &input,
            &output,
            &scenario,
            sampling_rate,
            records.as_deref(),
            output_format,
        ),
        Commands::Validate { input, json } => cmd_validate(&input, json),
        Commands::Doctor { json } => cmd_doctor(json),
        Commands::Schema { schema_type } => cmd_schema(schema_type),
    }
}

fn read_input(input: &Path) -> Result<String, OpsimCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

/// NDJSON record sink writing one session record per line
struct NdjsonRecordSink {
    file: fs::File,
}

impl NdjsonRecordSink {
    fn create(path: &Path) -> Result<Self, OpsimCliError> {
        Ok(Self {
            file: fs::File::create(path)?,
        })
    }
}

impl MetricsSink for NdjsonRecordSink {
    fn deliver_record(&mut self, record: &SessionRecord) -> Result<(), MetricsError> {
        let line = serde_json::to_string(record)?;
        writeln!(self.file, "{line}").map_err(|e| MetricsError::SinkError(e.to_string()))
    }

    fn deliver_report(&mut self, _report: &SessionReport) -> Result<(), MetricsError> {
        Ok(())
    }
}

fn cmd_replay(
    input: &Path,
    output: &Path,
    scenario: &str,
    sampling_rate: f64,
    records: Option<&Path>,
    output_format: OutputFormat,
) -> Result<(), OpsimCliError> {
    let input_data = read_input(input)?;
    let frames = ReplayFrame::parse_ndjson(&input_data)?;

    if frames.is_empty() {
        return Err(OpsimCliError::NoFrames);
    }

    let params = MetricParameters {
        sampling_rate_hz: sampling_rate,
        ..Default::default()
    };
    let mut engine = Engine::new(scenario, params)?;

    if let Some(records_path) = records {
        engine.add_sink(Box::new(NdjsonRecordSink::create(records_path)?));
    }

    let report = engine.replay(&frames)?;

    let output_data = match output_format {
        OutputFormat::Json => serde_json::to_string(&report)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(&report)?,
    };

    if output.to_string_lossy() == "-" {
        println!("{output_data}");
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_validate(input: &Path, json: bool) -> Result<(), OpsimCliError> {
    let input_data = read_input(input)?;

    let mut total = 0usize;
    let mut errors: Vec<ValidationErrorDetail> = Vec::new();
    for (index, line) in input_data.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        total += 1;
        let result = serde_json::from_str::<ReplayFrame>(trimmed)
            .map_err(|e| e.to_string())
            .and_then(|frame| frame.validate().map_err(|e| e.to_string()));
        if let Err(error) = result {
            errors.push(ValidationErrorDetail {
                line: index + 1,
                error,
            });
        }
    }

    let report = ValidationReport {
        total_frames: total,
        valid_frames: total - errors.len(),
        invalid_frames: errors.len(),
        errors,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total frames:   {}", report.total_frames);
        println!("Valid frames:   {}", report.valid_frames);
        println!("Invalid frames: {}", report.invalid_frames);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - line {}: {}", err.line, err.error);
            }
        }
    }

    if report.invalid_frames > 0 {
        Err(OpsimCliError::ValidationFailed(report.invalid_frames))
    } else {
        Ok(())
    }
}

fn cmd_doctor(json: bool) -> Result<(), OpsimCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "engine_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Engine version {ENGINE_VERSION}"),
    });

    // A default engine must assemble cleanly
    match Engine::new("doctor", MetricParameters::default()) {
        Ok(engine) => {
            checks.push(DoctorCheck {
                name: "standard_metrics".to_string(),
                status: CheckStatus::Ok,
                message: format!(
                    "{} metrics registered",
                    engine.registry().metric_names().len()
                ),
            });
        }
        Err(e) => {
            checks.push(DoctorCheck {
                name: "standard_metrics".to_string(),
                status: CheckStatus::Error,
                message: format!("Engine assembly failed: {e}"),
            });
        }
    }

    if cfg!(debug_assertions) {
        checks.push(DoctorCheck {
            name: "build_profile".to_string(),
            status: CheckStatus::Warning,
            message: "Debug build; timings are not representative".to_string(),
        });
    } else {
        checks.push(DoctorCheck {
            name: "build_profile".to_string(),
            status: CheckStatus::Ok,
            message: "Release build".to_string(),
        });
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (streaming mode ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: ENGINE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Opsim Doctor Report");
        println!("===================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(OpsimCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_schema(schema_type: SchemaType) -> Result<(), OpsimCliError> {
    match schema_type {
        SchemaType::Input => {
            println!("Input Schema: replay frames (NDJSON, one frame per line)");
            println!();
            println!("Each frame carries a frame delta time plus optional payloads:");
            println!();
            println!("- dt: frame delta time in seconds (required, positive)");
            println!("- gaze: head pose, optional eye direction/openness, raycast hit");
            println!("- controllers: per-hand pose, trigger/grip axes, pointed-at entity");
            println!("- situation: head pose, visible entities, current gaze target");
            println!("- stress: HRV, environmental stressor level, active stressor names");
            println!("- events: avatar lifecycle events (spawned, classified, despawned)");
        }
        SchemaType::Output => {
            println!("Output Schema: session report");
            println!();
            println!("- timestamp, session_id, scenario, duration_sec");
            println!("- totals: {{ metric_count, total_samples }}");
            println!("- reports: per-metric statistical reports, each with");
            println!("  sample_count, mean, median, std_dev, min, max, duration");
            println!("  and metric-specific findings under 'additional'");
            println!();
            println!("Interval records (--records) carry per-metric live snapshots:");
            println!("- timestamp, session_id, scenario, elapsed_sec");
            println!("- metrics: mapping of metric name to snapshot values");
            println!("- active_stressors: currently active stressor names");
        }
    }

    Ok(())
}

// Error types

#[derive(Debug)]
enum OpsimCliError {
    Io(io::Error),
    Engine(MetricsError),
    Json(serde_json::Error),
    NoFrames,
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for OpsimCliError {
    fn from(e: io::Error) -> Self {
        OpsimCliError::Io(e)
    }
}

impl From<MetricsError> for OpsimCliError {
    fn from(e: MetricsError) -> Self {
        OpsimCliError::Engine(e)
    }
}

impl From<serde_json::Error> for OpsimCliError {
    fn from(e: serde_json::Error) -> Self {
        OpsimCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<OpsimCliError> for CliError {
    fn from(e: OpsimCliError) -> Self {
        match e {
            OpsimCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            OpsimCliError::Engine(e) => CliError {
                code: "ENGINE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'opsim validate' on the input first".to_string()),
            },
            OpsimCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            OpsimCliError::NoFrames => CliError {
                code: "NO_FRAMES".to_string(),
                message: "No frames found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            OpsimCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{count} frames failed validation"),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            OpsimCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_frames: usize,
    valid_frames: usize,
    invalid_frames: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    line: usize,
    error: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
