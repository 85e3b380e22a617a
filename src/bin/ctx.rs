//! ctx - Command-line interface for the context engine
//!
//! Commands:
//! - replay: Run a recorded sensor stream through the detector
//! - classify: Show features and the rule outcome for a magnitude window
//! - config: Print the default classifier configuration
//! - doctor: Diagnose configuration and environment

use chrono::Duration;
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use context_engine::classifier::classify;
use context_engine::features::FeatureDeriver;
use context_engine::pipeline::{ContextRecord, ContextReplayer, DEFAULT_SNAPSHOT_INTERVAL_MS};
use context_engine::providers::{SharedViewport, StaticPermissions};
use context_engine::schema::{self, SCHEMA_VERSION};
use context_engine::types::Permission;
use context_engine::{ClassifierConfig, ContextDetector, ContextError, ENGINE_VERSION, PRODUCER_NAME};

/// ctx - On-device activity context detection
#[derive(Parser)]
#[command(name = "ctx")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Classify motion-sensor streams into activity context", long_about = None)]
struct Cli {
    /// Log filter (e.g. "debug", "context_engine=trace")
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a recorded sensor stream through the detector
    Replay {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// Classifier config JSON file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Snapshot read cadence in milliseconds of event time
        #[arg(long, default_value_t = DEFAULT_SNAPSHOT_INTERVAL_MS)]
        snapshot_interval_ms: i64,

        /// Viewport width used to derive orientation
        #[arg(long, default_value = "390")]
        width: f64,

        /// Viewport height used to derive orientation
        #[arg(long, default_value = "844")]
        height: f64,

        /// Simulate a denied location permission
        #[arg(long)]
        deny_location: bool,
    },

    /// Show features and the rule outcome for a JSON array of magnitudes
    Classify {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Ground speed (m/s) of the last location fix
        #[arg(long)]
        speed: Option<f64>,

        /// Classifier config JSON file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the default classifier configuration
    Config,

    /// Diagnose configuration and environment
    Doctor {
        /// Check a classifier config file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one event per line)
    Ndjson,
    /// JSON array of events
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// JSON array of records
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

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

fn init_tracing(log_level: &str) {
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    let stderr_layer = fmt::layer().with_target(true).with_writer(io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .init();
}

fn run(cli: Cli) -> Result<(), CtxCliError> {
    match cli.command {
        Commands::Replay {
            input,
            output,
            input_format,
            output_format,
            config,
            snapshot_interval_ms,
            width,
            height,
            deny_location,
        } => cmd_replay(
            &input,
            &output,
            input_format,
            output_format,
            config.as_deref(),
            snapshot_interval_ms,
            (width, height),
            deny_location,
        ),

        Commands::Classify {
            input,
            speed,
            config,
        } => cmd_classify(&input, speed, config.as_deref()),

        Commands::Config => {
            println!("{}", ClassifierConfig::default().to_json()?);
            Ok(())
        }

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_replay(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    config: Option<&Path>,
    snapshot_interval_ms: i64,
    viewport: (f64, f64),
    deny_location: bool,
) -> Result<(), CtxCliError> {
    let input_data = read_input(input)?;

    let events = match input_format {
        InputFormat::Ndjson => schema::parse_ndjson(&input_data)?,
        InputFormat::Json => schema::parse_array(&input_data)?,
    };

    if events.is_empty() {
        return Err(CtxCliError::NoEvents);
    }

    let detector = ContextDetector::new(load_config(config)?)?
        .with_orientation(SharedViewport::new(viewport.0, viewport.1));
    let mut replayer =
        ContextReplayer::new(detector, Duration::milliseconds(snapshot_interval_ms));

    let mut permissions = if deny_location {
        StaticPermissions::denying([Permission::Location])
    } else {
        StaticPermissions::granted()
    };
    replayer.start(&mut permissions)?;

    let mut records: Vec<ContextRecord> = Vec::new();
    for event in &events {
        if let Some(record) = replayer.process_event(event)? {
            records.push(record);
        }
    }
    records.extend(replayer.finish());

    tracing::info!(
        events = replayer.events_processed(),
        records = records.len(),
        "replay complete"
    );

    let output_data = format_output(&records, &output_format)?;
    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_classify(
    input: &Path,
    speed: Option<f64>,
    config: Option<&Path>,
) -> Result<(), CtxCliError> {
    let config = load_config(config)?;
    let magnitudes: Vec<f64> = serde_json::from_str(&read_input(input)?)?;

    if magnitudes.iter().any(|m| !m.is_finite()) {
        return Err(CtxCliError::Message(
            "Magnitudes must be finite numbers".to_string(),
        ));
    }

    let features = FeatureDeriver::derive_from_slice(&magnitudes, config.sample_rate_hz)
        .ok_or(CtxCliError::NoEvents)?;
    let candidate = classify(&features, speed, &config.thresholds);

    let report = serde_json::json!({
        "features": features,
        "candidate": candidate,
        "warm": magnitudes.len() >= config.min_samples,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), CtxCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "engine_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Engine version {}", ENGINE_VERSION),
    });

    checks.push(DoctorCheck {
        name: "schema_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Input schema: {}", SCHEMA_VERSION),
    });

    if let Some(config_path) = config {
        let check = if !config_path.exists() {
            DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Warning,
                message: "Config file does not exist".to_string(),
            }
        } else {
            match fs::read_to_string(config_path) {
                Ok(content) => match ClassifierConfig::from_json(&content) {
                    Ok(parsed) => DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Ok,
                        message: format!(
                            "Config valid ({} sample window, warm after {})",
                            parsed.window_capacity, parsed.min_samples
                        ),
                    },
                    Err(e) => DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Error,
                        message: e.to_string(),
                    },
                },
                Err(e) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Cannot read config file: {}", e),
                },
            }
        };
        checks.push(check);
    }

    let stdin_message = if atty::is(atty::Stream::Stdin) {
        "stdin is a TTY (interactive mode)"
    } else {
        "stdin is a pipe (replay from stdin ready)"
    };
    checks.push(DoctorCheck {
        name: "stdin".to_string(),
        status: CheckStatus::Ok,
        message: stdin_message.to_string(),
    });

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: ENGINE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("ctx Doctor Report");
        println!("=================");
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

    if report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error))
    {
        Err(CtxCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn read_input(input: &Path) -> Result<String, CtxCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn load_config(path: Option<&Path>) -> Result<ClassifierConfig, CtxCliError> {
    match path {
        Some(path) => Ok(ClassifierConfig::from_json(&fs::read_to_string(path)?)?),
        None => Ok(ClassifierConfig::default()),
    }
}

fn format_output(records: &[ContextRecord], format: &OutputFormat) -> Result<String, CtxCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for record in records {
                lines.push(serde_json::to_string(record)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(records)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(records)?),
    }
}

// Error types

#[derive(Debug)]
enum CtxCliError {
    Io(io::Error),
    Context(ContextError),
    Json(serde_json::Error),
    NoEvents,
    DoctorFailed,
    Message(String),
}

impl From<io::Error> for CtxCliError {
    fn from(e: io::Error) -> Self {
        CtxCliError::Io(e)
    }
}

impl From<ContextError> for CtxCliError {
    fn from(e: ContextError) -> Self {
        CtxCliError::Context(e)
    }
}

impl From<serde_json::Error> for CtxCliError {
    fn from(e: serde_json::Error) -> Self {
        CtxCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<CtxCliError> for CliError {
    fn from(e: CtxCliError) -> Self {
        match e {
            CtxCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            CtxCliError::Context(ContextError::PermissionDenied(permission)) => CliError {
                code: "PERMISSION_DENIED".to_string(),
                message: format!("Required permission not granted: {}", permission),
                hint: Some("Grant the permission and start a new session".to_string()),
            },
            CtxCliError::Context(ContextError::Validation(e)) => CliError {
                code: "VALIDATION_ERROR".to_string(),
                message: e.to_string(),
                hint: Some(format!("Ensure events match {}", SCHEMA_VERSION)),
            },
            CtxCliError::Context(
                e @ (ContextError::NonFiniteSample { .. } | ContextError::SampleOutOfRange { .. }),
            ) => CliError {
                code: "VALIDATION_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Drop corrupt sensor readings from the recording".to_string()),
            },
            CtxCliError::Context(ContextError::InvalidConfig(msg)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: msg,
                hint: Some("Run 'ctx config' for a valid starting point".to_string()),
            },
            CtxCliError::Context(e) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some(format!("Ensure input matches {}", SCHEMA_VERSION)),
            },
            CtxCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            CtxCliError::NoEvents => CliError {
                code: "NO_EVENTS".to_string(),
                message: "No events found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            CtxCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
            CtxCliError::Message(msg) => CliError {
                code: "INPUT_ERROR".to_string(),
                message: msg,
                hint: None,
            },
        }
    }
}

// Report types

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
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
