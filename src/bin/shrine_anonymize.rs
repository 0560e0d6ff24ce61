//! SHRINE Ontology Anonymizer
//!
//! Converts a shrine-ontology table into its anonymized form.
//!
//! ## Configuration
//!
//! Settings come from an optional JSON config file (`--config`); flags
//! override individual values.
//!
//! Environment variables:
//! - `RUST_LOG`: Log level filter (default: info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: pretty)
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin shrine_anonymize --features cli -- \
//!     --input data/original/shrine.csv \
//!     --output data/converted/shrine.csv \
//!     --sensitive '\SHRINE\Diagnoses\' --sensitive '\Admit Diagnosis\'
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use shrine_anonymizer::{
    ConversionError, ConverterConfig, EmissionPolicy, ErrorPolicy, LinkDepth, OntologyConverter,
};

#[derive(Parser)]
#[command(
    name = "shrine_anonymize",
    about = "Anonymize a SHRINE ontology table by surrogate-ID relinking"
)]
struct Cli {
    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Source shrine-ontology table
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Destination table
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Sensitive path (repeatable)
    #[arg(short, long = "sensitive")]
    sensitive: Vec<String>,

    /// File of sensitive paths, one per line
    #[arg(long)]
    sensitive_paths_file: Option<PathBuf>,

    /// Which partitions to write
    #[arg(long = "emit", value_enum)]
    emit: Option<EmitArg>,

    /// What to do with a bad row
    #[arg(long = "on-error", value_enum)]
    on_error: Option<OnErrorArg>,

    /// Transitive or nearest-ancestor linking
    #[arg(long, value_enum)]
    link_depth: Option<LinkDepthArg>,

    /// Root segment of the ontology-version marker
    #[arg(long)]
    version_root: Option<String>,

    /// Write the run manifest here
    #[arg(short, long)]
    manifest: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum EmitArg {
    SensitiveOnly,
    All,
}

#[derive(Clone, Copy, ValueEnum)]
enum OnErrorArg {
    Abort,
    Skip,
}

#[derive(Clone, Copy, ValueEnum)]
enum LinkDepthArg {
    Transitive,
    Nearest,
}

impl Cli {
    fn into_config(self) -> Result<ConverterConfig, ConversionError> {
        let mut config = match &self.config {
            Some(path) => ConverterConfig::from_json_file(path)?,
            None => ConverterConfig::default(),
        };
        if let Some(input) = self.input {
            config.input_path = input;
        }
        if let Some(output) = self.output {
            config.output_path = output;
        }
        config.sensitive_paths.extend(self.sensitive);
        if self.sensitive_paths_file.is_some() {
            config.sensitive_paths_file = self.sensitive_paths_file;
        }
        if let Some(emit) = self.emit {
            config.emission_policy = match emit {
                EmitArg::SensitiveOnly => EmissionPolicy::SensitiveOnly,
                EmitArg::All => EmissionPolicy::All,
            };
        }
        if let Some(on_error) = self.on_error {
            config.error_policy = match on_error {
                OnErrorArg::Abort => ErrorPolicy::Abort,
                OnErrorArg::Skip => ErrorPolicy::SkipRow,
            };
        }
        if let Some(depth) = self.link_depth {
            config.link_depth = match depth {
                LinkDepthArg::Transitive => LinkDepth::Transitive,
                LinkDepthArg::Nearest => LinkDepth::Nearest,
            };
        }
        if let Some(root) = self.version_root {
            config.version_root = root;
        }
        if self.manifest.is_some() {
            config.manifest_path = self.manifest;
        }
        Ok(config)
    }
}

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "shrine_anonymize=info,shrine_anonymizer=info".into());

    if log_format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).flatten_event(true).with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

fn run(cli: Cli) -> Result<(), ConversionError> {
    let config = cli.into_config()?;
    let converter = OntologyConverter::new(config)?;
    let outcome = converter.run()?;

    for rejection in &outcome.rejections {
        info!(line = rejection.line, stage = %rejection.stage, reason = %rejection.reason, "row skipped");
    }
    info!(
        output = %converter.config().output_path.display(),
        rows_read = outcome.stats.rows_read,
        rows_emitted = outcome.stats.rows_emitted,
        rejected = outcome.stats.rejected_rows,
        manifest_id = %outcome.manifest.manifest_id,
        "done"
    );
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let file = e.path().map(|p| p.display().to_string()).unwrap_or_default();
            error!(stage = %e.stage(), file = %file, error = %e, "conversion failed");
            eprintln!("shrine_anonymize: {} stage failed: {e}", e.stage());
            ExitCode::FAILURE
        }
    }
}
