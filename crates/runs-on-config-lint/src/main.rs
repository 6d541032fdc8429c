mod output;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use runs_on_config_validation::ConfigValidator;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Validate a runs-on.yml configuration file
#[derive(Parser, Debug)]
#[command(name = "runs-on-config-lint")]
#[command(version)]
#[command(about = "Validate runs-on.yml configuration files", long_about = None)]
struct Args {
    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Read the document from standard input
    #[arg(long, conflicts_with = "file")]
    stdin: bool,

    /// Path to the runs-on.yml file
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Human-readable report
    Text,
    /// JSON object with a `valid` flag and the diagnostics
    Json,
    /// SARIF 2.1.0 log
    Sarif,
}

fn main() {
    // Logs go to stderr so that stdout stays machine-readable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "runs_on_config_lint=warn,runs_on_config_validation=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    match run() {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

/// Returns whether the document is valid.
fn run() -> Result<bool> {
    let args = Args::parse();

    let validator = ConfigValidator::new().context("failed to load the runs-on.yml schema")?;

    let (source_name, report) = if args.stdin {
        let report = validator.validate_reader(io::stdin().lock(), "<stdin>")?;
        ("<stdin>".to_string(), report)
    } else {
        let Some(path) = args.file else {
            bail!("no file specified (pass a FILE or --stdin)");
        };
        let report = validator.validate_file(&path)?;
        (path.display().to_string(), report)
    };

    tracing::info!(
        source = %source_name,
        errors = report.error_count(),
        warnings = report.warning_count(),
        "validated"
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.format {
        Format::Text => output::write_text(&mut out, &source_name, &report),
        Format::Json => output::write_json(&mut out, &source_name, &report),
        Format::Sarif => output::write_sarif(&mut out, &source_name, &report),
    }
    .context("failed to write report")?;
    out.flush().context("failed to write report")?;

    Ok(report.is_valid())
}
