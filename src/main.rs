//! tabcompare - Key-aligned comparison of tabular datasets

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use log::{info, LevelFilter};

use tabcompare::config::{CompareConfig, OutputFormat, ResultDetail};
use tabcompare::normalize::HeaderNormalizer;
use tabcompare::output::{render_to_path, render_to_stdout, ReportContext, SessionReport};
use tabcompare::session::{SessionConfig, TestCase};
use tabcompare::source::SourceSpec;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliOutputFormat {
    Terminal,
    Json,
    Html,
    Xlsx,
}

impl From<CliOutputFormat> for OutputFormat {
    fn from(f: CliOutputFormat) -> Self {
        match f {
            CliOutputFormat::Terminal => OutputFormat::Terminal,
            CliOutputFormat::Json => OutputFormat::Json,
            CliOutputFormat::Html => OutputFormat::Html,
            CliOutputFormat::Xlsx => OutputFormat::Xlsx,
        }
    }
}

/// Compare two tabular datasets (CSV, TSV, JSON, JSON lines) row by row on a primary key
#[derive(Parser, Debug)]
#[command(name = "tabcompare")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Source (expected) file
    #[arg(required_unless_present = "session")]
    source: Option<PathBuf>,

    /// Target (actual) file
    #[arg(required_unless_present = "session")]
    target: Option<PathBuf>,

    /// Primary-key column(s) for row matching (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    key: Vec<String>,

    /// Column(s) to ignore in comparison (comma-separated)
    #[arg(long, value_delimiter = ',')]
    ignore_column: Vec<String>,

    /// Absolute tolerance for numeric comparisons (e.g., 0.001)
    #[arg(long)]
    tolerance: Option<f64>,

    /// Relative tolerance for numeric comparisons (e.g., 0.01 for 1%)
    #[arg(long)]
    relative_tolerance: Option<f64>,

    /// Round numbers to this many decimal places before comparing
    #[arg(long)]
    decimal_places: Option<u32>,

    /// Ignore case when comparing string values
    #[arg(long)]
    ignore_case: bool,

    /// Ignore leading/trailing whitespace in string values
    #[arg(long)]
    trim: bool,

    /// Lowercase headers and replace spaces and dashes with underscores
    #[arg(long)]
    generalize_headers: bool,

    /// Field delimiter for delimited text files
    #[arg(long)]
    delimiter: Option<char>,

    /// Comparison settings file (TOML); flags override it
    #[arg(long, conflicts_with = "session")]
    config: Option<PathBuf>,

    /// Fail when a primary-key cell is null
    #[arg(long)]
    reject_null_keys: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "terminal")]
    format: CliOutputFormat,

    /// Write the report to this file instead of stdout (required for xlsx)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Report title
    #[arg(long)]
    title: Option<String>,

    /// Only report counts, not individual rows
    #[arg(long)]
    summary_only: bool,

    /// Run every test case of a session file (TOML)
    #[arg(long, conflicts_with_all = ["source", "target"])]
    session: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

/// Outcome of a run, mapped to the process exit code
enum RunStatus {
    Clean,
    Differences,
    Failed,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .parse_default_env()
        .init();

    match run(cli) {
        Ok(RunStatus::Clean) => ExitCode::SUCCESS,
        Ok(RunStatus::Differences) => ExitCode::from(1),
        Ok(RunStatus::Failed) => ExitCode::from(2),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<RunStatus> {
    if let Some(ref session_path) = cli.session {
        return run_session(session_path, cli.format.into(), cli.output.as_deref());
    }

    if matches!(cli.format, CliOutputFormat::Xlsx) && cli.output.is_none() {
        bail!("XLSX reports must be written to a file (use --output)");
    }

    let source = cli.source.clone().context("source file is required")?;
    let target = cli.target.clone().context("target file is required")?;

    let config = build_config(&cli)?;
    let header = HeaderNormalizer::new().with_generalize(cli.generalize_headers);

    let mut source_spec = SourceSpec::new(&source);
    source_spec.delimiter = cli.delimiter;
    let mut target_spec = SourceSpec::new(&target);
    target_spec.delimiter = cli.delimiter;

    let case = TestCase::new("tabcompare", source_spec, target_spec, config).with_header(header);
    let result = case.run()?;

    let mut context =
        ReportContext::new(source.display().to_string(), target.display().to_string());
    if let Some(ref title) = cli.title {
        context = context.with_title(title.clone());
    }

    match cli.output {
        Some(ref path) => {
            render_to_path(&result, &context, cli.format.into(), path)?;
            info!("Report written to {}", path.display());
        }
        None => render_to_stdout(&result, &context, cli.format.into())?,
    }

    Ok(if result.has_differences() {
        RunStatus::Differences
    } else {
        RunStatus::Clean
    })
}

/// Merge the optional config file with command-line flags
fn build_config(cli: &Cli) -> Result<CompareConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            CompareConfig::from_toml_str(&text)?
        }
        None => CompareConfig::default(),
    };

    if !cli.key.is_empty() {
        config.primary_key = cli.key.clone();
    }
    config.ignore_columns.extend(cli.ignore_column.iter().cloned());

    let policy = &mut config.default_policy;
    if let Some(tolerance) = cli.tolerance {
        policy.absolute_tolerance = Some(tolerance);
    }
    if let Some(tolerance) = cli.relative_tolerance {
        policy.relative_tolerance = Some(tolerance);
    }
    if let Some(places) = cli.decimal_places {
        policy.decimal_places = Some(places);
    }
    if cli.ignore_case {
        policy.ignore_case = true;
    }
    if cli.trim {
        policy.ignore_whitespace = true;
    }

    if cli.summary_only {
        config.detail = ResultDetail::SummaryOnly;
    }
    if cli.reject_null_keys {
        config.reject_null_keys = true;
    }

    Ok(config)
}

fn run_session(path: &Path, format: OutputFormat, output: Option<&Path>) -> Result<RunStatus> {
    if format == OutputFormat::Xlsx && output.is_none() {
        bail!("XLSX reports must be written to a file (use --output)");
    }
    let session = SessionConfig::from_path(path)?.into_session();
    if session.is_empty() {
        bail!("Session file has no [[test]] entries: {}", path.display());
    }

    let outcomes = session.run_all();
    let report = SessionReport::new(format);
    match output {
        Some(report_path) => {
            let file = File::create(report_path).with_context(|| {
                format!("Failed to create report file: {}", report_path.display())
            })?;
            let mut writer = BufWriter::new(file);
            report.render(&outcomes, &mut writer)?;
            writer.flush()?;
            info!("Report written to {}", report_path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            report.render(&outcomes, &mut stdout)?;
        }
    }

    Ok(if outcomes.iter().any(|o| o.is_failed()) {
        RunStatus::Failed
    } else if outcomes.iter().any(|o| o.has_differences()) {
        RunStatus::Differences
    } else {
        RunStatus::Clean
    })
}
