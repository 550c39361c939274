//! The `tessera scan` command.

use clap::{Args, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tessera_core::{Config, OutputFormat as CoreOutputFormat, OutputWriter, ScanSummary, Scanner};

/// Supported output formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One JSON array
    Json,
    /// One JSON object per line (newline-delimited)
    Jsonl,
}

impl From<OutputFormat> for CoreOutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => CoreOutputFormat::Json,
            OutputFormat::Jsonl => CoreOutputFormat::JsonLines,
        }
    }
}

/// Arguments for the `scan` command.
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Directory of source images (searched recursively)
    #[arg(required = true)]
    pub source: PathBuf,

    /// Target image the mosaic will reproduce
    #[arg(short, long)]
    pub target: Option<PathBuf>,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format [default: from config, normally json]
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Number of parallel workers [default: from config, normally 10]
    #[arg(short, long)]
    pub parallel: Option<usize>,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Hide the progress spinner
    #[arg(long)]
    pub no_progress: bool,
}

/// Manual Default impl for constructing ScanArgs outside of clap.
impl Default for ScanArgs {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            target: None,
            output: None,
            format: None,
            parallel: None,
            pretty: false,
            no_progress: false,
        }
    }
}

/// Execute the scan command.
pub async fn execute(args: ScanArgs, config: Config) -> anyhow::Result<()> {
    let source = expand(&args.source);
    check_source(&source)?;
    if let Some(target) = &args.target {
        let target = expand(target);
        check_target(&target)?;
        tracing::info!(target = %target.display(), "Target image accepted");
    }

    let config = apply_overrides(config, &args)?;
    let format = output_format(&args, &config)?;
    let pretty = args.pretty || config.output.pretty;

    tracing::info!(
        source = %source.display(),
        workers = config.processing.parallel_workers,
        "Scanning for images"
    );

    let sink: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    let mut writer = OutputWriter::new(sink, format, pretty);

    let progress = create_spinner(args.no_progress);
    let scanner = Scanner::new(config);
    let mut handle = scanner.scan_stream(&source)?;

    while let Some(record) = handle.next().await {
        writer.write(&record)?;
        progress.inc(1);
    }
    writer.finish()?;
    let summary = handle.finish().await?;
    progress.finish_and_clear();

    if let Some(path) = &args.output {
        tracing::info!("Output written to {:?}", path);
    }
    print_summary(&summary);
    Ok(())
}

fn expand(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}

fn check_source(path: &Path) -> anyhow::Result<()> {
    if !path.exists() {
        anyhow::bail!(
            "Source directory does not exist: {:?}\n\n  Hint: Check the path and try again.",
            path
        );
    }
    if !path.is_dir() {
        anyhow::bail!(
            "Source path is not a directory: {:?}\n\n  Hint: Pass the folder that holds your tile images.",
            path
        );
    }
    Ok(())
}

fn check_target(path: &Path) -> anyhow::Result<()> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => Ok(()),
        Ok(_) => anyhow::bail!("Target is not a regular file: {:?}", path),
        Err(e) => anyhow::bail!("Cannot read target image {:?}: {e}", path),
    }
}

/// Apply CLI flags on top of the loaded config and re-validate.
fn apply_overrides(mut config: Config, args: &ScanArgs) -> anyhow::Result<Config> {
    if let Some(parallel) = args.parallel {
        config.processing.parallel_workers = parallel;
    }
    config.validate()?;
    Ok(config)
}

fn output_format(args: &ScanArgs, config: &Config) -> anyhow::Result<CoreOutputFormat> {
    match args.format {
        Some(format) => Ok(format.into()),
        None => CoreOutputFormat::parse(&config.output.format).ok_or_else(|| {
            anyhow::anyhow!("Unknown output format in config: {}", config.output.format)
        }),
    }
}

fn create_spinner(hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {pos} images found {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Print a formatted summary table after a scan.
fn print_summary(summary: &ScanSummary) {
    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Images:       {:>8}", summary.images);
    if summary.skipped > 0 {
        eprintln!("    Skipped:      {:>8}", summary.skipped);
    }
    if summary.walk_errors > 0 {
        eprintln!("    Walk errors:  {:>8}", summary.walk_errors);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Files:        {:>8}", summary.submitted);
    eprintln!("    Duration:     {:>7.1}s", summary.elapsed.as_secs_f64());
    eprintln!("    Rate:         {:>7.1} img/sec", summary.images_per_sec());
    eprintln!("  ====================================");
}
