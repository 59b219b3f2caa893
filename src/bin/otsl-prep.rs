//! CLI binary for otsl-prep.
//!
//! One subcommand per curation stage. Each is a thin shim that maps flags to
//! the library call, prints a summary and turns fatal errors into an exit
//! code (2 for a missing directory, 1 otherwise).

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use otsl_prep::config::{DEFAULT_COPY_LIMIT, DEFAULT_MANIFEST, DEFAULT_PYTHON};
use otsl_prep::stages::{captions, copy, manifest, prune, tags, whitespace};
use otsl_prep::{
    convert_dataset, ConvertConfig, CopyOptions, DatasetLayout, NoopProgressCallback, PrepError,
    ProgressCallback, ScanOptions, StageProgressCallback,
};
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress bar for one stage. Only changed files and errors get a
/// log line; everything else just advances the bar.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_prefix("Scanning");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl StageProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: &str, total_files: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>5}/{len} files  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");
        self.bar.set_length(total_files as u64);
        self.bar.set_style(style);
        self.bar.set_prefix(stage.to_string());
        self.bar.reset_eta();
    }

    fn on_file_start(&self, _index: usize, _total: usize, path: &Path) {
        self.bar.set_message(file_label(path));
    }

    fn on_file_complete(&self, _index: usize, _total: usize, path: &Path, changed: bool) {
        if changed {
            self.bar
                .println(format!("  {} {}", green("✓"), dim(&file_label(path))));
        }
        self.bar.inc(1);
    }

    fn on_file_error(&self, _index: usize, _total: usize, path: &Path, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let msg = if error.chars().count() > 80 {
            let cut: String = error.chars().take(79).collect();
            format!("{cut}\u{2026}")
        } else {
            error.to_string()
        };
        self.bar
            .println(format!("  {} {}  {}", red("✗"), file_label(path), red(&msg)));
    }

    fn on_stage_complete(&self, stage: &str, total_files: usize, changed: usize) {
        self.bar.finish_and_clear();
        let errors = self.errors.load(Ordering::SeqCst);
        if errors == 0 {
            eprintln!(
                "{} {stage}: {} of {total_files} files changed",
                green("✔"),
                bold(&changed.to_string())
            );
        } else {
            eprintln!(
                "{} {stage}: {} of {total_files} files changed  ({} errors)",
                red("✘"),
                bold(&changed.to_string()),
                red(&errors.to_string())
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Inventory the dataset under the current directory
  otsl-prep manifest

  # Copy the first 500 triples out of a bulk export
  otsl-prep copy --source-root /data/arxiv_tables

  # Drop tables with several captions or bodies
  otsl-prep prune --base /data/arxiv_tables

  # Whitespace clean-up
  otsl-prep strip-whitespace --html-dir tables/html --recursive
  otsl-prep collapse-spaces

  # Align captions with the LaTeX source, then convert
  otsl-prep fix-captions
  otsl-prep convert --html-dir tables/html --otsl-dir tables/otsl

ENVIRONMENT VARIABLES:
  OTSL_PREP_BASE     Dataset base directory (default: .)
  OTSL_PREP_PYTHON   Python interpreter with docling installed (default: python3)
  RUST_LOG           Overrides --verbose / --quiet log filtering

EXIT CODES:
  0  success (including "nothing to do")
  1  fatal processing error
  2  a required directory is missing
"#;

/// Curate scientific-table datasets and convert HTML tables to OTSL.
#[derive(Parser, Debug)]
#[command(
    name = "otsl-prep",
    version,
    about = "Curate scientific-table datasets and convert HTML tables to OTSL",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Dataset base directory holding tables/{html,tex_files,images}.
    #[arg(long, global = true, env = "OTSL_PREP_BASE", default_value = ".")]
    base: PathBuf,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "OTSL_PREP_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "OTSL_PREP_QUIET")]
    quiet: bool,

    /// Disable progress bar.
    #[arg(long, global = true, env = "OTSL_PREP_NO_PROGRESS")]
    no_progress: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a JSON manifest with one record per HTML table.
    Manifest {
        /// Manifest file to write.
        #[arg(short, long, default_value = DEFAULT_MANIFEST)]
        output: PathBuf,
    },

    /// Copy the first N manifest entries out of a bulk source tree.
    Copy {
        /// Manifest to read.
        #[arg(short, long, default_value = DEFAULT_MANIFEST)]
        manifest: PathBuf,

        /// Root the manifest paths are relative to.
        #[arg(long, env = "OTSL_PREP_SOURCE_ROOT")]
        source_root: PathBuf,

        /// Number of leading entries to copy.
        #[arg(long, default_value_t = DEFAULT_COPY_LIMIT)]
        limit: usize,

        #[arg(long, default_value = "table_html")]
        html_out: PathBuf,

        #[arg(long, default_value = "table_images")]
        image_out: PathBuf,

        #[arg(long, default_value = "table_tex")]
        tex_out: PathBuf,
    },

    /// Delete triples whose HTML has several <caption> or <tbody> elements.
    Prune,

    /// Remove newlines and typographic Unicode spaces from HTML files.
    StripWhitespace(ScanArgs),

    /// Remove every run of two or more spaces from HTML files.
    CollapseSpaces(ScanArgs),

    /// Move each caption to the side its LaTeX source puts it.
    FixCaptions,

    /// Convert every HTML table to a .otsl file.
    Convert {
        /// Directory of input HTML tables.
        #[arg(long, default_value = "../html")]
        html_dir: PathBuf,

        /// Directory receiving the .otsl files.
        #[arg(long, default_value = "../otsl")]
        otsl_dir: PathBuf,

        /// Python interpreter with docling installed.
        #[arg(long, env = "OTSL_PREP_PYTHON", default_value = DEFAULT_PYTHON)]
        python: String,
    },

    /// List the non-table tags used inside HTML tables.
    Tags {
        /// Directory of HTML tables to scan.
        #[arg(long, default_value = "table_html")]
        html_dir: PathBuf,
    },
}

#[derive(Args, Debug)]
struct ScanArgs {
    /// Directory containing .html files (default: <base>/tables/html).
    #[arg(long)]
    html_dir: Option<PathBuf>,

    /// Recurse into subdirectories when searching for .html files.
    #[arg(long)]
    recursive: bool,
}

impl Command {
    /// Stage log file mirrored alongside stdout, if the stage keeps one.
    fn log_file(&self) -> Option<&'static str> {
        match self {
            Command::Prune => Some(prune::PRUNE_LOG_FILE),
            Command::FixCaptions => Some(captions::CAPTION_LOG_FILE),
            _ => None,
        }
    }

    /// Whether the stage drives a progress callback at all.
    fn reports_progress(&self) -> bool {
        !matches!(self, Command::Manifest { .. } | Command::Tags { .. })
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli) {
        eprintln!("{} {e:#}", red("error:"));
        return ExitCode::from(1);
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e:#}", red("error:"));
            let code = e.downcast_ref::<PrepError>().map_or(1, PrepError::exit_code);
            ExitCode::from(code)
        }
    }
}

fn show_progress(cli: &Cli) -> bool {
    !cli.quiet && !cli.no_progress && cli.command.reports_progress()
}

// ── Logging setup ────────────────────────────────────────────────────────────
// Stdout gets WARN while the progress bar is up; the bar carries the
// per-file feedback. The stage log file always records INFO and above.
fn init_logging(cli: &Cli) -> Result<()> {
    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else if show_progress(cli) {
        "warn"
    } else {
        "info"
    };
    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(io::stdout)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)));

    let file_layer = match cli.command.log_file() {
        Some(name) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(name)
                .with_context(|| format!("Failed to open log file {name}"))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(LevelFilter::INFO),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layer)
        .init();
    Ok(())
}

fn progress_for(cli: &Cli) -> ProgressCallback {
    if show_progress(cli) {
        CliProgressCallback::new() as Arc<dyn StageProgressCallback>
    } else {
        Arc::new(NoopProgressCallback)
    }
}

fn run(cli: &Cli) -> Result<()> {
    let layout = DatasetLayout::new(&cli.base);
    let progress = progress_for(cli);

    match &cli.command {
        Command::Manifest { output } => {
            let records = manifest::build_manifest(&layout.html_dir())?;
            manifest::write_manifest(&records, output)?;
            summary(cli, &format!("{} records → {}", records.len(), output.display()));
        }

        Command::Copy {
            manifest: manifest_path,
            source_root,
            limit,
            html_out,
            image_out,
            tex_out,
        } => {
            let opts = CopyOptions {
                source_root: source_root.clone(),
                limit: *limit,
                html_out: html_out.clone(),
                image_out: image_out.clone(),
                tex_out: tex_out.clone(),
            };
            let s = copy::copy_selection(manifest_path, &opts, progress.as_ref())
                .context("Copy failed")?;
            summary(cli, &format!("copied {} records ({} files)", s.records, s.files));
        }

        Command::Prune => {
            let s = prune::prune_dataset(&layout, progress.as_ref())?;
            summary(
                cli,
                &format!(
                    "{} processed, {} with issues ({:.2}%), {} files removed",
                    s.processed,
                    s.with_issues,
                    s.issue_percentage(),
                    s.removed_files
                ),
            );
        }

        Command::StripWhitespace(args) => {
            let opts = scan_options(&layout, args);
            let s = whitespace::strip_whitespace_dir(&opts, progress.as_ref())?;
            summary(cli, &format!("modified {}/{} files", s.modified, s.total));
        }

        Command::CollapseSpaces(args) => {
            let opts = scan_options(&layout, args);
            let s = whitespace::collapse_spaces_dir(&opts, progress.as_ref())?;
            summary(cli, &format!("modified {}/{} files", s.modified, s.total));
        }

        Command::FixCaptions => {
            let s = captions::fix_caption_dataset(&layout, progress.as_ref())?;
            summary(
                cli,
                &format!(
                    "{} with captions, {} corrected (tex: {} before / {} after / {} none)",
                    s.with_captions, s.corrected, s.tex_before, s.tex_after, s.tex_none
                ),
            );
        }

        Command::Convert {
            html_dir,
            otsl_dir,
            python,
        } => {
            let config = ConvertConfig::builder()
                .html_dir(html_dir)
                .otsl_dir(otsl_dir)
                .python(python)
                .progress_callback(progress)
                .build()
                .context("Invalid configuration")?;
            let s = convert_dataset(&config).context("Conversion failed")?;
            summary(cli, &format!("{} files → {}", s.converted, otsl_dir.display()));
        }

        Command::Tags { html_dir } => {
            let report = tags::tag_inventory(html_dir)?;
            print_tag_report(&report);
        }
    }
    Ok(())
}

fn scan_options(layout: &DatasetLayout, args: &ScanArgs) -> ScanOptions {
    let dir = args.html_dir.clone().unwrap_or_else(|| layout.html_dir());
    ScanOptions::new(dir).recursive(args.recursive)
}

fn summary(cli: &Cli, line: &str) {
    if !cli.quiet {
        eprintln!("{} {line}", green("✔"));
    }
}

fn print_tag_report(report: &tags::TagReport) {
    for (path, file_tags) in &report.per_file {
        println!("\nProcessing file: {}", file_label(path));
        if file_tags.is_empty() {
            println!("  No non-table tags found");
        } else {
            let list: Vec<&str> = file_tags.iter().map(String::as_str).collect();
            println!("  Tags found: {list:?}");
        }
    }

    let rule = "=".repeat(50);
    println!("\n{rule}");
    println!("SUMMARY: All unique tags found across all files:");
    println!("{rule}");
    if report.all.is_empty() {
        println!("No non-table tags found in any files");
    }
    for tag in &report.all {
        println!("  <{tag}>");
    }
}
