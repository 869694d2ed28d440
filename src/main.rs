//! epub-combine - merge EPUB files into one

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use epub_combine::util::natural_cmp;
use epub_combine::{CombineConfig, Combiner, HeadingSource, NoProgress, Progress};

#[derive(Parser)]
#[command(name = "epub-combine")]
#[command(version, about = "Merge several EPUB files into one", long_about = None)]
#[command(after_help = "EXAMPLES:
    epub-combine -o all.epub a.epub b.epub          Combine in the given order
    epub-combine --sort -o box.epub vol*.epub       Vol 2 before Vol 10
    epub-combine --title \"Box Set\" -o out.epub *.epub")]
struct Cli {
    /// Input EPUB files, in reading order
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<PathBuf>,

    /// Output EPUB file
    #[arg(short, long, value_name = "OUTPUT")]
    output: PathBuf,

    /// Title of the combined book (default: "Combined EPUB")
    #[arg(short, long)]
    title: Option<String>,

    /// Heading of the generated table of contents
    #[arg(long)]
    heading: Option<String>,

    /// Take the TOC heading from the first input's own TOC page
    #[arg(long)]
    heading_from_source: bool,

    /// Label TOC entries "Section N" instead of by chapter title
    #[arg(long)]
    section_labels: bool,

    /// Keep the inputs' own navigation documents as chapters
    #[arg(long)]
    keep_nav: bool,

    /// Keep the inputs' own TOC pages as chapters
    #[arg(long)]
    keep_toc: bool,

    /// Sort inputs by file name in natural order first
    #[arg(long)]
    sort: bool,

    /// Load options from a JSON file (flags override it)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Suppress progress messages
    #[arg(short, long)]
    quiet: bool,

    /// Log per-source decisions
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "warn,epub_combine=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn run(cli: Cli) -> Result<(), String> {
    let config = build_config(&cli)?;

    let mut inputs = cli.inputs;
    if cli.sort {
        inputs.sort_by(|a, b| natural_cmp(&file_name(a), &file_name(b)));
    }

    let mut print_progress = |pct: u8, msg: &str| eprintln!("[{pct:3}%] {msg}");
    let mut silent = NoProgress;
    let progress: &mut dyn Progress = if cli.quiet {
        &mut silent
    } else {
        &mut print_progress
    };

    let written = Combiner::with_config(config)
        .combine(&inputs, &cli.output, progress)
        .map_err(|e| e.to_string())?;

    if !cli.quiet {
        println!("{}", written.display());
    }
    Ok(())
}

fn build_config(cli: &Cli) -> Result<CombineConfig, String> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => CombineConfig::default(),
    };

    if let Some(title) = &cli.title {
        config.title = title.clone();
    }
    if let Some(heading) = &cli.heading {
        config.toc_heading = heading.clone();
    }
    if cli.heading_from_source {
        config.heading_source = HeadingSource::Source;
    }
    if cli.section_labels {
        config.use_chapter_titles = false;
    }
    if cli.keep_nav {
        config.exclude_nav = false;
    }
    if cli.keep_toc {
        config.exclude_toc = false;
    }

    Ok(config)
}

fn load_config(path: &Path) -> Result<CombineConfig, String> {
    let text = fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?;
    serde_json::from_str(&text).map_err(|e| format!("{}: {e}", path.display()))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
