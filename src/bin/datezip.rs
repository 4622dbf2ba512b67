use anyhow::{Context, Result, bail};
use clap::Parser;
use datezip::{ArchiveConfig, Archiver, DEFAULT_OUTPUT_DIR, collect_files};
use std::path::PathBuf;

/// Bundle files into a zip archive named after today's date.
#[derive(Parser)]
#[command(name = "datezip", version)]
struct Cli {
    /// JSON job file with `archive_path`, `output_dir` and `files`
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory the files are relative to (overrides the config)
    #[arg(short, long)]
    base_dir: Option<PathBuf>,

    /// Directory the archive is written to; must already exist
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Archive every regular file under the base directory
    #[arg(long, conflicts_with = "files")]
    walk: bool,

    /// Print a JSON manifest of the archived files instead of the name
    #[arg(long)]
    manifest: bool,

    /// Files to archive, relative to the base directory
    files: Vec<String>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = cli
        .config
        .as_deref()
        .map(ArchiveConfig::load)
        .transpose()?;

    let Some(base_dir) = cli
        .base_dir
        .or_else(|| config.as_ref().map(|c| c.archive_path.clone()))
    else {
        bail!("No base directory given; pass --base-dir or --config");
    };

    let output_dir = cli
        .output_dir
        .or_else(|| config.as_ref().map(|c| c.output_dir.clone()))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

    let files = if cli.walk {
        collect_files(&base_dir, &output_dir)?
    } else if !cli.files.is_empty() {
        cli.files
    } else {
        match config.map(|c| c.files) {
            Some(Some(files)) => files,
            // Walk with the effective output dir, which flags may override.
            Some(None) => collect_files(&base_dir, &output_dir)?,
            None => Vec::new(),
        }
    };

    let summary = Archiver::new(&output_dir)
        .create_summary(&files, &base_dir)
        .with_context(|| format!("Failed to archive {}", base_dir.display()))?;

    if cli.manifest {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", summary.file_name);
    }

    Ok(())
}
