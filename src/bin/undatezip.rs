use anyhow::Result;
use clap::Parser;
use datezip::{extract_archive, list_archive};
use std::path::PathBuf;

/// Extract a zip archive produced by datezip.
#[derive(Parser)]
#[command(name = "undatezip", version)]
struct Cli {
    archive: PathBuf,

    /// Where to extract to
    #[arg(default_value = ".")]
    output_dir: PathBuf,

    /// List the members instead of extracting them
    #[arg(short, long)]
    list: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if cli.list {
        for entry in list_archive(&cli.archive)? {
            println!("{:>12}  {}", entry.size, entry.path);
        }
        return Ok(());
    }

    println!("Extracting archive: {}", cli.archive.display());
    let entries = extract_archive(&cli.archive, &cli.output_dir)?;
    println!(
        "Successfully extracted {} files to {}",
        entries.len(),
        cli.output_dir.display()
    );

    Ok(())
}
