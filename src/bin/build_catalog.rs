//! Scan a directory of recordings (`ni3.mp3`, `lv4.mp3`, ...) and write the
//! catalog manifest the trainer loads at startup.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;

use tingli::audio::Catalog;

#[derive(Parser)]
#[command(name = "build_catalog", about = "Write an audio catalog manifest for a recordings directory")]
struct Args {
    /// Directory holding one recording per syllable and tone
    dir: PathBuf,

    #[arg(short, long, help = "Manifest path (default: <dir>/catalog.json)")]
    output: Option<PathBuf>,

    #[arg(long, default_value = ".mp3", help = "Recording file suffix")]
    suffix: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let catalog = Catalog::scan_dir(&args.dir, &args.suffix)?;
    if catalog.is_empty() {
        bail!(
            "no recordings ending in {} found in {}",
            args.suffix,
            args.dir.display()
        );
    }

    let output = args.output.unwrap_or_else(|| args.dir.join("catalog.json"));
    fs::write(&output, catalog.to_manifest_string()?)
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!("{} entries -> {}", catalog.len(), output.display());
    Ok(())
}
