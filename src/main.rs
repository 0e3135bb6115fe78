use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use patchgrid::{extract_patches, DEFAULT_TARGET_PATCHES};
use tracing_subscriber::EnvFilter;

/// Divide an image into square patches for tiled processing.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// The image to divide into patches.
    #[arg(default_value = "drone_01.JPG")]
    image: PathBuf,

    /// Number of patches to produce.
    #[arg(short = 'n', long, default_value_t = DEFAULT_TARGET_PATCHES)]
    target: u32,

    /// Output folder for the patch files (defaults to a `patch` directory
    /// next to the image).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Save a copy of the source image with the planned grid drawn on top.
    #[cfg(feature = "drawing")]
    #[arg(long)]
    preview: Option<PathBuf>,
}

impl Cli {
    fn output_dir(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| {
            self.image
                .parent()
                .unwrap_or_else(|| Path::new(""))
                .join("patch")
        })
    }
}

fn run(cli: &Cli) -> Result<()> {
    let output_dir = cli.output_dir();
    let written = extract_patches(&cli.image, cli.target, Some(&output_dir))
        .with_context(|| format!("failed to divide {} into patches", cli.image.display()))?;
    println!(
        "Created {written} square patches in {}",
        output_dir.display()
    );

    #[cfg(feature = "drawing")]
    if let Some(preview) = &cli.preview {
        use patchgrid::{debug::save_image_with_layout, drawing::OverlayConfig, plan, ImageDimensions};

        let image = image::open(&cli.image).context("failed to open image for the preview")?;
        let layout = plan(ImageDimensions::from(&image), cli.target);
        save_image_with_layout(&image, &layout, preview, &OverlayConfig::default())
            .with_context(|| format!("failed to save grid preview to {}", preview.display()))?;
    }

    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    run(&Cli::parse())
}
