use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use web_time::Instant;

use volume_stitch::{
    Interpolation, OverlapPolicy, SingleInputPolicy, StitchOptions, TrimProbe, VolumeLoader,
    VolumeStitcher, VolumeWriter, preview,
};

#[derive(Parser)]
#[command(name = "volume-stitch")]
#[command(about = "Stitch overlapping volumes into one continuous volume along z")]
struct Cli {
    /// Images to stitch (NIfTI files or DICOM directories), in order of priority
    #[arg(short, long, num_args = 1.., required = true)]
    images: Vec<String>,

    /// Output NIfTI file
    #[arg(short, long)]
    output: PathBuf,

    /// Slices ignored at both ends of every image
    #[arg(short, long, default_value_t = 0)]
    margin: usize,

    /// Average values in overlap areas instead of keeping the first image
    #[arg(short, long)]
    averaging: bool,

    /// Use nearest neighbour instead of linear interpolation
    #[arg(long)]
    nearest: bool,

    /// Crop using the central column only instead of any covered voxel
    #[arg(long)]
    central_probe: bool,

    /// Pass a single image through instead of failing
    #[arg(long)]
    allow_single: bool,

    /// Also write a PNG of the central coronal slice
    #[arg(long)]
    preview: Option<PathBuf>,
}

impl Cli {
    fn stitch_options(&self) -> StitchOptions {
        StitchOptions::default()
            .with_margin(self.margin)
            .with_overlap(if self.averaging {
                OverlapPolicy::Average
            } else {
                OverlapPolicy::FirstContributor
            })
            .with_interpolation(if self.nearest {
                Interpolation::Nearest
            } else {
                Interpolation::Linear
            })
            .with_trim_probe(if self.central_probe {
                TrimProbe::CentralColumn
            } else {
                TrimProbe::AnySample
            })
            .with_single_input(if self.allow_single {
                SingleInputPolicy::PassThrough
            } else {
                SingleInputPolicy::Reject
            })
    }
}

/// Image arguments may themselves hold whitespace separated lists.
fn split_image_list(args: &[String]) -> Vec<PathBuf> {
    args.iter()
        .flat_map(|arg| arg.split_whitespace())
        .map(PathBuf::from)
        .collect()
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let files = split_image_list(&cli.images);

    let start = Instant::now();
    info!("stitching {} images...", files.len());

    let volumes = files
        .iter()
        .map(|file| {
            VolumeLoader::load(file).with_context(|| format!("Failed to load {}", file.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let stitched = VolumeStitcher::new(cli.stitch_options())
        .stitch(&volumes)
        .context("Failed to stitch images")?;

    VolumeWriter::save(&stitched, &cli.output)
        .with_context(|| format!("Failed to save {}", cli.output.display()))?;

    if let Some(path) = &cli.preview {
        preview::save_preview(&stitched, path)
            .with_context(|| format!("Failed to save preview {}", path.display()))?;
    }

    info!("done. took {} ms", start.elapsed().as_millis());
    Ok(())
}
