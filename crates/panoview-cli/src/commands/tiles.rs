use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use panoview_core::config::ViewerConfig;
use panoview_core::texture::{create_backend, plan_tiles};

use super::parse_size;
use crate::summary::print_tile_plan;

#[derive(Args)]
pub struct TilesArgs {
    /// Input image file (only its header is read)
    #[arg(required_unless_present = "size", conflicts_with = "size")]
    pub file: Option<PathBuf>,

    /// Plan for an image of this size instead of a file (WIDTHxHEIGHT)
    #[arg(long, value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// Tile edge length (defaults to the configured one)
    #[arg(long)]
    pub tile_size: Option<u32>,

    /// Maximum texture dimension (defaults to the configured or device limit)
    #[arg(long)]
    pub max_texture: Option<u32>,

    /// List every tile region
    #[arg(long)]
    pub regions: bool,
}

pub fn run(args: &TilesArgs, config: &ViewerConfig) -> Result<()> {
    let (source, (width, height)) = if let Some(ref path) = args.file {
        let dims = image::ImageReader::open(path)
            .and_then(|r| r.with_guessed_format())
            .with_context(|| format!("Failed to open {}", path.display()))?
            .into_dimensions()
            .with_context(|| format!("Failed to read dimensions of {}", path.display()))?;
        (path.display().to_string(), dims)
    } else if let Some(size) = args.size {
        ("synthetic".to_string(), size)
    } else {
        bail!("Either an input file or --size is required");
    };

    let tile_size = args.tile_size.unwrap_or(config.textures.tile_size);
    let (max_dimension, device) = match args.max_texture.or(config.textures.max_texture_dimension) {
        Some(max) => (max, "configured".to_string()),
        None => {
            let backend = create_backend(config.textures.device, None);
            (backend.max_texture_dimension(), backend.name().to_string())
        }
    };

    let plan = plan_tiles(width, height, tile_size, max_dimension)
        .with_context(|| format!("Failed to plan tiles for {width}x{height}"))?;

    print_tile_plan(&source, (width, height), tile_size, max_dimension, &device, &plan, args.regions);
    Ok(())
}
