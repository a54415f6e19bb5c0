use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use panoview_core::config::ViewerConfig;
use panoview_core::coords::WindowPoint;
use panoview_core::view::ViewState;

use super::{decode_file, parse_rect};

#[derive(Args)]
pub struct CropArgs {
    /// Input image file
    pub file: PathBuf,

    /// Selection in upright image pixels (LEFT,TOP,RIGHT,BOTTOM)
    #[arg(long, value_parser = parse_rect)]
    pub rect: [u32; 4],

    /// Output file path (format from the extension)
    #[arg(short, long, default_value = "crop.png")]
    pub output: PathBuf,
}

pub fn run(args: &CropArgs, config: &ViewerConfig) -> Result<()> {
    let (image, meta) = decode_file(&args.file)?;
    if meta.is_360 {
        bail!("{} is a 360° image; selections only apply to flat images", args.file.display());
    }

    // A window the size of the upright image maps window pixels one to one
    // onto image pixels, so the selection can be driven like a pointer.
    let mut view = ViewState::from_config(&config.view, meta.width, meta.height);
    view.set_image(&meta);

    let [left, top, right, bottom] = args.rect;
    view.begin_selection(Some(WindowPoint::new(f64::from(left), f64::from(top))));
    view.pointer_pressed(WindowPoint::new(f64::from(right), f64::from(bottom)));
    let Some(rect) = view.commit_selection() else {
        bail!("Selection {left},{top},{right},{bottom} is empty");
    };

    let crop = image
        .crop_oriented(rect)
        .with_context(|| format!("Failed to crop {rect}"))?;
    crop.to_dynamic()?
        .save(&args.output)
        .with_context(|| format!("Failed to save {}", args.output.display()))?;

    println!("Selection:   {rect}");
    println!("Crop size:   {}x{}", crop.width(), crop.height());
    println!("\nOutput saved to {}", args.output.display());
    Ok(())
}
