use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use super::decode_file;

#[derive(Args)]
pub struct InfoArgs {
    /// Input image file
    pub file: PathBuf,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let (image, meta) = decode_file(&args.file)?;

    println!("File:        {}", args.file.display());
    println!("Format:      {}", meta.format);
    println!("Pixels:      {}", meta.layout);
    println!("Stored size: {}x{}", meta.raw_width, meta.raw_height);
    println!("Upright:     {}x{}", meta.width, meta.height);
    println!("Orientation: {}", meta.orientation);
    println!("360° image:  {}", if meta.is_360 { "yes" } else { "no" });

    if let Some(ref pose) = meta.pose {
        println!(
            "Pose:        heading {:.1}°, pitch {:.1}°, roll {:.1}°",
            pose.heading_deg, pose.pitch_deg, pose.roll_deg
        );
    }

    let total_mb = image.pixels().len() as f64 / (1024.0 * 1024.0);
    println!("Data size:   {:.1} MB", total_mb);

    Ok(())
}
