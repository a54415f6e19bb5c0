use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use panoview_core::config::ViewerConfig;
use panoview_core::coords::{ImageLocation, WindowPoint};

use super::{decode_file, parse_point, ViewArgs};

#[derive(Args)]
pub struct ProbeArgs {
    /// Input image file
    pub file: PathBuf,

    #[command(flatten)]
    pub view: ViewArgs,

    /// Window point to look up (X,Y in window pixels, origin top-left)
    #[arg(long, value_parser = parse_point)]
    pub at: (f64, f64),
}

pub fn run(args: &ProbeArgs, config: &ViewerConfig) -> Result<()> {
    let (_, meta) = decode_file(&args.file)?;
    let view = args.view.build_view(config, &meta);
    let point = WindowPoint::new(args.at.0, args.at.1);

    let window = view.window_size();
    println!("Window:      {}x{}", window.width, window.height);
    println!("Zoom:        {:.3}", view.zoom());
    if view.is_360() {
        println!("Projection:  {}", view.projection());
        println!("Looking at:  {}", view.heading_pitch());
    } else {
        let c = view.center_oriented();
        println!("Center:      [{:.1}, {:.1}]", c.x, c.y);
    }
    println!("Point:       ({}, {})", point.x, point.y);

    match view.image_point_for_window(point) {
        ImageLocation::Flat { oriented, raw } => {
            println!("Upright:     [{:.2}, {:.2}]", oriented.x, oriented.y);
            println!("Stored:      [{:.2}, {:.2}]", raw.x, raw.y);
            let size = view.image_size();
            let inside = (0.0..size.width).contains(&oriented.x) && (0.0..size.height).contains(&oriented.y);
            println!("Inside:      {}", if inside { "yes" } else { "no" });
        }
        ImageLocation::Sphere(hp) => {
            println!("Direction:   {hp}");
        }
    }
    println!("Status:      {}", view.status_text(point));

    Ok(())
}
