use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use image::RgbaImage;
use panoview_core::config::ViewerConfig;
use panoview_core::context::GraphicsContext;
use panoview_core::render::{CpuRenderer, FrameStats, Renderer};
use panoview_core::texture::{DevicePreference, TiledTexture};
use panoview_core::view::ViewState;

use super::{graphics_context, load_with_progress, ViewArgs};

#[derive(Args)]
pub struct RenderArgs {
    /// Input image file
    pub file: PathBuf,

    #[command(flatten)]
    pub view: ViewArgs,

    /// Render with wgpu instead of the CPU renderer
    #[arg(long)]
    pub gpu: bool,

    /// Output PNG path
    #[arg(short, long, default_value = "view.png")]
    pub output: PathBuf,
}

pub fn run(args: &RenderArgs, config: &ViewerConfig) -> Result<()> {
    if args.gpu && !cfg!(feature = "gpu") {
        bail!("--gpu needs panoview built with the `gpu` feature");
    }

    // The CPU renderer samples tile pixels directly, so it needs CPU textures.
    let device = if args.gpu {
        DevicePreference::Gpu
    } else {
        DevicePreference::Cpu
    };
    let context = graphics_context(config, Some(device));
    let (loaded, elapsed) = load_with_progress(&context, config, &args.file)?;
    let view = args.view.build_view(config, &loaded.metadata);

    let (frame, stats) = if args.gpu {
        render_gpu(&context, &view, &loaded.texture)?
    } else {
        let mut renderer = CpuRenderer::new();
        let stats = renderer.paint(&view, Some(&loaded.texture))?;
        (renderer.into_frame(), stats)
    };

    frame
        .save(&args.output)
        .with_context(|| format!("Failed to save {}", args.output.display()))?;

    println!("Loaded in:   {:.2}s", elapsed.as_secs_f64());
    println!("Strategy:    {}", stats.strategy);
    println!("Tiles:       {} drawn, {} pending", stats.tiles_drawn, stats.tiles_pending);
    println!("Frame:       {}x{}", frame.width(), frame.height());
    println!("\nOutput saved to {}", args.output.display());
    Ok(())
}

#[cfg(feature = "gpu")]
fn render_gpu(context: &GraphicsContext, view: &ViewState, texture: &TiledTexture) -> Result<(RgbaImage, FrameStats)> {
    use panoview_core::render::WgpuRenderer;

    let mut renderer = WgpuRenderer::for_context(context).context("GPU rendering unavailable")?;
    let stats = renderer.paint(view, Some(texture))?;
    Ok((renderer.read_frame()?, stats))
}

#[cfg(not(feature = "gpu"))]
fn render_gpu(_context: &GraphicsContext, _view: &ViewState, _texture: &TiledTexture) -> Result<(RgbaImage, FrameStats)> {
    bail!("--gpu needs panoview built with the `gpu` feature")
}
