mod commands;
mod summary;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use panoview_core::config::ViewerConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "panoview", about = "Tiled viewer toolkit for huge images and 360° panoramas")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Viewer config file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show image dimensions, orientation and panorama metadata
    Info(commands::info::InfoArgs),
    /// Print how an image is split into texture tiles
    Tiles(commands::tiles::TilesArgs),
    /// Report which image location lies under a window point
    Probe(commands::probe::ProbeArgs),
    /// Run the full load pipeline and report tiles and timing
    Load(commands::load::LoadArgs),
    /// Render a view of an image to a PNG file
    Render(commands::render::RenderArgs),
    /// Select a rectangle and save the upright crop
    Crop(commands::crop::CropArgs),
    /// Print or save the viewer configuration as TOML
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match cli.config {
        Some(ref path) => ViewerConfig::load(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?,
        None => ViewerConfig::default(),
    };

    match &cli.command {
        Commands::Info(args) => commands::info::run(args),
        Commands::Tiles(args) => commands::tiles::run(args, &config),
        Commands::Probe(args) => commands::probe::run(args, &config),
        Commands::Load(args) => commands::load::run(args, &config),
        Commands::Render(args) => commands::render::run(args, &config),
        Commands::Crop(args) => commands::crop::run(args, &config),
        Commands::Config(args) => commands::config::run(args, &config),
    }
}
