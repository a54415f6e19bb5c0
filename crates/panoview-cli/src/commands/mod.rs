pub mod config;
pub mod crop;
pub mod info;
pub mod load;
pub mod probe;
pub mod render;
pub mod tiles;

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use panoview_core::config::ViewerConfig;
use panoview_core::context::GraphicsContext;
use panoview_core::coords::HeadingPitch;
use panoview_core::loader::{
    resolve_metadata, Decoder, ImageCrateDecoder, ImageLoader, ImageMetadata, LoadEventKind,
    LoadSource, LoadedImage, LoaderOptions,
};
use panoview_core::projection::Projection;
use panoview_core::raster::DecodedImage;
use panoview_core::texture::{create_backend, DevicePreference};
use panoview_core::view::{PixelFilter, ViewState};

#[derive(Clone, Copy, ValueEnum)]
pub enum ProjectionArg {
    Gnomonic,
    Stereographic,
    Equidistant,
    Equirectangular,
}

impl From<ProjectionArg> for Projection {
    fn from(arg: ProjectionArg) -> Self {
        match arg {
            ProjectionArg::Gnomonic => Projection::Gnomonic,
            ProjectionArg::Stereographic => Projection::Stereographic,
            ProjectionArg::Equidistant => Projection::Equidistant,
            ProjectionArg::Equirectangular => Projection::Equirectangular,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum FilterArg {
    Sharp,
    Bilinear,
    Hermite,
    CatmullRom,
}

impl From<FilterArg> for PixelFilter {
    fn from(arg: FilterArg) -> Self {
        match arg {
            FilterArg::Sharp => PixelFilter::Sharp,
            FilterArg::Bilinear => PixelFilter::Bilinear,
            FilterArg::Hermite => PixelFilter::Hermite,
            FilterArg::CatmullRom => PixelFilter::CatmullRom,
        }
    }
}

/// View parameters shared by the commands that look through a window.
#[derive(Args)]
pub struct ViewArgs {
    /// Window size in pixels (WIDTHxHEIGHT)
    #[arg(long, default_value = "1280x720", value_parser = parse_size)]
    pub window: (u32, u32),

    /// Zoom factor in windows per image (flat) or projection scale (360°)
    #[arg(long)]
    pub zoom: Option<f64>,

    /// View center as fractions of the upright image (X,Y), flat images only
    #[arg(long, value_parser = parse_point)]
    pub center: Option<(f64, f64)>,

    /// Viewing heading in degrees, 360° images only
    #[arg(long, allow_negative_numbers = true)]
    pub heading: Option<f64>,

    /// Viewing pitch in degrees, 360° images only
    #[arg(long, allow_negative_numbers = true)]
    pub pitch: Option<f64>,

    /// Panorama projection (defaults to the configured one)
    #[arg(long, value_enum)]
    pub projection: Option<ProjectionArg>,

    /// Pixel filter (defaults to the configured one)
    #[arg(long, value_enum)]
    pub filter: Option<FilterArg>,
}

impl ViewArgs {
    /// A view of `metadata` in the requested window, configured from
    /// `config` and then overridden by the command line.
    pub fn build_view(&self, config: &ViewerConfig, metadata: &ImageMetadata) -> ViewState {
        let (width, height) = self.window;
        let mut view = ViewState::from_config(&config.view, width, height);
        view.set_image(metadata);

        if let Some(projection) = self.projection {
            view.set_projection(projection.into());
        }
        if let Some(filter) = self.filter {
            view.set_pixel_filter(filter.into());
        }
        if let Some(zoom) = self.zoom {
            view.set_zoom(zoom);
        }
        if metadata.is_360 {
            if self.center.is_some() {
                tracing::warn!("--center is ignored for 360° images, use --heading/--pitch");
            }
            if self.heading.is_some() || self.pitch.is_some() {
                let current = view.heading_pitch();
                view.set_heading_pitch(HeadingPitch::new(
                    self.heading.unwrap_or(current.heading),
                    self.pitch.unwrap_or(current.pitch),
                ));
            }
        } else {
            if self.heading.is_some() || self.pitch.is_some() {
                tracing::warn!("--heading/--pitch are ignored for flat images, use --center");
            }
            if let Some((x, y)) = self.center {
                view.set_center(x, y);
            }
        }
        view
    }
}

/// Parse `WIDTHxHEIGHT`.
pub fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let w: u32 = w.trim().parse().map_err(|e| format!("bad width '{w}': {e}"))?;
    let h: u32 = h.trim().parse().map_err(|e| format!("bad height '{h}': {e}"))?;
    if w == 0 || h == 0 {
        return Err(format!("size must be non-zero, got {w}x{h}"));
    }
    Ok((w, h))
}

/// Parse `X,Y`.
pub fn parse_point(s: &str) -> Result<(f64, f64), String> {
    let values = parse_list::<f64>(s)?;
    match values[..] {
        [x, y] => Ok((x, y)),
        _ => Err(format!("expected X,Y, got '{s}'")),
    }
}

/// Parse `LEFT,TOP,RIGHT,BOTTOM`.
pub fn parse_rect(s: &str) -> Result<[u32; 4], String> {
    let values = parse_list::<u32>(s)?;
    values
        .try_into()
        .map_err(|_| format!("expected LEFT,TOP,RIGHT,BOTTOM, got '{s}'"))
}

fn parse_list<T: std::str::FromStr>(s: &str) -> Result<Vec<T>, String>
where
    T::Err: std::fmt::Display,
{
    s.split(',')
        .map(|v| {
            v.trim()
                .parse::<T>()
                .map_err(|e| format!("bad value '{}': {e}", v.trim()))
        })
        .collect()
}

/// Decode a file on the calling thread and interpret its metadata.
pub fn decode_file(path: &Path) -> Result<(DecodedImage, ImageMetadata)> {
    let source = LoadSource::File(path.to_path_buf());
    let image = ImageCrateDecoder
        .decode(&source)
        .with_context(|| format!("Failed to decode {}", path.display()))?;
    let metadata = resolve_metadata(&source.name(), &image);
    Ok((image, metadata))
}

/// Texture context for `config`, optionally forcing a device.
pub fn graphics_context(config: &ViewerConfig, device: Option<DevicePreference>) -> GraphicsContext {
    let backend = create_backend(
        device.unwrap_or(config.textures.device),
        config.textures.max_texture_dimension,
    );
    GraphicsContext::primary(backend)
}

/// Run the loader on `path` until its textures are ready, showing a
/// progress bar. Returns the loaded image and the elapsed time.
pub fn load_with_progress(
    context: &GraphicsContext,
    config: &ViewerConfig,
    path: &Path,
) -> Result<(LoadedImage, Duration)> {
    let loader = ImageLoader::spawn(context, Arc::new(ImageCrateDecoder), LoaderOptions::from_config(config))
        .context("Failed to start the loader thread")?;

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg:20} [{bar:40}] {pos}%")?
            .progress_chars("=> "),
    );

    let started = Instant::now();
    let token = loader.open_file(path);
    let loaded = loop {
        let Some(event) = loader.next_event_timeout(Duration::from_millis(100)) else {
            if !loader.is_running() {
                pb.abandon_with_message("Failed");
                bail!("Loader thread stopped while loading {}", path.display());
            }
            continue;
        };
        if event.request != token {
            continue;
        }
        match event.kind {
            LoadEventKind::SizeKnown { width, height, is_360 } => {
                tracing::debug!("{width}x{height}, 360°: {is_360}");
            }
            LoadEventKind::Progress { stage, percent } => {
                pb.set_message(stage.to_string());
                pb.set_position(u64::from(percent));
            }
            LoadEventKind::Ready(loaded) => {
                pb.finish_with_message("Done");
                break *loaded;
            }
            LoadEventKind::Failed { reason } => {
                pb.abandon_with_message("Failed");
                bail!("Failed to load {}: {reason}", path.display());
            }
        }
    };
    let elapsed = started.elapsed();
    loader.shutdown();
    Ok((loaded, elapsed))
}
