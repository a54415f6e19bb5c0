use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_BACKGROUND, DEFAULT_TILE_SIZE, HOVER_THRESHOLD_PX, MIN_ZOOM, READY_POLL_INTERVAL,
    TILE_PADDING, WHEEL_ZOOM_STEP,
};
use crate::error::{PanoviewError, Result};
use crate::projection::Projection;
use crate::texture::DevicePreference;
use crate::view::PixelFilter;

/// Complete viewer configuration, stored as TOML.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default)]
    pub textures: TextureConfig,
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(default)]
    pub loader: LoaderConfig,
}

impl ViewerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(contents).map_err(|e| PanoviewError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| PanoviewError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.textures.tile_size <= 2 * TILE_PADDING {
            return Err(PanoviewError::Config(format!(
                "textures.tile_size must exceed {}, got {}",
                2 * TILE_PADDING,
                self.textures.tile_size
            )));
        }
        if !self.view.min_zoom.is_finite() || self.view.min_zoom <= 0.0 {
            return Err(PanoviewError::Config(format!(
                "view.min_zoom must be positive, got {}",
                self.view.min_zoom
            )));
        }
        if !self.view.wheel_zoom_step.is_finite() || self.view.wheel_zoom_step <= 1.0 {
            return Err(PanoviewError::Config(format!(
                "view.wheel_zoom_step must exceed 1.0, got {}",
                self.view.wheel_zoom_step
            )));
        }
        if !self.view.hover_threshold_px.is_finite() || self.view.hover_threshold_px < 0.0 {
            return Err(PanoviewError::Config(
                "view.hover_threshold_px must be finite and not negative".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureConfig {
    /// Edge length of one tile in pixels.
    pub tile_size: u32,
    /// Overrides the maximum texture dimension reported by the backend.
    pub max_texture_dimension: Option<u32>,
    pub device: DevicePreference,
}

impl Default for TextureConfig {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            max_texture_dimension: None,
            device: DevicePreference::Auto,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Windows per image; lower values allow zooming further out.
    pub min_zoom: f64,
    pub hover_threshold_px: f64,
    pub wheel_zoom_step: f64,
    pub projection: Projection,
    pub pixel_filter: PixelFilter,
    pub background: [f32; 4],
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            min_zoom: MIN_ZOOM,
            hover_threshold_px: HOVER_THRESHOLD_PX,
            wheel_zoom_step: WHEEL_ZOOM_STEP,
            projection: Projection::default(),
            pixel_filter: PixelFilter::default(),
            background: DEFAULT_BACKGROUND,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub ready_poll_interval_ms: u64,
}

impl LoaderConfig {
    pub fn ready_poll_interval(&self) -> Duration {
        Duration::from_millis(self.ready_poll_interval_ms.max(1))
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            ready_poll_interval_ms: READY_POLL_INTERVAL.as_millis() as u64,
        }
    }
}
