use crate::consts::CPU_MAX_TEXTURE_DIMENSION;
use crate::error::Result;
use crate::raster::PixelLayout;

use super::backend::{Fence, TextureInner, TileBackend, TileSource, TileTexture};

/// Textures kept in system memory. Used when no GPU is available, for
/// headless rendering, and for exercising the loader without a device.
#[derive(Debug, Clone)]
pub struct CpuBackend {
    max_dimension: u32,
    fence_latency: u32,
    retain_pixels: bool,
}

impl CpuBackend {
    pub fn new() -> Self {
        Self::with_max_dimension(CPU_MAX_TEXTURE_DIMENSION)
    }

    pub fn with_max_dimension(max_dimension: u32) -> Self {
        Self {
            max_dimension,
            fence_latency: 0,
            retain_pixels: true,
        }
    }

    /// Fences report unsignaled for this many polls, like an upload that
    /// is still in flight.
    pub fn fence_latency(mut self, polls: u32) -> Self {
        self.fence_latency = polls;
        self
    }

    /// Skip the pixel copy; tiles keep their geometry and fences only.
    pub fn retain_pixels(mut self, retain: bool) -> Self {
        self.retain_pixels = retain;
        self
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl TileBackend for CpuBackend {
    fn name(&self) -> &str {
        if self.retain_pixels {
            "CPU"
        } else {
            "CPU (geometry only)"
        }
    }

    fn max_texture_dimension(&self) -> u32 {
        self.max_dimension
    }

    fn supports(&self, layout: PixelLayout) -> bool {
        (1..=4).contains(&layout.channels)
    }

    fn upload(&self, source: &TileSource<'_>) -> Result<TileTexture> {
        source.validate()?;
        let pixels = self.retain_pixels.then(|| {
            let mut packed = Vec::with_capacity(source.tile_row_bytes() * source.height as usize);
            for row in source.rows() {
                packed.extend_from_slice(row);
            }
            packed
        });
        Ok(TileTexture::new(
            TextureInner::Cpu(pixels),
            Fence::after_polls(self.fence_latency),
            source.width,
            source.height,
            source.layout,
        ))
    }
}
