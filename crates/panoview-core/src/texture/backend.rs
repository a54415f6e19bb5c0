use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{PanoviewError, Result};
use crate::raster::PixelLayout;

use super::cpu::CpuBackend;

/// Which texture backend to prefer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DevicePreference {
    /// GPU when available, CPU otherwise.
    #[default]
    Auto,
    Cpu,
    Gpu,
}

impl fmt::Display for DevicePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DevicePreference::Auto => write!(f, "Auto"),
            DevicePreference::Cpu => write!(f, "CPU"),
            DevicePreference::Gpu => write!(f, "GPU"),
        }
    }
}

/// Sub-rectangle of a full image buffer, described like a GL unpack: the
/// buffer rows are `row_length` pixels long and the tile starts
/// `skip_pixels` in and `skip_rows` down.
#[derive(Clone, Copy)]
pub struct TileSource<'a> {
    pub pixels: &'a [u8],
    pub layout: PixelLayout,
    pub row_length: u32,
    pub skip_pixels: u32,
    pub skip_rows: u32,
    pub width: u32,
    pub height: u32,
}

impl<'a> TileSource<'a> {
    pub fn row_stride(&self) -> usize {
        self.row_length as usize * self.layout.bytes_per_pixel()
    }

    pub fn tile_row_bytes(&self) -> usize {
        self.width as usize * self.layout.bytes_per_pixel()
    }

    /// Byte offset of the tile's first pixel.
    pub fn offset(&self) -> usize {
        self.skip_rows as usize * self.row_stride()
            + self.skip_pixels as usize * self.layout.bytes_per_pixel()
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(PanoviewError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if self.skip_pixels + self.width > self.row_length {
            return Err(PanoviewError::InvalidRequest(format!(
                "tile columns {}..{} exceed row length {}",
                self.skip_pixels,
                self.skip_pixels + self.width,
                self.row_length
            )));
        }
        let expected = self.offset() + (self.height as usize - 1) * self.row_stride() + self.tile_row_bytes();
        if self.pixels.len() < expected {
            return Err(PanoviewError::BufferSize {
                expected,
                actual: self.pixels.len(),
            });
        }
        Ok(())
    }

    /// The tile's rows, each `tile_row_bytes` long.
    pub fn rows(&self) -> impl Iterator<Item = &'a [u8]> + '_ {
        let stride = self.row_stride();
        let len = self.tile_row_bytes();
        let start = self.offset();
        let pixels = self.pixels;
        (0..self.height as usize).map(move |r| {
            let begin = start + r * stride;
            &pixels[begin..begin + len]
        })
    }
}

/// Completion marker for previously submitted upload commands.
pub struct Fence {
    signaled: AtomicBool,
    source: FenceSource,
}

enum FenceSource {
    /// Signals after the given number of unsuccessful polls.
    Countdown(AtomicU32),
    #[cfg(feature = "gpu")]
    Submission {
        done: Arc<AtomicBool>,
        device: Arc<wgpu::Device>,
    },
}

impl Fence {
    pub fn signaled() -> Self {
        Self::after_polls(0)
    }

    pub fn after_polls(polls: u32) -> Self {
        Self {
            signaled: AtomicBool::new(false),
            source: FenceSource::Countdown(AtomicU32::new(polls)),
        }
    }

    #[cfg(feature = "gpu")]
    pub(crate) fn submission(done: Arc<AtomicBool>, device: Arc<wgpu::Device>) -> Self {
        Self {
            signaled: AtomicBool::new(false),
            source: FenceSource::Submission { done, device },
        }
    }

    /// Non-blocking poll.
    pub fn is_signaled(&self) -> bool {
        if self.signaled.load(Ordering::Acquire) {
            return true;
        }
        let now = match &self.source {
            FenceSource::Countdown(remaining) => remaining
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| v.checked_sub(1))
                .is_err(),
            #[cfg(feature = "gpu")]
            FenceSource::Submission { done, device } => {
                if !done.load(Ordering::Acquire) {
                    if let Err(e) = device.poll(wgpu::PollType::Poll) {
                        tracing::warn!("Device poll failed: {e}");
                    }
                }
                done.load(Ordering::Acquire)
            }
        };
        if now {
            self.signaled.store(true, Ordering::Release);
        }
        now
    }
}

impl fmt::Debug for Fence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fence")
            .field("signaled", &self.signaled.load(Ordering::Relaxed))
            .finish()
    }
}

pub(crate) enum TextureInner {
    /// Tightly packed tile pixels, or `None` when the backend discards them.
    Cpu(Option<Vec<u8>>),
    #[cfg(feature = "gpu")]
    Wgpu {
        texture: wgpu::Texture,
        view: wgpu::TextureView,
    },
}

/// Backend texture holding one tile plus the fence of its upload.
pub struct TileTexture {
    pub(crate) inner: TextureInner,
    fence: Fence,
    width: u32,
    height: u32,
    layout: PixelLayout,
}

impl TileTexture {
    pub(crate) fn new(inner: TextureInner, fence: Fence, width: u32, height: u32, layout: PixelLayout) -> Self {
        Self {
            inner,
            fence,
            width,
            height,
            layout,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    pub fn is_ready(&self) -> bool {
        self.fence.is_signaled()
    }

    /// Pixels of a CPU texture, row-major and tightly packed.
    pub fn cpu_pixels(&self) -> Option<&[u8]> {
        match &self.inner {
            TextureInner::Cpu(pixels) => pixels.as_deref(),
            #[cfg(feature = "gpu")]
            TextureInner::Wgpu { .. } => None,
        }
    }

    #[cfg(feature = "gpu")]
    pub fn wgpu_view(&self) -> Option<&wgpu::TextureView> {
        match &self.inner {
            TextureInner::Wgpu { view, .. } => Some(view),
            TextureInner::Cpu(_) => None,
        }
    }

    #[cfg(feature = "gpu")]
    pub fn wgpu_texture(&self) -> Option<&wgpu::Texture> {
        match &self.inner {
            TextureInner::Wgpu { texture, .. } => Some(texture),
            TextureInner::Cpu(_) => None,
        }
    }
}

impl fmt::Debug for TileTexture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileTexture")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("layout", &self.layout)
            .field("fence", &self.fence)
            .finish()
    }
}

/// Where tile textures live. Implementations must be usable from the
/// loader thread and the render thread.
pub trait TileBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Largest width or height of a single texture.
    fn max_texture_dimension(&self) -> u32;

    fn supports(&self, layout: PixelLayout) -> bool;

    /// Allocate a texture of the source rectangle's size, copy the rectangle
    /// into it and fence the copy.
    fn upload(&self, source: &TileSource<'_>) -> Result<TileTexture>;

    #[cfg(feature = "gpu")]
    fn as_wgpu(&self) -> Option<&super::wgpu_backend::WgpuBackend> {
        None
    }
}

/// Create the best available backend for the requested preference.
pub fn create_backend(preference: DevicePreference, max_dimension: Option<u32>) -> Arc<dyn TileBackend> {
    if preference != DevicePreference::Cpu {
        #[cfg(feature = "gpu")]
        {
            match super::wgpu_backend::WgpuBackend::new(max_dimension) {
                Ok(backend) => return Arc::new(backend),
                Err(e) => tracing::warn!("GPU textures unavailable ({e}), falling back to CPU"),
            }
        }
        #[cfg(not(feature = "gpu"))]
        {
            if preference == DevicePreference::Gpu {
                tracing::warn!("built without the `gpu` feature, falling back to CPU textures");
            }
        }
    }
    let backend = match max_dimension {
        Some(max) => CpuBackend::with_max_dimension(max),
        None => CpuBackend::new(),
    };
    tracing::info!("Texture backend: {}", backend.name());
    Arc::new(backend)
}
