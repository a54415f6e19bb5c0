//! wgpu-based tile textures (Metal / Vulkan / DX12).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{PanoviewError, Result};
use crate::raster::{BitDepth, PixelLayout};

use super::backend::{Fence, TextureInner, TileBackend, TileSource, TileTexture};

fn texture_format(layout: PixelLayout) -> Option<wgpu::TextureFormat> {
    if layout.depth != BitDepth::U8 {
        return None;
    }
    match layout.channels {
        1 => Some(wgpu::TextureFormat::R8Unorm),
        2 => Some(wgpu::TextureFormat::Rg8Unorm),
        4 => Some(wgpu::TextureFormat::Rgba8Unorm),
        _ => None,
    }
}

pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    adapter_name: String,
    max_dimension: u32,
}

impl WgpuBackend {
    /// Open the default high-performance adapter. `max_override` lowers the
    /// texture size limit below what the hardware reports.
    pub fn new(max_override: Option<u32>) -> std::result::Result<Self, String> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| format!("No suitable GPU adapter found: {e}"))?;

        let adapter_name = adapter.get_info().name.clone();
        let hardware_max = adapter.limits().max_texture_dimension_2d;
        tracing::info!("GPU adapter: {adapter_name} (max texture {hardware_max})");

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("panoview"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits {
                max_texture_dimension_2d: hardware_max,
                ..wgpu::Limits::default()
            },
            ..Default::default()
        }))
        .map_err(|e| format!("Failed to create GPU device: {e}"))?;

        let max_dimension = max_override.map_or(hardware_max, |m| m.min(hardware_max));
        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            adapter_name,
            max_dimension,
        })
    }

    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.device
    }

    pub fn queue(&self) -> &Arc<wgpu::Queue> {
        &self.queue
    }
}

impl TileBackend for WgpuBackend {
    fn name(&self) -> &str {
        "wgpu"
    }

    fn max_texture_dimension(&self) -> u32 {
        self.max_dimension
    }

    fn supports(&self, layout: PixelLayout) -> bool {
        texture_format(layout).is_some()
    }

    fn upload(&self, source: &TileSource<'_>) -> Result<TileTexture> {
        source.validate()?;
        let format = texture_format(source.layout)
            .ok_or_else(|| PanoviewError::UnsupportedLayout(source.layout.to_string()))?;
        let size = wgpu::Extent3d {
            width: source.width,
            height: source.height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("tile"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        // Rows are read straight out of the full image with its own stride.
        let offset = source.offset();
        let stride = source.row_stride();
        let end = offset + (source.height as usize - 1) * stride + source.tile_row_bytes();
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &source.pixels[offset..end],
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(stride as u32),
                rows_per_image: Some(source.height),
            },
            size,
        );
        self.queue.submit(std::iter::empty());

        let done = Arc::new(AtomicBool::new(false));
        let signal = Arc::clone(&done);
        self.queue.on_submitted_work_done(move || {
            signal.store(true, Ordering::Release);
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(TileTexture::new(
            TextureInner::Wgpu { texture, view },
            Fence::submission(done, Arc::clone(&self.device)),
            source.width,
            source.height,
            source.layout,
        ))
    }

    fn as_wgpu(&self) -> Option<&WgpuBackend> {
        Some(self)
    }
}
