//! Offscreen wgpu renderer for tiles uploaded by [`WgpuBackend`].

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use image::RgbaImage;
use wgpu::util::DeviceExt;

use crate::context::GraphicsContext;
use crate::error::{PanoviewError, Result};
use crate::math::to_padded_rows;
use crate::texture::wgpu_backend::WgpuBackend;
use crate::texture::{Tile, TiledTexture};
use crate::view::ViewState;

use super::{FrameStats, RenderStrategy, Renderer};

const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

// ---------------------------------------------------------------------------
// Uniform structs (must match tiles.wgsl exactly)
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct FrameUniform {
    view_rotation: [[f32; 4]; 3],
    pose_rotation: [[f32; 4]; 3],
    background: [f32; 4],
    selection: [f32; 4],
    window: [f32; 2],
    center: [f32; 2],
    image: [f32; 2],
    scale_window: f32,
    half_extent: f32,
    zoom: f32,
    image_per_px: f32,
    projection: u32,
    pixel_filter: u32,
    show_selection: u32,
    _pad: [u32; 3],
}

impl FrameUniform {
    fn for_view(view: &ViewState) -> Self {
        let window = view.window_size();
        let image = view.image_size();
        let center = view.center_oriented();
        let scale = view.aspect_scale();
        let selection = view.selection();
        let rect = selection.bounds();
        let show = RenderStrategy::for_view(view) == RenderStrategy::Rectangular && selection.is_visible();
        Self {
            view_rotation: to_padded_rows(&view.view_rotation()),
            pose_rotation: to_padded_rows(&view.pose_rotation()),
            background: view.background(),
            selection: [rect.left as f32, rect.top as f32, rect.right as f32, rect.bottom as f32],
            window: [window.width as f32, window.height as f32],
            center: [center.x as f32, center.y as f32],
            image: [image.width as f32, image.height as f32],
            scale_window: scale.window as f32,
            half_extent: (scale.image / 2.0 / view.zoom()) as f32,
            zoom: view.zoom() as f32,
            image_per_px: scale.image_per_window_pixel(view.zoom()) as f32,
            projection: view.projection().shader_index(),
            pixel_filter: view.pixel_filter().shader_index(),
            show_selection: u32::from(show),
            _pad: [0; 3],
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct TileUniform {
    tex_u: [f32; 4],
    tex_v: [f32; 4],
    bounds: [f32; 4],
    size: [f32; 2],
    channels: u32,
    _pad: u32,
}

impl TileUniform {
    fn for_tile(tile: &Tile, width: u32, height: u32, channels: u8) -> Self {
        let [u, v] = tile.tex_transform();
        let (min, max) = tile.oriented_bounds();
        Self {
            tex_u: [u[0] as f32, u[1] as f32, u[2] as f32, 0.0],
            tex_v: [v[0] as f32, v[1] as f32, v[2] as f32, 0.0],
            bounds: [min.x as f32, min.y as f32, max.x as f32, max.y as f32],
            size: [width as f32, height as f32],
            channels: u32::from(channels),
            _pad: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// WgpuRenderer
// ---------------------------------------------------------------------------

struct Target {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

pub struct WgpuRenderer {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    tile_layout: wgpu::BindGroupLayout,
    frame_bind_group: wgpu::BindGroup,
    frame_buffer: wgpu::Buffer,
    rect_pipeline: wgpu::RenderPipeline,
    sphere_pipeline: wgpu::RenderPipeline,
    target: Option<Target>,
}

impl WgpuRenderer {
    pub fn new(backend: &WgpuBackend) -> Self {
        let device = Arc::clone(backend.device());
        let queue = Arc::clone(backend.queue());

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("tiles"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/tiles.wgsl").into()),
        });

        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("frame"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let tile_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tile"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
            ],
        });

        let frame_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("frame"),
            contents: bytemuck::bytes_of(&FrameUniform::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame"),
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("tiles"),
            bind_group_layouts: &[&frame_layout, &tile_layout],
            immediate_size: 0,
        });

        let pipeline = |label: &str, vs: &str, fs: &str, buffers: &[wgpu::VertexBufferLayout<'_>], topology: wgpu::PrimitiveTopology| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &module,
                    entry_point: Some(vs),
                    compilation_options: Default::default(),
                    buffers,
                },
                primitive: wgpu::PrimitiveState {
                    topology,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module: &module,
                    entry_point: Some(fs),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: TARGET_FORMAT,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                multiview_mask: None,
                cache: None,
            })
        };

        let quad_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x2,
                offset: 0,
                shader_location: 0,
            }],
        };
        let rect_pipeline = pipeline(
            "rect",
            "vs_rect",
            "fs_rect",
            &[quad_layout],
            wgpu::PrimitiveTopology::TriangleStrip,
        );
        let sphere_pipeline = pipeline(
            "sphere",
            "vs_sphere",
            "fs_sphere",
            &[],
            wgpu::PrimitiveTopology::TriangleList,
        );

        Self {
            device,
            queue,
            tile_layout,
            frame_bind_group,
            frame_buffer,
            rect_pipeline,
            sphere_pipeline,
            target: None,
        }
    }

    /// Renderer on the device behind `context`, which must use wgpu textures.
    pub fn for_context(context: &GraphicsContext) -> Result<Self> {
        let backend = context.backend();
        let wgpu = backend.as_wgpu().ok_or_else(|| {
            PanoviewError::GpuError(format!("context '{}' uses {} textures", context.label(), backend.name()))
        })?;
        Ok(Self::new(wgpu))
    }

    fn ensure_target(&mut self, width: u32, height: u32) {
        let fits = self
            .target
            .as_ref()
            .is_some_and(|t| t.width == width && t.height == height);
        if fits {
            return;
        }
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("frame"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.target = Some(Target {
            texture,
            view,
            width,
            height,
        });
    }

    /// Copy the last painted frame back to system memory.
    pub fn read_frame(&self) -> Result<RgbaImage> {
        let target = self
            .target
            .as_ref()
            .ok_or_else(|| PanoviewError::InvalidRequest("nothing has been painted yet".into()))?;
        let (width, height) = (target.width, target.height);
        let row_bytes = width * 4;
        let padded = row_bytes.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT) * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frame readback"),
            size: u64::from(padded) * u64::from(height),
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let mut enc = self.device.create_command_encoder(&Default::default());
        enc.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(enc.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::sync_channel(1);
        slice.map_async(wgpu::MapMode::Read, move |r| {
            tx.send(r).ok();
        });
        self.device.poll(wgpu::PollType::wait_indefinitely()).ok();
        rx.recv()
            .map_err(|_| PanoviewError::GpuError("readback channel closed".into()))?
            .map_err(|e| PanoviewError::GpuError(format!("buffer mapping failed: {e}")))?;

        let data = slice.get_mapped_range();
        let mut pixels = Vec::with_capacity((row_bytes * height) as usize);
        for row in data.chunks_exact(padded as usize) {
            pixels.extend_from_slice(&row[..row_bytes as usize]);
        }
        drop(data);
        staging.unmap();
        let actual = pixels.len();
        RgbaImage::from_raw(width, height, pixels).ok_or(PanoviewError::BufferSize {
            expected: (row_bytes * height) as usize,
            actual,
        })
    }
}

/// GPU resources of one ready tile for the current frame.
struct TileDraw {
    bind_group: wgpu::BindGroup,
    quad: Option<wgpu::Buffer>,
}

impl Renderer for WgpuRenderer {
    fn paint(&mut self, view: &ViewState, texture: Option<&TiledTexture>) -> Result<FrameStats> {
        let window = view.window_size();
        let strategy = RenderStrategy::for_view(view);
        self.queue
            .write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&FrameUniform::for_view(view)));

        let mut draws = Vec::new();
        let mut pending = 0;
        for tile in texture.map(TiledTexture::tiles).unwrap_or_default() {
            let Some(tex) = tile.texture().filter(|_| tile.is_ready()) else {
                pending += 1;
                continue;
            };
            let Some(tex_view) = tex.wgpu_view() else {
                pending += 1;
                continue;
            };
            let uniform = TileUniform::for_tile(tile, tex.width(), tex.height(), tex.layout().channels);
            let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("tile"),
                contents: bytemuck::bytes_of(&uniform),
                usage: wgpu::BufferUsages::UNIFORM,
            });
            let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("tile"),
                layout: &self.tile_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(tex_view),
                    },
                ],
            });
            let quad = (strategy == RenderStrategy::Rectangular).then(|| {
                let positions = tile
                    .quad()
                    .map(|v| [v.position.x as f32, v.position.y as f32]);
                self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("tile quad"),
                    contents: bytemuck::cast_slice(&positions),
                    usage: wgpu::BufferUsages::VERTEX,
                })
            });
            draws.push(TileDraw { bind_group, quad });
        }

        self.ensure_target(window.width as u32, window.height as u32);
        let target = self
            .target
            .as_ref()
            .ok_or_else(|| PanoviewError::GpuError("no render target".into()))?;
        let [r, g, b, a] = view.background().map(f64::from);
        let mut enc = self.device.create_command_encoder(&Default::default());
        {
            let pipeline = match strategy {
                RenderStrategy::Rectangular => &self.rect_pipeline,
                RenderStrategy::Spherical => &self.sphere_pipeline,
            };
            let mut pass = enc.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("tiles"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &self.frame_bind_group, &[]);
            for draw in &draws {
                pass.set_bind_group(1, &draw.bind_group, &[]);
                match &draw.quad {
                    Some(quad) => {
                        pass.set_vertex_buffer(0, quad.slice(..));
                        pass.draw(0..4, 0..1);
                    }
                    None => pass.draw(0..3, 0..1),
                }
            }
        }
        self.queue.submit(std::iter::once(enc.finish()));

        Ok(FrameStats {
            strategy,
            tiles_drawn: draws.len(),
            tiles_pending: pending,
        })
    }
}
