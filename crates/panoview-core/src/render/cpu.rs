use image::{Rgba, RgbaImage};
use rayon::prelude::*;

use crate::coords::{ndc_for_window, projected_for_ndc, ImagePoint, WindowPoint};
use crate::error::Result;
use crate::raster::{BitDepth, PixelLayout};
use crate::texture::{Tile, TiledTexture};
use crate::view::{PixelFilter, ViewState};

use super::{equirect_point, FrameStats, RenderStrategy, Renderer};

const SELECTION_BORDER: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
const OUTSIDE_SELECTION_DIM: f32 = 0.5;

/// Software renderer drawing into an RGBA frame. Needs tiles uploaded by
/// a CPU backend that retains pixels; other tiles count as pending.
#[derive(Debug, Default)]
pub struct CpuRenderer {
    frame: RgbaImage,
}

impl CpuRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame(&self) -> &RgbaImage {
        &self.frame
    }

    pub fn into_frame(self) -> RgbaImage {
        self.frame
    }
}

/// A ready tile prepared for lookups.
struct TileSampler<'a> {
    min: ImagePoint,
    max: ImagePoint,
    tex: [[f64; 3]; 2],
    pixels: &'a [u8],
    width: usize,
    height: usize,
    layout: PixelLayout,
}

impl<'a> TileSampler<'a> {
    fn new(tile: &'a Tile) -> Option<Self> {
        if !tile.is_ready() {
            return None;
        }
        let texture = tile.texture()?;
        let (min, max) = tile.oriented_bounds();
        Some(Self {
            min,
            max,
            tex: tile.tex_transform(),
            pixels: texture.cpu_pixels()?,
            width: texture.width() as usize,
            height: texture.height() as usize,
            layout: texture.layout(),
        })
    }

    fn contains(&self, p: ImagePoint) -> bool {
        p.x >= self.min.x && p.x < self.max.x && p.y >= self.min.y && p.y < self.max.y
    }

    fn fetch(&self, x: i64, y: i64) -> [f32; 4] {
        let x = x.clamp(0, self.width as i64 - 1) as usize;
        let y = y.clamp(0, self.height as i64 - 1) as usize;
        let bpp = self.layout.bytes_per_pixel();
        let offset = (y * self.width + x) * bpp;
        let px = &self.pixels[offset..offset + bpp];
        let sample = |i: usize| -> f32 {
            match self.layout.depth {
                BitDepth::U8 => f32::from(px[i]) / 255.0,
                BitDepth::U16 => f32::from(u16::from_ne_bytes([px[2 * i], px[2 * i + 1]])) / 65535.0,
                BitDepth::F32 => f32::from_ne_bytes([px[4 * i], px[4 * i + 1], px[4 * i + 2], px[4 * i + 3]]),
            }
        };
        match self.layout.channels {
            1 => {
                let g = sample(0);
                [g, g, g, 1.0]
            }
            2 => {
                let g = sample(0);
                [g, g, g, sample(1)]
            }
            3 => [sample(0), sample(1), sample(2), 1.0],
            _ => [sample(0), sample(1), sample(2), sample(3)],
        }
    }

    fn sample(&self, p: ImagePoint, filter: PixelFilter) -> [f32; 4] {
        let u = self.tex[0][0] * p.x + self.tex[0][1] * p.y + self.tex[0][2];
        let v = self.tex[1][0] * p.x + self.tex[1][1] * p.y + self.tex[1][2];
        let x = u * self.width as f64 - 0.5;
        let y = v * self.height as f64 - 0.5;
        let (x0, y0) = (x.floor(), y.floor());
        let (fx, fy) = ((x - x0) as f32, (y - y0) as f32);
        let (ix, iy) = (x0 as i64, y0 as i64);

        match filter {
            PixelFilter::Sharp => self.fetch((u * self.width as f64).floor() as i64, (v * self.height as f64).floor() as i64),
            PixelFilter::Bilinear => self.weighted(ix, iy, &[1.0 - fx, fx], &[1.0 - fy, fy], 0),
            PixelFilter::Hermite => {
                let (sx, sy) = (smoothstep(fx), smoothstep(fy));
                self.weighted(ix, iy, &[1.0 - sx, sx], &[1.0 - sy, sy], 0)
            }
            PixelFilter::CatmullRom => {
                let c = self.weighted(ix, iy, &catmull_rom(fx), &catmull_rom(fy), 1);
                c.map(|v| v.clamp(0.0, 1.0))
            }
        }
    }

    /// Separable weighted sum over texels starting `back` texels before
    /// `(ix, iy)`.
    fn weighted(&self, ix: i64, iy: i64, wx: &[f32], wy: &[f32], back: i64) -> [f32; 4] {
        let mut acc = [0.0f32; 4];
        for (j, &w_y) in wy.iter().enumerate() {
            for (i, &w_x) in wx.iter().enumerate() {
                let texel = self.fetch(ix - back + i as i64, iy - back + j as i64);
                let w = w_x * w_y;
                for c in 0..4 {
                    acc[c] += texel[c] * w;
                }
            }
        }
        acc
    }
}

fn smoothstep(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

fn catmull_rom(t: f32) -> [f32; 4] {
    let t2 = t * t;
    let t3 = t2 * t;
    [
        0.5 * (-t3 + 2.0 * t2 - t),
        0.5 * (3.0 * t3 - 5.0 * t2 + 2.0),
        0.5 * (-3.0 * t3 + 4.0 * t2 + t),
        0.5 * (t3 - t2),
    ]
}

/// Border within one window pixel of the selection edges `a`..`b`, dimmed
/// outside it.
fn selection_overlay(c: [f32; 4], wp: WindowPoint, a: WindowPoint, b: WindowPoint, inside: bool) -> [f32; 4] {
    let near_box = wp.x >= a.x - 1.0 && wp.x <= b.x + 1.0 && wp.y >= a.y - 1.0 && wp.y <= b.y + 1.0;
    let near_edge = (wp.x - a.x).abs() < 1.0
        || (wp.x - b.x).abs() < 1.0
        || (wp.y - a.y).abs() < 1.0
        || (wp.y - b.y).abs() < 1.0;
    if near_box && near_edge {
        SELECTION_BORDER
    } else if inside {
        c
    } else {
        [
            c[0] * OUTSIDE_SELECTION_DIM,
            c[1] * OUTSIDE_SELECTION_DIM,
            c[2] * OUTSIDE_SELECTION_DIM,
            c[3],
        ]
    }
}

fn to_rgba8(c: [f32; 4]) -> Rgba<u8> {
    Rgba(c.map(|v| (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8))
}

/// Composite over the background.
fn over(c: [f32; 4], bg: [f32; 4]) -> [f32; 4] {
    let a = c[3];
    [
        c[0] * a + bg[0] * (1.0 - a),
        c[1] * a + bg[1] * (1.0 - a),
        c[2] * a + bg[2] * (1.0 - a),
        a + bg[3] * (1.0 - a),
    ]
}

impl Renderer for CpuRenderer {
    fn paint(&mut self, view: &ViewState, texture: Option<&TiledTexture>) -> Result<FrameStats> {
        let window = view.window_size();
        let (w, h) = (window.width as u32, window.height as u32);
        if self.frame.dimensions() != (w, h) {
            self.frame = RgbaImage::new(w, h);
        }
        let strategy = RenderStrategy::for_view(view);
        let background = view.background();

        let samplers: Vec<TileSampler<'_>> = texture
            .map(|t| t.tiles().iter().filter_map(TileSampler::new).collect())
            .unwrap_or_default();
        let total = texture.map_or(0, TiledTexture::len);
        let stats = FrameStats {
            strategy,
            tiles_drawn: samplers.len(),
            tiles_pending: total - samplers.len(),
        };
        if w == 0 || h == 0 {
            return Ok(stats);
        }

        let filter = view.pixel_filter();
        let image = view.image_size();
        let rotation = view.view_rotation();
        let pose = view.pose_rotation();
        let projection = view.projection();
        let scale = *view.aspect_scale();
        let zoom = view.zoom();

        let selection = view.selection();
        let overlay = (strategy == RenderStrategy::Rectangular && selection.is_visible()).then(|| {
            let rect = selection.bounds();
            let a = view.window_for_oriented(ImagePoint::new(f64::from(rect.left), f64::from(rect.top)));
            let b = view.window_for_oriented(ImagePoint::new(f64::from(rect.right), f64::from(rect.bottom)));
            (rect, a, b)
        });

        let lookup = |p: ImagePoint| samplers.iter().find(|s| s.contains(p)).map(|s| s.sample(p, filter));

        self.frame
            .par_chunks_mut(w as usize * 4)
            .enumerate()
            .for_each(|(y, row)| {
                for x in 0..w as usize {
                    let wp = WindowPoint::new(x as f64 + 0.5, y as f64 + 0.5);
                    let sampled = match strategy {
                        RenderStrategy::Rectangular => lookup(view.oriented_for_window(wp)),
                        RenderStrategy::Spherical => {
                            let ndc = ndc_for_window(wp, window, &scale);
                            let dir = projection.direction_for_projected(projected_for_ndc(ndc, zoom));
                            lookup(equirect_point(rotation * dir, &pose, image))
                        }
                    };
                    let color = match (sampled, overlay) {
                        (Some(c), Some((rect, a, b))) => {
                            let inside = rect.contains(view.oriented_for_window(wp));
                            over(selection_overlay(c, wp, a, b, inside), background)
                        }
                        (Some(c), None) => over(c, background),
                        (None, _) => background,
                    };
                    row[x * 4..x * 4 + 4].copy_from_slice(&to_rgba8(color).0);
                }
            });

        Ok(stats)
    }
}
