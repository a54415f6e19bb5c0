//! Tile geometry: where each tile sits in the raw image and where its quad
//! lands in oriented pixel space.

use crate::consts::TILE_PADDING;
use crate::coords::{ImagePoint, RawPoint, Size};
use crate::error::{PanoviewError, Result};
use crate::orientation::Orientation;

/// Overlap pixels on each side of a tile, taken from its neighbours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Padding {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

/// A tile's rectangle in raw pixels, padding included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRegion {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
    pub padding: Padding,
}

impl TileRegion {
    /// Raw rectangle this tile is responsible for drawing, as
    /// `(left, top, right, bottom)` with exclusive right/bottom.
    pub fn display_bounds(&self) -> (u32, u32, u32, u32) {
        (
            self.left + self.padding.left,
            self.top + self.padding.top,
            self.left + self.width - self.padding.right,
            self.top + self.height - self.padding.bottom,
        )
    }
}

/// One corner of a tile quad.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadVertex {
    pub position: ImagePoint,
    pub tex: [f32; 2],
}

/// Tile regions in raster order.
#[derive(Debug, Clone, PartialEq)]
pub struct TilePlan {
    pub regions: Vec<TileRegion>,
    pub columns: usize,
    pub rows: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    start: u32,
    len: u32,
    pad_before: u32,
    pad_after: u32,
}

/// Split one axis into overlapping spans. Consecutive spans overlap by
/// twice the padding so the displayed parts meet exactly.
fn axis_spans(extent: u32, tile_size: u32) -> Vec<Span> {
    if extent <= tile_size {
        return vec![Span {
            start: 0,
            len: extent,
            pad_before: 0,
            pad_after: 0,
        }];
    }
    let step = tile_size - 2 * TILE_PADDING;
    let mut spans = Vec::new();
    let mut start = 0;
    loop {
        let len = tile_size.min(extent - start);
        let last = start + len == extent;
        spans.push(Span {
            start,
            len,
            pad_before: if start == 0 { 0 } else { TILE_PADDING },
            pad_after: if last { 0 } else { TILE_PADDING },
        });
        if last {
            return spans;
        }
        start += step;
    }
}

/// Plan the tiles for a `width × height` raw image. Images that fit within
/// `max_dimension` on both axes become a single tile.
pub fn plan_tiles(width: u32, height: u32, tile_size: u32, max_dimension: u32) -> Result<TilePlan> {
    if width == 0 || height == 0 {
        return Err(PanoviewError::InvalidDimensions { width, height });
    }
    if tile_size > max_dimension || tile_size <= 2 * TILE_PADDING {
        return Err(PanoviewError::HardwareLimit {
            tile_size,
            max_dimension,
        });
    }
    if width <= max_dimension && height <= max_dimension {
        return Ok(TilePlan {
            regions: vec![TileRegion {
                left: 0,
                top: 0,
                width,
                height,
                padding: Padding::default(),
            }],
            columns: 1,
            rows: 1,
        });
    }

    let columns = axis_spans(width, tile_size);
    let rows = axis_spans(height, tile_size);
    let regions = rows
        .iter()
        .flat_map(|row| {
            columns.iter().map(move |col| TileRegion {
                left: col.start,
                top: row.start,
                width: col.len,
                height: row.len,
                padding: Padding {
                    left: col.pad_before,
                    top: row.pad_before,
                    right: col.pad_after,
                    bottom: row.pad_after,
                },
            })
        })
        .collect();
    Ok(TilePlan {
        regions,
        columns: columns.len(),
        rows: rows.len(),
    })
}

/// Quad for a region: each displayed raw corner is carried into oriented
/// space together with its own texture coordinate. Vertex order is
/// top-left, bottom-left, top-right, bottom-right in raw space, which forms
/// a triangle strip.
pub fn quad_for_region(region: &TileRegion, orientation: Orientation, raw: Size) -> [QuadVertex; 4] {
    let (x0, y0, x1, y1) = region.display_bounds();
    let w = region.width as f32;
    let h = region.height as f32;
    let u0 = region.padding.left as f32 / w;
    let u1 = 1.0 - region.padding.right as f32 / w;
    let v0 = region.padding.top as f32 / h;
    let v1 = 1.0 - region.padding.bottom as f32 / h;

    let corner = |x: u32, y: u32, u: f32, v: f32| QuadVertex {
        position: orientation.oriented_for_raw(RawPoint::new(f64::from(x), f64::from(y)), raw),
        tex: [u, v],
    };
    [
        corner(x0, y0, u0, v0),
        corner(x0, y1, u0, v1),
        corner(x1, y0, u1, v0),
        corner(x1, y1, u1, v1),
    ]
}
