use crate::context::CurrentContext;
use crate::coords::{ImagePoint, Size};
use crate::error::{PanoviewError, Result};
use crate::orientation::Orientation;
use crate::raster::{DecodedImage, PixelLayout};

use super::backend::{TileSource, TileTexture};
use super::layout::{plan_tiles, quad_for_region, QuadVertex, TileRegion};

/// One texture-sized piece of an image.
#[derive(Debug)]
pub struct Tile {
    region: TileRegion,
    quad: [QuadVertex; 4],
    texture: Option<TileTexture>,
}

impl Tile {
    fn new(region: TileRegion, orientation: Orientation, raw: Size) -> Self {
        Self {
            quad: quad_for_region(&region, orientation, raw),
            region,
            texture: None,
        }
    }

    pub fn region(&self) -> &TileRegion {
        &self.region
    }

    pub fn quad(&self) -> &[QuadVertex; 4] {
        &self.quad
    }

    pub fn texture(&self) -> Option<&TileTexture> {
        self.texture.as_ref()
    }

    pub fn is_uploaded(&self) -> bool {
        self.texture.is_some()
    }

    /// Copy this tile's rectangle out of `image` into a new texture and
    /// fence the upload. Any previous texture is released.
    pub fn upload(&mut self, context: &CurrentContext<'_>, image: &DecodedImage) -> Result<()> {
        let source = TileSource {
            pixels: image.pixels(),
            layout: image.layout(),
            row_length: image.width(),
            skip_pixels: self.region.left,
            skip_rows: self.region.top,
            width: self.region.width,
            height: self.region.height,
        };
        self.texture = Some(context.backend().upload(&source)?);
        Ok(())
    }

    /// Non-blocking; false until the upload fence has signaled.
    pub fn is_ready(&self) -> bool {
        self.texture.as_ref().is_some_and(TileTexture::is_ready)
    }

    /// Axis-aligned oriented-pixel rectangle this tile draws, as
    /// `(min, max)`.
    pub fn oriented_bounds(&self) -> (ImagePoint, ImagePoint) {
        let xs = self.quad.map(|v| v.position.x);
        let ys = self.quad.map(|v| v.position.y);
        let min = |v: [f64; 4]| v.into_iter().fold(f64::INFINITY, f64::min);
        let max = |v: [f64; 4]| v.into_iter().fold(f64::NEG_INFINITY, f64::max);
        (
            ImagePoint::new(min(xs), min(ys)),
            ImagePoint::new(max(xs), max(ys)),
        )
    }

    pub fn contains(&self, p: ImagePoint) -> bool {
        let (lo, hi) = self.oriented_bounds();
        p.x >= lo.x && p.x < hi.x && p.y >= lo.y && p.y < hi.y
    }

    /// Affine map from oriented pixels to texture coordinates, as two rows
    /// `[a, b, c]` with `u = a·x + b·y + c`.
    pub fn tex_transform(&self) -> [[f64; 3]; 2] {
        let [p0, p1, p2, _] = self.quad.map(|v| v.position);
        let [t0, t1, t2, _] = self.quad.map(|v| [f64::from(v.tex[0]), f64::from(v.tex[1])]);
        // Columns of `a` are the quad edges from the first corner.
        let a = [[p1.x - p0.x, p2.x - p0.x], [p1.y - p0.y, p2.y - p0.y]];
        let det = a[0][0] * a[1][1] - a[0][1] * a[1][0];
        let inv = [
            [a[1][1] / det, -a[0][1] / det],
            [-a[1][0] / det, a[0][0] / det],
        ];
        let t = [[t1[0] - t0[0], t2[0] - t0[0]], [t1[1] - t0[1], t2[1] - t0[1]]];
        let mut rows = [[0.0; 3]; 2];
        for (r, row) in rows.iter_mut().enumerate() {
            let a_ = t[r][0] * inv[0][0] + t[r][1] * inv[1][0];
            let b_ = t[r][0] * inv[0][1] + t[r][1] * inv[1][1];
            *row = [a_, b_, t0[r] - a_ * p0.x - b_ * p0.y];
        }
        rows
    }

    /// Texture coordinate of an oriented pixel position.
    pub fn tex_coord(&self, p: ImagePoint) -> [f64; 2] {
        let m = self.tex_transform();
        [
            m[0][0] * p.x + m[0][1] * p.y + m[0][2],
            m[1][0] * p.x + m[1][1] * p.y + m[1][2],
        ]
    }
}

/// A decoded image held as one or more tiles.
#[derive(Debug)]
pub struct TiledTexture {
    tiles: Vec<Tile>,
    columns: usize,
    rows: usize,
    orientation: Orientation,
    raw_width: u32,
    raw_height: u32,
    layout: PixelLayout,
}

impl TiledTexture {
    /// Lay out tiles for `image` without uploading anything.
    pub fn plan(image: &DecodedImage, tile_size: u32, max_dimension: u32) -> Result<Self> {
        let plan = plan_tiles(image.width(), image.height(), tile_size, max_dimension)?;
        let orientation = image.orientation();
        let raw = image.raw_size();
        Ok(Self {
            tiles: plan
                .regions
                .into_iter()
                .map(|region| Tile::new(region, orientation, raw))
                .collect(),
            columns: plan.columns,
            rows: plan.rows,
            orientation,
            raw_width: image.width(),
            raw_height: image.height(),
            layout: image.layout(),
        })
    }

    /// Plan and upload every tile on the current context.
    pub fn build(context: &CurrentContext<'_>, image: &DecodedImage, tile_size: u32) -> Result<Self> {
        let backend = context.backend();
        if !backend.supports(image.layout()) {
            return Err(PanoviewError::UnsupportedLayout(image.layout().to_string()));
        }
        let mut texture = Self::plan(image, tile_size, backend.max_texture_dimension())?;
        for tile in &mut texture.tiles {
            tile.upload(context, image)?;
        }
        Ok(texture)
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn tiles_mut(&mut self) -> &mut [Tile] {
        &mut self.tiles
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// `(columns, rows)` of the tile grid.
    pub fn grid(&self) -> (usize, usize) {
        (self.columns, self.rows)
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn raw_size(&self) -> (u32, u32) {
        (self.raw_width, self.raw_height)
    }

    pub fn oriented_size(&self) -> (u32, u32) {
        self.orientation.oriented_size(self.raw_width, self.raw_height)
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    pub fn ready_count(&self) -> usize {
        self.tiles.iter().filter(|t| t.is_ready()).count()
    }

    /// True once every tile's upload has completed.
    pub fn all_ready(&self) -> bool {
        self.tiles.iter().all(Tile::is_ready)
    }

    /// The tile drawing the given oriented pixel.
    pub fn tile_at(&self, p: ImagePoint) -> Option<&Tile> {
        self.tiles.iter().find(|t| t.contains(p))
    }
}
