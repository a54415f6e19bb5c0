use std::fmt;

use image::{DynamicImage, ImageBuffer, ImageFormat, Luma};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::coords::{ImagePoint, Size};
use crate::error::{PanoviewError, Result};
use crate::orientation::Orientation;
use crate::selection::PixelRect;

/// Storage type of one channel sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BitDepth {
    U8,
    U16,
    F32,
}

impl BitDepth {
    pub fn bytes_per_sample(self) -> usize {
        match self {
            BitDepth::U8 => 1,
            BitDepth::U16 => 2,
            BitDepth::F32 => 4,
        }
    }
}

impl fmt::Display for BitDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BitDepth::U8 => write!(f, "8-bit"),
            BitDepth::U16 => write!(f, "16-bit"),
            BitDepth::F32 => write!(f, "32-bit float"),
        }
    }
}

/// Channel count plus sample type of an interleaved pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelLayout {
    pub channels: u8,
    pub depth: BitDepth,
}

impl PixelLayout {
    pub const fn new(channels: u8, depth: BitDepth) -> Self {
        Self { channels, depth }
    }

    pub fn bytes_per_pixel(&self) -> usize {
        usize::from(self.channels) * self.depth.bytes_per_sample()
    }
}

impl fmt::Display for PixelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.channels {
            1 => "Gray",
            2 => "GrayAlpha",
            3 => "RGB",
            4 => "RGBA",
            _ => "?",
        };
        write!(f, "{name} {}", self.depth)
    }
}

/// Container format the pixels were decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SourceFormat {
    Jpeg,
    Png,
    Tiff,
    WebP,
    Bmp,
    Gif,
    Hdr,
    OpenExr,
    #[default]
    Other,
}

impl From<ImageFormat> for SourceFormat {
    fn from(format: ImageFormat) -> Self {
        match format {
            ImageFormat::Jpeg => SourceFormat::Jpeg,
            ImageFormat::Png => SourceFormat::Png,
            ImageFormat::Tiff => SourceFormat::Tiff,
            ImageFormat::WebP => SourceFormat::WebP,
            ImageFormat::Bmp => SourceFormat::Bmp,
            ImageFormat::Gif => SourceFormat::Gif,
            ImageFormat::Hdr => SourceFormat::Hdr,
            ImageFormat::OpenExr => SourceFormat::OpenExr,
            _ => SourceFormat::Other,
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Metadata as handed over by the decoder, before interpretation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawMetadata {
    pub exif_orientation: Option<u32>,
    pub xmp: Option<String>,
}

/// A decoded raster, immutable once built.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    width: u32,
    height: u32,
    layout: PixelLayout,
    format: SourceFormat,
    pixels: Vec<u8>,
    metadata: RawMetadata,
}

impl DecodedImage {
    pub fn new(width: u32, height: u32, layout: PixelLayout, pixels: Vec<u8>) -> Result<Self> {
        if width < 1 || height < 1 {
            return Err(PanoviewError::InvalidDimensions { width, height });
        }
        if !(1..=4).contains(&layout.channels) {
            return Err(PanoviewError::UnsupportedLayout(format!(
                "{} channels",
                layout.channels
            )));
        }
        let expected = width as usize * height as usize * layout.bytes_per_pixel();
        if pixels.len() != expected {
            return Err(PanoviewError::BufferSize {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            layout,
            format: SourceFormat::Other,
            pixels,
            metadata: RawMetadata::default(),
        })
    }

    pub fn with_format(mut self, format: SourceFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_metadata(mut self, metadata: RawMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn raw_size(&self) -> Size {
        Size::from_pixels(self.width, self.height)
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    pub fn format(&self) -> SourceFormat {
        self.format
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn metadata(&self) -> &RawMetadata {
        &self.metadata
    }

    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.layout.bytes_per_pixel()
    }

    /// Orientation from the EXIF code; invalid or missing codes mean identity.
    pub fn orientation(&self) -> Orientation {
        self.metadata
            .exif_orientation
            .and_then(Orientation::from_exif)
            .unwrap_or_default()
    }

    pub fn oriented_size(&self) -> (u32, u32) {
        self.orientation().oriented_size(self.width, self.height)
    }

    /// Equirectangular panoramas are exactly twice as wide as tall once upright.
    pub fn is_360(&self) -> bool {
        let (w, h) = self.oriented_size();
        w == 2 * h
    }

    /// Convert 16-bit and float samples to 8-bit.
    pub fn into_depth_u8(self) -> Self {
        let pixels = match self.layout.depth {
            BitDepth::U8 => return self,
            BitDepth::U16 => self
                .pixels
                .par_chunks_exact(2)
                .map(|b| (u16::from_ne_bytes([b[0], b[1]]) >> 8) as u8)
                .collect(),
            BitDepth::F32 => self
                .pixels
                .par_chunks_exact(4)
                .map(|b| {
                    let v = f32::from_ne_bytes([b[0], b[1], b[2], b[3]]);
                    (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
                })
                .collect(),
        };
        Self {
            layout: PixelLayout::new(self.layout.channels, BitDepth::U8),
            pixels,
            ..self
        }
    }

    /// Append an opaque alpha channel to RGB pixels.
    pub fn into_rgba(self) -> Self {
        if self.layout.channels != 3 {
            return self;
        }
        let sample = self.layout.depth.bytes_per_sample();
        let opaque: Vec<u8> = match self.layout.depth {
            BitDepth::U8 => vec![u8::MAX],
            BitDepth::U16 => u16::MAX.to_ne_bytes().to_vec(),
            BitDepth::F32 => 1.0f32.to_ne_bytes().to_vec(),
        };
        let pixels = self
            .pixels
            .par_chunks_exact(3 * sample)
            .flat_map_iter(|px| px.iter().copied().chain(opaque.iter().copied()))
            .collect();
        Self {
            layout: PixelLayout::new(4, self.layout.depth),
            pixels,
            ..self
        }
    }

    /// Copy a rectangle given in oriented pixels into a new upright image.
    pub fn crop_oriented(&self, rect: PixelRect) -> Result<Self> {
        let orientation = self.orientation();
        let (ow, oh) = self.oriented_size();
        let right = rect.right.min(ow);
        let bottom = rect.bottom.min(oh);
        if rect.left >= right || rect.top >= bottom {
            return Err(PanoviewError::InvalidDimensions {
                width: right.saturating_sub(rect.left),
                height: bottom.saturating_sub(rect.top),
            });
        }
        let width = right - rect.left;
        let height = bottom - rect.top;
        let bpp = self.layout.bytes_per_pixel();
        let raw = self.raw_size();
        let src_row = self.row_bytes();
        let mut pixels = vec![0u8; width as usize * height as usize * bpp];

        pixels
            .par_chunks_mut(width as usize * bpp)
            .enumerate()
            .for_each(|(row, out)| {
                let oy = f64::from(rect.top) + row as f64 + 0.5;
                for col in 0..width as usize {
                    let ox = f64::from(rect.left) + col as f64 + 0.5;
                    let p = orientation.raw_for_oriented(ImagePoint::new(ox, oy), raw);
                    let rx = (p.x.floor() as i64).clamp(0, i64::from(self.width) - 1) as usize;
                    let ry = (p.y.floor() as i64).clamp(0, i64::from(self.height) - 1) as usize;
                    let src = ry * src_row + rx * bpp;
                    out[col * bpp..(col + 1) * bpp].copy_from_slice(&self.pixels[src..src + bpp]);
                }
            });

        Ok(Self {
            width,
            height,
            layout: self.layout,
            format: self.format,
            pixels,
            metadata: RawMetadata::default(),
        })
    }

    /// Wrap the pixels for saving with the `image` crate. Raw orientation
    /// is kept; call [`DecodedImage::crop_oriented`] first for upright output.
    pub fn to_dynamic(&self) -> Result<DynamicImage> {
        let (w, h) = (self.width, self.height);
        let bad = || PanoviewError::BufferSize {
            expected: w as usize * h as usize * self.layout.bytes_per_pixel(),
            actual: self.pixels.len(),
        };
        let samples_u16 = || -> Vec<u16> {
            self.pixels
                .chunks_exact(2)
                .map(|b| u16::from_ne_bytes([b[0], b[1]]))
                .collect()
        };
        let samples_f32 = || -> Vec<f32> {
            self.pixels
                .chunks_exact(4)
                .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
                .collect()
        };
        let px = self.pixels.clone();
        let image = match (self.layout.channels, self.layout.depth) {
            (1, BitDepth::U8) => DynamicImage::ImageLuma8(ImageBuffer::from_raw(w, h, px).ok_or_else(bad)?),
            (2, BitDepth::U8) => DynamicImage::ImageLumaA8(ImageBuffer::from_raw(w, h, px).ok_or_else(bad)?),
            (3, BitDepth::U8) => DynamicImage::ImageRgb8(ImageBuffer::from_raw(w, h, px).ok_or_else(bad)?),
            (4, BitDepth::U8) => DynamicImage::ImageRgba8(ImageBuffer::from_raw(w, h, px).ok_or_else(bad)?),
            (1, BitDepth::U16) => DynamicImage::ImageLuma16(ImageBuffer::from_raw(w, h, samples_u16()).ok_or_else(bad)?),
            (2, BitDepth::U16) => DynamicImage::ImageLumaA16(ImageBuffer::from_raw(w, h, samples_u16()).ok_or_else(bad)?),
            (3, BitDepth::U16) => DynamicImage::ImageRgb16(ImageBuffer::from_raw(w, h, samples_u16()).ok_or_else(bad)?),
            (4, BitDepth::U16) => DynamicImage::ImageRgba16(ImageBuffer::from_raw(w, h, samples_u16()).ok_or_else(bad)?),
            (3, BitDepth::F32) => DynamicImage::ImageRgb32F(ImageBuffer::from_raw(w, h, samples_f32()).ok_or_else(bad)?),
            (4, BitDepth::F32) => DynamicImage::ImageRgba32F(ImageBuffer::from_raw(w, h, samples_f32()).ok_or_else(bad)?),
            (c, BitDepth::F32) => {
                let gray = ImageBuffer::<Luma<u16>, _>::from_raw(
                    w,
                    h,
                    samples_f32()
                        .chunks_exact(usize::from(c))
                        .map(|s| (s[0].clamp(0.0, 1.0) * 65535.0) as u16)
                        .collect(),
                )
                .ok_or_else(bad)?;
                DynamicImage::ImageLuma16(gray)
            }
            _ => return Err(PanoviewError::UnsupportedLayout(self.layout.to_string())),
        };
        Ok(image)
    }
}
