use std::fs::File;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use image::{DynamicImage, ImageDecoder, ImageReader};
use memmap2::Mmap;

use crate::consts::XMP_SCAN_LIMIT;
use crate::error::{PanoviewError, Result};
use crate::raster::{BitDepth, DecodedImage, PixelLayout, RawMetadata, SourceFormat};

/// What to load.
#[derive(Debug, Clone)]
pub enum LoadSource {
    File(PathBuf),
    Memory { name: String, bytes: Arc<[u8]> },
}

impl LoadSource {
    pub fn name(&self) -> String {
        match self {
            LoadSource::File(path) => path.display().to_string(),
            LoadSource::Memory { name, .. } => name.clone(),
        }
    }
}

/// Turns encoded bytes into pixels. Runs on the loader thread and may
/// block for as long as decoding takes.
pub trait Decoder: Send + Sync {
    fn decode(&self, source: &LoadSource) -> Result<DecodedImage>;
}

/// Decoder backed by the `image` crate. Files are memory-mapped.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageCrateDecoder;

impl Decoder for ImageCrateDecoder {
    fn decode(&self, source: &LoadSource) -> Result<DecodedImage> {
        let name = source.name();
        match source {
            LoadSource::File(path) => {
                let file = File::open(path).map_err(|e| PanoviewError::Decode {
                    source_name: name.clone(),
                    message: format!("file is not readable: {e}"),
                })?;
                let mmap = unsafe { Mmap::map(&file)? };
                decode_bytes(&name, &mmap)
            }
            LoadSource::Memory { bytes, .. } => decode_bytes(&name, bytes),
        }
    }
}

fn decode_error(name: &str, e: impl std::fmt::Display) -> PanoviewError {
    PanoviewError::Decode {
        source_name: name.to_string(),
        message: e.to_string(),
    }
}

fn decode_bytes(name: &str, bytes: &[u8]) -> Result<DecodedImage> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| decode_error(name, e))?;
    let format = reader.format().map(SourceFormat::from).unwrap_or_default();
    let mut decoder = reader.into_decoder().map_err(|e| decode_error(name, e))?;
    let exif_orientation = decoder.orientation().ok().map(exif_code);
    let image = DynamicImage::from_decoder(decoder).map_err(|e| decode_error(name, e))?;

    let (width, height) = (image.width(), image.height());
    let (layout, pixels) = into_raw_pixels(image);
    tracing::debug!("{name}: decoded {width}x{height} {layout} ({format})");

    Ok(DecodedImage::new(width, height, layout, pixels)?
        .with_format(format)
        .with_metadata(RawMetadata {
            exif_orientation,
            xmp: find_xmp(bytes),
        }))
}

fn exif_code(orientation: image::metadata::Orientation) -> u32 {
    use image::metadata::Orientation as O;
    match orientation {
        O::NoTransforms => 1,
        O::FlipHorizontal => 2,
        O::Rotate180 => 3,
        O::FlipVertical => 4,
        O::Rotate90FlipH => 5,
        O::Rotate90 => 6,
        O::Rotate270FlipH => 7,
        O::Rotate270 => 8,
        #[allow(unreachable_patterns)]
        _ => 1,
    }
}

fn ne_bytes<T: Copy, const N: usize>(samples: Vec<T>, to_bytes: fn(T) -> [u8; N]) -> Vec<u8> {
    samples.into_iter().flat_map(to_bytes).collect()
}

fn into_raw_pixels(image: DynamicImage) -> (PixelLayout, Vec<u8>) {
    use BitDepth::{F32, U16, U8};
    match image {
        DynamicImage::ImageLuma8(b) => (PixelLayout::new(1, U8), b.into_raw()),
        DynamicImage::ImageLumaA8(b) => (PixelLayout::new(2, U8), b.into_raw()),
        DynamicImage::ImageRgb8(b) => (PixelLayout::new(3, U8), b.into_raw()),
        DynamicImage::ImageRgba8(b) => (PixelLayout::new(4, U8), b.into_raw()),
        DynamicImage::ImageLuma16(b) => (PixelLayout::new(1, U16), ne_bytes(b.into_raw(), u16::to_ne_bytes)),
        DynamicImage::ImageLumaA16(b) => (PixelLayout::new(2, U16), ne_bytes(b.into_raw(), u16::to_ne_bytes)),
        DynamicImage::ImageRgb16(b) => (PixelLayout::new(3, U16), ne_bytes(b.into_raw(), u16::to_ne_bytes)),
        DynamicImage::ImageRgba16(b) => (PixelLayout::new(4, U16), ne_bytes(b.into_raw(), u16::to_ne_bytes)),
        DynamicImage::ImageRgb32F(b) => (PixelLayout::new(3, F32), ne_bytes(b.into_raw(), f32::to_ne_bytes)),
        DynamicImage::ImageRgba32F(b) => (PixelLayout::new(4, F32), ne_bytes(b.into_raw(), f32::to_ne_bytes)),
        other => (PixelLayout::new(4, U8), other.to_rgba8().into_raw()),
    }
}

/// Locate an XMP packet near the start of the file. JPEG, PNG (uncompressed
/// iTXt) and TIFF all store it as plain text.
fn find_xmp(bytes: &[u8]) -> Option<String> {
    const OPEN: &[u8] = b"<x:xmpmeta";
    const CLOSE: &[u8] = b"</x:xmpmeta>";
    let head = &bytes[..bytes.len().min(XMP_SCAN_LIMIT)];
    let start = head.windows(OPEN.len()).position(|w| w == OPEN)?;
    let len = head[start..].windows(CLOSE.len()).position(|w| w == CLOSE)?;
    let packet = &head[start..start + len + CLOSE.len()];
    Some(String::from_utf8_lossy(packet).into_owned())
}
