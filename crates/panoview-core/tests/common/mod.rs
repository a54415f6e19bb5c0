#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;
use std::time::{Duration, Instant};

use image::{DynamicImage, ImageFormat, RgbImage};

use panoview_core::context::GraphicsContext;
use panoview_core::error::Result;
use panoview_core::loader::{Decoder, ImageLoader, LoadEvent, LoadSource};
use panoview_core::raster::{BitDepth, DecodedImage, PixelLayout, RawMetadata};
use panoview_core::texture::cpu::CpuBackend;

pub const GRAY8: PixelLayout = PixelLayout::new(1, BitDepth::U8);
pub const RGBA8: PixelLayout = PixelLayout::new(4, BitDepth::U8);

/// Gray image whose pixel value encodes its position.
pub fn gray_ramp(width: u32, height: u32) -> DecodedImage {
    let pixels = (0..height)
        .flat_map(|y| (0..width).map(move |x| ((x * 7 + y * 13) % 251) as u8))
        .collect();
    DecodedImage::new(width, height, GRAY8, pixels).unwrap()
}

/// RGBA image filled with one colour.
pub fn solid_rgba(width: u32, height: u32, rgba: [u8; 4]) -> DecodedImage {
    let pixels = rgba.repeat((width * height) as usize);
    DecodedImage::new(width, height, RGBA8, pixels).unwrap()
}

/// RGBA image whose left half is `left` and right half `right`.
pub fn split_rgba(width: u32, height: u32, left: [u8; 4], right: [u8; 4]) -> DecodedImage {
    let mut pixels = Vec::with_capacity((width * height * 4) as usize);
    for _ in 0..height {
        for x in 0..width {
            pixels.extend_from_slice(if x < width / 2 { &left } else { &right });
        }
    }
    DecodedImage::new(width, height, RGBA8, pixels).unwrap()
}

pub fn with_orientation(image: DecodedImage, exif: u32) -> DecodedImage {
    image.with_metadata(RawMetadata {
        exif_orientation: Some(exif),
        xmp: None,
    })
}

/// Encode an RGB gradient as PNG.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| image::Rgb([x as u8, y as u8, 128]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

pub fn cpu_context() -> GraphicsContext {
    GraphicsContext::primary(Arc::new(CpuBackend::new()))
}

// ---------------------------------------------------------------------------
// Decoders
// ---------------------------------------------------------------------------

type DecodeFn = dyn Fn(&LoadSource) -> Result<DecodedImage> + Send + Sync;

/// Decoder that builds images in code, optionally slowly.
pub struct FnDecoder {
    decode: Box<DecodeFn>,
    delay: Duration,
}

impl FnDecoder {
    pub fn new(decode: impl Fn(&LoadSource) -> Result<DecodedImage> + Send + Sync + 'static) -> Self {
        Self {
            decode: Box::new(decode),
            delay: Duration::ZERO,
        }
    }

    /// Sleep this long in every decode whose source name starts with "slow".
    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl Decoder for FnDecoder {
    fn decode(&self, source: &LoadSource) -> Result<DecodedImage> {
        if source.name().starts_with("slow") {
            std::thread::sleep(self.delay);
        }
        (self.decode)(source)
    }
}

// ---------------------------------------------------------------------------
// Event collection
// ---------------------------------------------------------------------------

/// Collect current-request events until a terminal one arrives or `limit`
/// passes.
pub fn collect_until_terminal(loader: &ImageLoader, limit: Duration) -> Vec<LoadEvent> {
    let deadline = Instant::now() + limit;
    let mut events = Vec::new();
    while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
        match loader.next_event_timeout(remaining) {
            Some(event) => {
                let terminal = event.is_terminal();
                events.push(event);
                if terminal {
                    break;
                }
            }
            None => break,
        }
    }
    events
}
