mod common;

use std::sync::Arc;

use panoview_core::context::GraphicsContext;
use panoview_core::coords::{HeadingPitch, ImagePoint, Size};
use panoview_core::math::{DMat3, DVec3};
use panoview_core::raster::DecodedImage;
use panoview_core::render::{equirect_point, CpuRenderer, RenderStrategy, Renderer};
use panoview_core::selection::PixelRect;
use panoview_core::texture::cpu::CpuBackend;
use panoview_core::texture::TiledTexture;
use panoview_core::view::{PixelFilter, ViewState};

use common::{gray_ramp, solid_rgba, split_rgba, with_orientation, GRAY8};

/// Upload `image` in 8-pixel tiles on a backend limited to 16 pixels.
fn tiled(image: &DecodedImage) -> TiledTexture {
    let context = GraphicsContext::primary(Arc::new(CpuBackend::with_max_dimension(16)));
    let current = context.make_current().unwrap();
    TiledTexture::build(&current, image, 8).unwrap()
}

/// A view showing the whole flat image one window pixel per image pixel.
fn one_to_one(image: &DecodedImage, filter: PixelFilter) -> ViewState {
    let (w, h) = image.oriented_size();
    let mut view = ViewState::new(w, h);
    view.set_image_geometry(image.width(), image.height(), image.orientation(), false);
    view.set_pixel_filter(filter);
    view
}

fn red_channel(frame: &image::RgbaImage) -> Vec<u8> {
    frame.pixels().map(|p| p.0[0]).collect()
}

// ---------------------------------------------------------------------------
// Background and readiness
// ---------------------------------------------------------------------------

#[test]
fn test_background_without_texture() {
    let view = ViewState::new(8, 6);
    let mut renderer = CpuRenderer::new();
    let stats = renderer.paint(&view, None).unwrap();
    assert_eq!(stats.tiles_drawn, 0);
    assert_eq!(stats.tiles_pending, 0);
    assert_eq!(renderer.frame().dimensions(), (8, 6));
    assert!(renderer.frame().pixels().all(|p| p.0 == [128, 128, 128, 255]));
}

#[test]
fn test_unready_tiles_are_skipped() {
    let image = gray_ramp(20, 10);
    let context = GraphicsContext::primary(Arc::new(CpuBackend::with_max_dimension(16).fence_latency(1000)));
    let current = context.make_current().unwrap();
    let texture = TiledTexture::build(&current, &image, 8).unwrap();

    let view = one_to_one(&image, PixelFilter::Sharp);
    let mut renderer = CpuRenderer::new();
    let stats = renderer.paint(&view, Some(&texture)).unwrap();
    assert_eq!(stats.strategy, RenderStrategy::Rectangular);
    assert_eq!(stats.tiles_drawn, 0);
    assert_eq!(stats.tiles_pending, texture.len());
    assert!(renderer.frame().pixels().all(|p| p.0[0] == 128));
}

// ---------------------------------------------------------------------------
// Flat images
// ---------------------------------------------------------------------------

#[test]
fn test_sharp_one_to_one_reproduces_image_across_tiles() {
    let image = gray_ramp(20, 10);
    let texture = tiled(&image);
    assert!(texture.len() > 1);

    let view = one_to_one(&image, PixelFilter::Sharp);
    let mut renderer = CpuRenderer::new();
    let stats = renderer.paint(&view, Some(&texture)).unwrap();
    assert_eq!(stats.tiles_drawn, texture.len());
    assert_eq!(red_channel(renderer.frame()), image.pixels());
}

#[test]
fn test_sharp_render_applies_orientation() {
    let image = with_orientation(gray_ramp(20, 10), 6);
    let texture = tiled(&image);
    let view = one_to_one(&image, PixelFilter::Sharp);
    let mut renderer = CpuRenderer::new();
    renderer.paint(&view, Some(&texture)).unwrap();

    let upright = image.crop_oriented(PixelRect::new(0, 0, 10, 20)).unwrap();
    assert_eq!(renderer.frame().dimensions(), (10, 20));
    assert_eq!(red_channel(renderer.frame()), upright.pixels());
}

#[test]
fn test_smooth_filters_keep_flat_color_across_seams() {
    let image = solid_rgba(20, 10, [10, 20, 30, 255]);
    let texture = tiled(&image);
    for filter in [PixelFilter::Bilinear, PixelFilter::Hermite, PixelFilter::CatmullRom] {
        let view = one_to_one(&image, filter);
        let mut renderer = CpuRenderer::new();
        renderer.paint(&view, Some(&texture)).unwrap();
        assert!(
            renderer.frame().pixels().all(|p| p.0 == [10, 20, 30, 255]),
            "{filter} changed a flat colour"
        );
    }
}

#[test]
fn test_transparent_pixels_show_background() {
    let image = solid_rgba(4, 4, [255, 0, 0, 0]);
    let texture = tiled(&image);
    let view = one_to_one(&image, PixelFilter::Sharp);
    let mut renderer = CpuRenderer::new();
    renderer.paint(&view, Some(&texture)).unwrap();
    assert!(renderer.frame().pixels().all(|p| p.0 == [128, 128, 128, 255]));

    let image = solid_rgba(4, 4, [255, 0, 0, 51]);
    let texture = tiled(&image);
    renderer.paint(&view, Some(&texture)).unwrap();
    let p = renderer.frame().get_pixel(1, 1).0;
    assert!(p[0] > 128 && p[1] < 128, "got: {p:?}");
}

#[test]
fn test_zoomed_out_image_letterboxed() {
    let image = solid_rgba(8, 8, [0, 0, 0, 255]);
    let texture = tiled(&image);
    let mut view = one_to_one(&image, PixelFilter::Sharp);
    view.set_zoom(0.5);
    let mut renderer = CpuRenderer::new();
    renderer.paint(&view, Some(&texture)).unwrap();
    let frame = renderer.frame();
    assert_eq!(frame.get_pixel(0, 0).0[0], 128);
    assert_eq!(frame.get_pixel(4, 4).0[0], 0);
}

#[test]
fn test_selection_overlay() {
    let image = DecodedImage::new(16, 8, GRAY8, vec![100; 16 * 8]).unwrap();
    let texture = tiled(&image);
    let mut view = one_to_one(&image, PixelFilter::Sharp);
    view.selection_mut().begin(Some(ImagePoint::new(4.0, 2.0)));
    view.selection_mut().pointer_pressed(ImagePoint::new(12.0, 6.0), 5.0);
    assert!(view.selection().is_visible());

    let mut renderer = CpuRenderer::new();
    renderer.paint(&view, Some(&texture)).unwrap();
    let frame = renderer.frame();
    assert_eq!(frame.get_pixel(8, 4).0[0], 100, "inside");
    assert_eq!(frame.get_pixel(0, 0).0[0], 50, "outside is dimmed");
    assert_eq!(frame.get_pixel(4, 4).0[0], 255, "border");
}

// ---------------------------------------------------------------------------
// Panoramas
// ---------------------------------------------------------------------------

#[test]
fn test_panorama_follows_heading() {
    let image = split_rgba(8, 4, [255, 0, 0, 255], [0, 255, 0, 255]);
    let texture = tiled(&image);
    let mut view = ViewState::new(9, 9);
    view.set_image_geometry(8, 4, image.orientation(), true);
    view.set_pixel_filter(PixelFilter::Sharp);

    let mut renderer = CpuRenderer::new();
    let stats = renderer.paint(&view, Some(&texture)).unwrap();
    assert_eq!(stats.strategy, RenderStrategy::Spherical);
    assert_eq!(renderer.frame().get_pixel(4, 4).0, [0, 255, 0, 255]);

    view.set_heading_pitch(HeadingPitch::new(-90.0, 0.0));
    renderer.paint(&view, Some(&texture)).unwrap();
    assert_eq!(renderer.frame().get_pixel(4, 4).0, [255, 0, 0, 255]);
}

#[test]
fn test_panorama_fills_whole_window() {
    let image = solid_rgba(16, 8, [0, 0, 255, 255]);
    let texture = tiled(&image);
    let mut view = ViewState::new(12, 10);
    view.set_image_geometry(16, 8, image.orientation(), true);
    view.set_zoom(0.3);

    let mut renderer = CpuRenderer::new();
    renderer.paint(&view, Some(&texture)).unwrap();
    assert!(renderer.into_frame().pixels().all(|p| p.0 == [0, 0, 255, 255]));
}

#[test]
fn test_panorama_has_no_selection_overlay() {
    let image = solid_rgba(16, 8, [200, 200, 200, 255]);
    let texture = tiled(&image);
    let mut view = ViewState::new(16, 8);
    view.set_image_geometry(16, 8, image.orientation(), true);
    view.selection_mut().begin(Some(ImagePoint::new(1.0, 1.0)));
    view.selection_mut().pointer_pressed(ImagePoint::new(3.0, 3.0), 5.0);

    let mut renderer = CpuRenderer::new();
    renderer.paint(&view, Some(&texture)).unwrap();
    assert!(renderer.frame().pixels().all(|p| p.0 == [200, 200, 200, 255]));
}

#[test]
fn test_equirect_point_wraps_back_seam() {
    let size = Size::from_pixels(8, 4);
    // Straight behind the viewer: heading exactly 180°.
    let behind = equirect_point(DVec3::new(0.0, 0.0, 1.0), &DMat3::IDENTITY, size);
    assert!(behind.x >= 0.0 && behind.x < 8.0, "got {behind:?}");
    assert!(behind.x < 1e-9 || behind.x > 8.0 - 1e-9, "got {behind:?}");
    assert_eq!(behind.y, 2.0);

    let south = equirect_point(DVec3::new(0.0, -1.0, 0.0), &DMat3::IDENTITY, size);
    assert!(south.x >= 0.0 && south.x < 8.0, "got {south:?}");
    assert!(south.y >= 0.0 && south.y < 4.0, "got {south:?}");
}
