use approx::assert_relative_eq;

use panoview_core::config::ViewConfig;
use panoview_core::coords::{
    heading_pitch_for_direction, AspectScale, HeadingPitch, ImageLocation, ImagePoint, ScaleAxis, Size,
    WindowPoint,
};
use panoview_core::math::DVec3;
use panoview_core::orientation::Orientation;
use panoview_core::projection::Projection;
use panoview_core::view::{PixelFilter, ViewState};

fn flat_view() -> ViewState {
    let mut view = ViewState::new(800, 600);
    view.set_image_geometry(2000, 1000, Orientation::Identity, false);
    view
}

fn pano_view() -> ViewState {
    let mut view = ViewState::new(800, 600);
    view.set_image_geometry(4000, 2000, Orientation::Identity, true);
    view
}

// ---------------------------------------------------------------------------
// Aspect scale
// ---------------------------------------------------------------------------

#[test]
fn test_aspect_scale_flat_matches_relatively_larger_axis() {
    let wide = AspectScale::compute(Size::new(2000.0, 1000.0), Size::new(800.0, 600.0), false);
    assert_eq!(wide.axis, ScaleAxis::Width);
    assert_relative_eq!(wide.image, 2000.0);
    assert_relative_eq!(wide.window, 800.0);

    let tall = AspectScale::compute(Size::new(1000.0, 2000.0), Size::new(800.0, 600.0), false);
    assert_eq!(tall.axis, ScaleAxis::Height);
    assert_relative_eq!(tall.image, 2000.0);
    assert_relative_eq!(tall.window, 600.0);
}

#[test]
fn test_aspect_scale_panorama_depends_on_window_only() {
    let image = Size::new(4000.0, 2000.0);
    let landscape = AspectScale::compute(image, Size::new(800.0, 600.0), true);
    assert_eq!(landscape.axis, ScaleAxis::Height);
    let portrait = AspectScale::compute(image, Size::new(600.0, 800.0), true);
    assert_eq!(portrait.axis, ScaleAxis::Width);
}

// ---------------------------------------------------------------------------
// Flat mapping
// ---------------------------------------------------------------------------

#[test]
fn test_flat_window_edges_map_to_image_edges() {
    let view = flat_view();
    let left = view.oriented_for_window(WindowPoint::new(0.0, 300.0));
    let right = view.oriented_for_window(WindowPoint::new(800.0, 300.0));
    assert_relative_eq!(left.x, 0.0);
    assert_relative_eq!(right.x, 2000.0);

    let center = view.oriented_for_window(WindowPoint::new(400.0, 300.0));
    assert_relative_eq!(center.x, 1000.0);
    assert_relative_eq!(center.y, 500.0);

    // The window is relatively taller, so the image is letterboxed.
    let top = view.oriented_for_window(WindowPoint::new(400.0, 0.0));
    assert_relative_eq!(top.y, -250.0);
}

#[test]
fn test_window_for_oriented_inverts_mapping() {
    let mut view = flat_view();
    view.zoom_relative(3.0, Some(WindowPoint::new(123.0, 456.0)));
    let p = WindowPoint::new(77.0, 512.25);
    let back = view.window_for_oriented(view.oriented_for_window(p));
    assert_relative_eq!(back.x, p.x, epsilon = 1e-9);
    assert_relative_eq!(back.y, p.y, epsilon = 1e-9);
}

#[test]
fn test_raw_for_window_applies_orientation() {
    let mut view = ViewState::new(800, 800);
    view.set_image_geometry(1000, 2000, Orientation::Rotate90Cw, false);
    assert_relative_eq!(view.image_size().width, 2000.0);
    assert_relative_eq!(view.image_size().height, 1000.0);

    let raw = view.raw_for_window(WindowPoint::new(400.0, 400.0));
    assert_relative_eq!(raw.x, 500.0, epsilon = 1e-9);
    assert_relative_eq!(raw.y, 1000.0, epsilon = 1e-9);
}

#[test]
fn test_status_text_for_flat_image() {
    let view = flat_view();
    let s = view.status_text(WindowPoint::new(400.0, 300.0));
    assert_eq!(s, "image pixel = [1000, 500]", "got: {s}");
    match view.image_point_for_window(WindowPoint::new(400.0, 300.0)) {
        ImageLocation::Flat { raw, .. } => assert_relative_eq!(raw.x, 1000.0),
        other => panic!("expected flat location, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Zoom and pan
// ---------------------------------------------------------------------------

#[test]
fn test_zoom_about_pivot_keeps_point_fixed() {
    let mut view = flat_view();
    let pivot = WindowPoint::new(200.0, 150.0);
    let before = view.oriented_for_window(pivot);
    view.zoom_relative(2.0, Some(pivot));
    let after = view.oriented_for_window(pivot);

    assert_relative_eq!(view.zoom(), 2.0);
    assert_relative_eq!(after.x, before.x, epsilon = 1e-9);
    assert_relative_eq!(after.y, before.y, epsilon = 1e-9);
    let (cx, cy) = view.center();
    assert_relative_eq!(cx, 0.375, epsilon = 1e-12);
    assert_relative_eq!(cy, 0.3125, epsilon = 1e-12);
}

#[test]
fn test_zoom_clamps_to_minimum() {
    let mut view = flat_view();
    view.set_zoom(0.1);
    assert_relative_eq!(view.zoom(), 0.30);
    view.zoom_relative(0.5, None);
    assert_relative_eq!(view.zoom(), view.min_zoom());
}

#[test]
fn test_wheel_zoom_uses_step() {
    let mut view = flat_view();
    view.wheel_zoom(2.0, None);
    assert_relative_eq!(view.zoom(), 1.25 * 1.25, epsilon = 1e-12);
    view.wheel_zoom(-2.0, None);
    assert_relative_eq!(view.zoom(), 1.0, epsilon = 1e-12);
}

#[test]
fn test_zoomed_out_flat_image_stays_centered() {
    let mut view = flat_view();
    view.set_zoom(0.5);
    view.drag_relative(WindowPoint::new(400.0, 300.0), WindowPoint::new(100.0, 50.0));
    assert_eq!(view.center(), (0.5, 0.5));
}

#[test]
fn test_drag_moves_content_with_pointer() {
    let mut view = flat_view();
    view.set_zoom(2.0);
    view.drag_relative(WindowPoint::new(400.0, 300.0), WindowPoint::new(300.0, 300.0));
    let (cx, cy) = view.center();
    assert_relative_eq!(cx, 0.5625, epsilon = 1e-12);
    assert_relative_eq!(cy, 0.5, epsilon = 1e-12);
}

#[test]
fn test_center_clamped_to_visible_range() {
    let mut view = flat_view();
    view.set_zoom(4.0);
    view.set_center(0.0, 1.0);
    let (cx, cy) = view.center();
    assert_relative_eq!(cx, 0.125);
    assert_relative_eq!(cy, 0.875);
}

#[test]
fn test_set_image_resets_view() {
    let mut view = flat_view();
    view.zoom_relative(3.0, Some(WindowPoint::new(10.0, 10.0)));
    view.begin_selection(None);
    view.set_image_geometry(640, 480, Orientation::Identity, false);
    assert_relative_eq!(view.zoom(), 1.0);
    assert_eq!(view.center(), (0.5, 0.5));
    assert!(!view.selection().is_visible());
}

// ---------------------------------------------------------------------------
// Panoramas
// ---------------------------------------------------------------------------

#[test]
fn test_panorama_window_center_looks_forward() {
    let view = pano_view();
    assert_eq!(view.projection(), Projection::Stereographic);
    let hp = view.heading_pitch_for_window(WindowPoint::new(400.0, 300.0));
    assert_relative_eq!(hp.heading, 0.0, epsilon = 1e-9);
    assert_relative_eq!(hp.pitch, 0.0, epsilon = 1e-9);
}

#[test]
fn test_panorama_center_follows_heading() {
    let mut view = pano_view();
    view.set_heading_pitch(HeadingPitch::new(90.0, 20.0));
    let hp = view.heading_pitch_for_window(WindowPoint::new(400.0, 300.0));
    assert_relative_eq!(hp.heading, 90.0, epsilon = 1e-9);
    assert_relative_eq!(hp.pitch, 20.0, epsilon = 1e-9);
}

#[test]
fn test_heading_wraps_and_pitch_clamps() {
    let mut view = pano_view();
    view.set_heading_pitch(HeadingPitch::new(200.0, 100.0));
    let hp = view.heading_pitch();
    assert_relative_eq!(hp.heading, -160.0, epsilon = 1e-9);
    assert_relative_eq!(hp.pitch, 90.0, epsilon = 1e-9);
}

#[test]
fn test_panorama_round_trip_through_window() {
    let mut view = pano_view();
    view.set_heading_pitch(HeadingPitch::new(-35.0, 10.0));
    for projection in Projection::ALL {
        view.set_projection(projection);
        let p = WindowPoint::new(250.0, 410.0);
        let hp = view.heading_pitch_for_window(p);
        let back = view
            .window_for_heading_pitch(hp)
            .unwrap_or_else(|| panic!("{projection}: direction not shown"));
        assert_relative_eq!(back.x, p.x, epsilon = 1e-6);
        assert_relative_eq!(back.y, p.y, epsilon = 1e-6);
    }
}

#[test]
fn test_gnomonic_cannot_show_behind_viewer() {
    let mut view = pano_view();
    view.set_projection(Projection::Gnomonic);
    assert!(view.window_for_heading_pitch(HeadingPitch::new(180.0, 0.0)).is_none());
}

#[test]
fn test_panorama_drag_right_turns_left() {
    let mut view = pano_view();
    view.drag_relative(WindowPoint::new(400.0, 300.0), WindowPoint::new(500.0, 300.0));
    assert!(view.heading_pitch().heading < 0.0, "got: {}", view.heading_pitch());
}

#[test]
fn test_panorama_zoom_about_pivot_keeps_direction() {
    let mut view = pano_view();
    let pivot = WindowPoint::new(520.0, 260.0);
    let before = view.heading_pitch_for_window(pivot);
    view.zoom_relative(1.5, Some(pivot));
    let after = view.heading_pitch_for_window(pivot);
    assert_relative_eq!(after.heading, before.heading, epsilon = 2.0);
    assert_relative_eq!(after.pitch, before.pitch, epsilon = 2.0);
}

#[test]
fn test_panorama_status_text_is_heading_pitch() {
    let view = pano_view();
    let s = view.status_text(WindowPoint::new(600.0, 300.0));
    assert!(s.starts_with("heading = "), "got: {s}");
    assert!(s.contains("pitch = "), "got: {s}");
}

#[test]
fn test_direction_conventions() {
    let forward = heading_pitch_for_direction(DVec3::new(0.0, 0.0, -1.0));
    assert_relative_eq!(forward.heading, 0.0);
    let right = heading_pitch_for_direction(DVec3::new(1.0, 0.0, 0.0));
    assert_relative_eq!(right.heading, 90.0);
    let up = heading_pitch_for_direction(DVec3::new(0.0, 1.0, 0.0));
    assert_relative_eq!(up.pitch, 90.0);
}

#[test]
fn test_selection_ignored_for_panorama() {
    let mut view = pano_view();
    view.begin_selection(Some(WindowPoint::new(10.0, 10.0)));
    assert!(!view.selection().is_visible());
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[test]
fn test_view_from_config() {
    let config = ViewConfig {
        min_zoom: 0.5,
        hover_threshold_px: 8.0,
        wheel_zoom_step: 2.0,
        projection: Projection::Equidistant,
        pixel_filter: PixelFilter::Sharp,
        background: [0.0, 0.0, 0.0, 1.0],
    };
    let mut view = ViewState::from_config(&config, 100, 100);
    view.set_image_geometry(100, 100, Orientation::Identity, false);
    assert_eq!(view.projection(), Projection::Equidistant);
    assert_eq!(view.pixel_filter(), PixelFilter::Sharp);
    assert_relative_eq!(view.hover_threshold(), 8.0);
    view.set_zoom(0.1);
    assert_relative_eq!(view.zoom(), 0.5);
    view.wheel_zoom(1.0, None);
    assert_relative_eq!(view.zoom(), 1.0);
    let p: ImagePoint = view.center_oriented();
    assert_relative_eq!(p.x, 50.0);
}
