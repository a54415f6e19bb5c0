use crate::config::ViewConfig;
use crate::consts::{DEFAULT_BACKGROUND, HOVER_THRESHOLD_PX, MAX_PITCH_DEG, MIN_ZOOM, WHEEL_ZOOM_STEP};
use crate::coords::{
    direction_for_heading_pitch, heading_pitch_for_direction, ndc_for_oriented, ndc_for_projected,
    ndc_for_window, oriented_for_ndc, projected_for_ndc, window_for_ndc, wrap_heading, AspectScale,
    HeadingPitch, ImageLocation, ImagePoint, NdcPoint, RawPoint, Size, WindowPoint,
};
use crate::loader::ImageMetadata;
use crate::math::{view_rotation, DMat3};
use crate::orientation::Orientation;
use crate::projection::Projection;
use crate::selection::SelectionBox;

use super::PixelFilter;

/// Zoom, pan and projection of the viewport plus the selection it drives.
///
/// `center` is relative to the oriented image: `(0.5, 0.5)` is the image
/// middle. Panoramas store heading and pitch in the same pair via
/// `heading = (x − 0.5)·360` and `pitch = (y − 0.5)·180`.
#[derive(Debug, Clone)]
pub struct ViewState {
    window: Size,
    image: Size,
    raw: Size,
    orientation: Orientation,
    is_360: bool,
    pose_rotation: DMat3,
    zoom: f64,
    center: (f64, f64),
    projection: Projection,
    pixel_filter: PixelFilter,
    background: [f32; 4],
    min_zoom: f64,
    hover_threshold_px: f64,
    wheel_zoom_step: f64,
    scale: AspectScale,
    pub(super) selection: SelectionBox,
    pub(super) drag_anchor: Option<WindowPoint>,
}

impl ViewState {
    pub fn new(window_width: u32, window_height: u32) -> Self {
        let window = Size::from_pixels(window_width, window_height);
        let image = Size::new(1.0, 1.0);
        Self {
            window,
            image,
            raw: image,
            orientation: Orientation::Identity,
            is_360: false,
            pose_rotation: DMat3::IDENTITY,
            zoom: 1.0,
            center: (0.5, 0.5),
            projection: Projection::default(),
            pixel_filter: PixelFilter::default(),
            background: DEFAULT_BACKGROUND,
            min_zoom: MIN_ZOOM,
            hover_threshold_px: HOVER_THRESHOLD_PX,
            wheel_zoom_step: WHEEL_ZOOM_STEP,
            scale: AspectScale::compute(image, window, false),
            selection: SelectionBox::new(),
            drag_anchor: None,
        }
    }

    pub fn from_config(config: &ViewConfig, window_width: u32, window_height: u32) -> Self {
        let mut view = Self::new(window_width, window_height);
        view.projection = config.projection;
        view.pixel_filter = config.pixel_filter;
        view.background = config.background;
        view.min_zoom = config.min_zoom;
        view.hover_threshold_px = config.hover_threshold_px;
        view.wheel_zoom_step = config.wheel_zoom_step;
        view
    }

    // ------------------------------------------------------------------
    // Window and image
    // ------------------------------------------------------------------

    pub fn window_size(&self) -> Size {
        self.window
    }

    pub fn set_window_size(&mut self, width: u32, height: u32) {
        self.window = Size::from_pixels(width.max(1), height.max(1));
        self.update_aspect_scale();
    }

    /// Adopt a newly loaded image and reset the view onto it.
    pub fn set_image(&mut self, metadata: &ImageMetadata) {
        self.set_image_geometry(
            metadata.raw_width,
            metadata.raw_height,
            metadata.orientation,
            metadata.is_360,
        );
        self.pose_rotation = metadata.pose_rotation;
    }

    pub fn set_image_geometry(&mut self, raw_width: u32, raw_height: u32, orientation: Orientation, is_360: bool) {
        let (w, h) = orientation.oriented_size(raw_width.max(1), raw_height.max(1));
        self.raw = Size::from_pixels(raw_width.max(1), raw_height.max(1));
        self.image = Size::from_pixels(w, h);
        self.orientation = orientation;
        self.is_360 = is_360;
        self.pose_rotation = DMat3::IDENTITY;
        self.update_aspect_scale();
        self.reset();
    }

    /// Override the flat/panorama decision made at load time.
    pub fn set_360(&mut self, is_360: bool) {
        if self.is_360 != is_360 {
            self.is_360 = is_360;
            self.update_aspect_scale();
            self.reset();
        }
    }

    fn update_aspect_scale(&mut self) {
        self.scale = AspectScale::compute(self.image, self.window, self.is_360);
        self.clamp_center();
    }

    pub fn aspect_scale(&self) -> &AspectScale {
        &self.scale
    }

    pub fn image_size(&self) -> Size {
        self.image
    }

    pub fn raw_size(&self) -> Size {
        self.raw
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn is_360(&self) -> bool {
        self.is_360
    }

    pub fn pose_rotation(&self) -> DMat3 {
        self.pose_rotation
    }

    // ------------------------------------------------------------------
    // Parameters
    // ------------------------------------------------------------------

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.max(self.min_zoom);
        self.clamp_center();
    }

    pub fn min_zoom(&self) -> f64 {
        self.min_zoom
    }

    pub fn center(&self) -> (f64, f64) {
        self.center
    }

    pub fn set_center(&mut self, x: f64, y: f64) {
        self.center = (x, y);
        if self.is_360 {
            self.set_heading_pitch(self.heading_pitch());
        } else {
            self.clamp_center();
        }
    }

    /// Oriented pixel at the window center.
    pub fn center_oriented(&self) -> ImagePoint {
        ImagePoint::new(self.center.0 * self.image.width, self.center.1 * self.image.height)
    }

    pub fn heading_pitch(&self) -> HeadingPitch {
        HeadingPitch::new((self.center.0 - 0.5) * 360.0, (self.center.1 - 0.5) * 180.0)
    }

    /// Heading wraps to (−180°, 180°], pitch clamps to ±90°.
    pub fn set_heading_pitch(&mut self, hp: HeadingPitch) {
        let heading = wrap_heading(hp.heading);
        let pitch = hp.pitch.clamp(-MAX_PITCH_DEG, MAX_PITCH_DEG);
        self.center = (heading / 360.0 + 0.5, pitch / 180.0 + 0.5);
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    pub fn set_projection(&mut self, projection: Projection) {
        self.projection = projection;
    }

    pub fn pixel_filter(&self) -> PixelFilter {
        self.pixel_filter
    }

    pub fn set_pixel_filter(&mut self, filter: PixelFilter) {
        self.pixel_filter = filter;
    }

    pub fn background(&self) -> [f32; 4] {
        self.background
    }

    pub fn set_background(&mut self, rgba: [f32; 4]) {
        self.background = rgba;
    }

    pub fn selection(&self) -> &SelectionBox {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut SelectionBox {
        &mut self.selection
    }

    /// Rotation from view directions to world directions.
    pub fn view_rotation(&self) -> DMat3 {
        let hp = self.heading_pitch();
        view_rotation(hp.heading, hp.pitch)
    }

    /// Selection grab distance in image pixels at the current zoom.
    pub fn hover_threshold(&self) -> f64 {
        self.hover_threshold_px * self.scale.image_per_window_pixel(self.zoom)
    }

    /// Zoom 1, centered, no selection.
    pub fn reset(&mut self) {
        self.zoom = 1.0;
        self.center = (0.5, 0.5);
        self.selection.clear();
        self.drag_anchor = None;
    }

    // ------------------------------------------------------------------
    // Window → image
    // ------------------------------------------------------------------

    pub fn ndc_for_window(&self, p: WindowPoint) -> NdcPoint {
        ndc_for_window(p, self.window, &self.scale)
    }

    fn oriented_at_zoom(&self, p: WindowPoint, zoom: f64) -> ImagePoint {
        oriented_for_ndc(self.ndc_for_window(p), self.center_oriented(), &self.scale, zoom)
    }

    fn heading_pitch_at_zoom(&self, p: WindowPoint, zoom: f64) -> HeadingPitch {
        let projected = projected_for_ndc(self.ndc_for_window(p), zoom);
        let view_dir = self.projection.direction_for_projected(projected);
        heading_pitch_for_direction(self.view_rotation() * view_dir)
    }

    pub fn oriented_for_window(&self, p: WindowPoint) -> ImagePoint {
        self.oriented_at_zoom(p, self.zoom)
    }

    pub fn raw_for_window(&self, p: WindowPoint) -> RawPoint {
        self.orientation.raw_for_oriented(self.oriented_for_window(p), self.raw)
    }

    pub fn heading_pitch_for_window(&self, p: WindowPoint) -> HeadingPitch {
        self.heading_pitch_at_zoom(p, self.zoom)
    }

    /// The image location under a window point: pixels for flat images,
    /// a viewing direction for panoramas.
    pub fn image_point_for_window(&self, p: WindowPoint) -> ImageLocation {
        if self.is_360 {
            ImageLocation::Sphere(self.heading_pitch_for_window(p))
        } else {
            let oriented = self.oriented_for_window(p);
            ImageLocation::Flat {
                oriented,
                raw: self.orientation.raw_for_oriented(oriented, self.raw),
            }
        }
    }

    /// Hover text for the status line.
    pub fn status_text(&self, p: WindowPoint) -> String {
        self.image_point_for_window(p).to_string()
    }

    // ------------------------------------------------------------------
    // Image → window
    // ------------------------------------------------------------------

    pub fn window_for_oriented(&self, p: ImagePoint) -> WindowPoint {
        let ndc = ndc_for_oriented(p, self.center_oriented(), &self.scale, self.zoom);
        window_for_ndc(ndc, self.window, &self.scale)
    }

    /// `None` when the direction cannot be shown under the current
    /// projection.
    pub fn window_for_heading_pitch(&self, hp: HeadingPitch) -> Option<WindowPoint> {
        let view_dir = self.view_rotation().transpose() * direction_for_heading_pitch(hp);
        let projected = self.projection.projected_for_direction(view_dir)?;
        let ndc = ndc_for_projected(projected, self.zoom);
        Some(window_for_ndc(ndc, self.window, &self.scale))
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// Multiply zoom by `factor`. With a pivot, the image location under
    /// the pivot stays put.
    pub fn zoom_relative(&mut self, factor: f64, pivot: Option<WindowPoint>) {
        let old = self.zoom;
        let new = (old * factor).max(self.min_zoom);
        if let Some(p) = pivot {
            if self.is_360 {
                let before = self.heading_pitch_at_zoom(p, old);
                let after = self.heading_pitch_at_zoom(p, new);
                let hp = self.heading_pitch();
                self.set_heading_pitch(HeadingPitch::new(
                    hp.heading - wrap_heading(after.heading - before.heading),
                    hp.pitch - (after.pitch - before.pitch),
                ));
            } else {
                let before = self.oriented_at_zoom(p, old);
                let after = self.oriented_at_zoom(p, new);
                self.center.0 -= (after.x - before.x) / self.image.width;
                self.center.1 -= (after.y - before.y) / self.image.height;
            }
        }
        self.zoom = new;
        self.clamp_center();
    }

    /// Zoom by whole or fractional wheel notches; positive zooms in.
    pub fn wheel_zoom(&mut self, notches: f64, pivot: Option<WindowPoint>) {
        self.zoom_relative(self.wheel_zoom_step.powf(notches), pivot);
    }

    /// Pan so the content follows the pointer from `prev` to `curr`.
    pub fn drag_relative(&mut self, prev: WindowPoint, curr: WindowPoint) {
        if self.is_360 {
            let a = self.heading_pitch_for_window(prev);
            let b = self.heading_pitch_for_window(curr);
            let hp = self.heading_pitch();
            self.set_heading_pitch(HeadingPitch::new(
                hp.heading + wrap_heading(a.heading - b.heading),
                hp.pitch + (a.pitch - b.pitch),
            ));
        } else {
            let a = self.oriented_for_window(prev);
            let b = self.oriented_for_window(curr);
            self.center.0 += (a.x - b.x) / self.image.width;
            self.center.1 += (a.y - b.y) / self.image.height;
            self.clamp_center();
        }
    }

    /// Keep a flat image's center where the window stays on the image.
    pub fn clamp_center(&mut self) {
        if self.is_360 {
            return;
        }
        if self.zoom <= 1.0 {
            self.center = (0.5, 0.5);
            return;
        }
        let lo = 0.5 / self.zoom;
        let hi = 1.0 - lo;
        self.center = (self.center.0.clamp(lo, hi), self.center.1.clamp(lo, hi));
    }
}
