//! Coordinate spaces and the pure conversions between them.
//!
//! * window: pixels, origin upper-left, y down.
//! * normalized device (NDC): origin at the window center, y up, ±1 at the
//!   window edge along the aspect-scale axis.
//! * oriented image pixels: origin upper-left of the upright image.
//! * raw image pixels: as decoded, before orientation correction.
//! * projected: NDC scaled by zoom and π/2, input to panorama projections.
//! * heading/pitch: degrees on the viewing sphere.

use std::f64::consts::FRAC_PI_2;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::math::DVec3;

macro_rules! point_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
        pub struct $name {
            pub x: f64,
            pub y: f64,
        }

        impl $name {
            pub const fn new(x: f64, y: f64) -> Self {
                Self { x, y }
            }
        }
    };
}

point_type!(
    /// Position in window pixels.
    WindowPoint
);
point_type!(
    /// Position in normalized device coordinates.
    NdcPoint
);
point_type!(
    /// Position in oriented image pixels.
    ImagePoint
);
point_type!(
    /// Position in raw (as decoded) image pixels.
    RawPoint
);
point_type!(
    /// Position on the projection plane, in radians at zoom 1.
    ProjectedPoint
);

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn from_pixels(width: u32, height: u32) -> Self {
        Self::new(f64::from(width), f64::from(height))
    }

    pub fn aspect(&self) -> f64 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// A viewing direction in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HeadingPitch {
    pub heading: f64,
    pub pitch: f64,
}

impl HeadingPitch {
    pub const fn new(heading: f64, pitch: f64) -> Self {
        Self { heading, pitch }
    }
}

impl fmt::Display for HeadingPitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "heading = {:.1}°  pitch = {:.1}°", self.heading, self.pitch)
    }
}

/// What lies under a window point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImageLocation {
    Flat { oriented: ImagePoint, raw: RawPoint },
    Sphere(HeadingPitch),
}

impl fmt::Display for ImageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageLocation::Flat { oriented, .. } => {
                write!(
                    f,
                    "image pixel = [{}, {}]",
                    oriented.x.floor() as i64,
                    oriented.y.floor() as i64
                )
            }
            ImageLocation::Sphere(hp) => hp.fmt(f),
        }
    }
}

/// Which dimension of image and window are matched to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScaleAxis {
    Width,
    Height,
}

/// Cached pair of lengths that maps window pixels onto image pixels at
/// zoom 1: `window` pixels of the window span `image` pixels of the image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AspectScale {
    pub axis: ScaleAxis,
    pub image: f64,
    pub window: f64,
}

impl AspectScale {
    /// Flat images fit whichever dimension is relatively larger; panoramas
    /// scale by width only in windows taller than they are wide.
    pub fn compute(image: Size, window: Size, is_360: bool) -> Self {
        let axis = if is_360 {
            if window.aspect() < 1.0 {
                ScaleAxis::Width
            } else {
                ScaleAxis::Height
            }
        } else if image.aspect() > window.aspect() {
            ScaleAxis::Width
        } else {
            ScaleAxis::Height
        };
        let (image_len, window_len) = match axis {
            ScaleAxis::Width => (image.width, window.width),
            ScaleAxis::Height => (image.height, window.height),
        };
        Self {
            axis,
            image: image_len.max(1.0),
            window: window_len.max(1.0),
        }
    }

    /// Image pixels covered by one window pixel at the given zoom.
    pub fn image_per_window_pixel(&self, zoom: f64) -> f64 {
        self.image / (self.window * zoom)
    }
}

pub fn ndc_for_window(p: WindowPoint, window: Size, scale: &AspectScale) -> NdcPoint {
    NdcPoint::new(
        (2.0 * p.x - window.width) / scale.window,
        -(2.0 * p.y - window.height) / scale.window,
    )
}

pub fn window_for_ndc(ndc: NdcPoint, window: Size, scale: &AspectScale) -> WindowPoint {
    WindowPoint::new(
        (ndc.x * scale.window + window.width) / 2.0,
        (window.height - ndc.y * scale.window) / 2.0,
    )
}

/// `center` is the oriented pixel shown at the window center.
pub fn oriented_for_ndc(ndc: NdcPoint, center: ImagePoint, scale: &AspectScale, zoom: f64) -> ImagePoint {
    let half = scale.image / 2.0 / zoom;
    ImagePoint::new(center.x + ndc.x * half, center.y - ndc.y * half)
}

pub fn ndc_for_oriented(p: ImagePoint, center: ImagePoint, scale: &AspectScale, zoom: f64) -> NdcPoint {
    let half = scale.image / 2.0 / zoom;
    NdcPoint::new((p.x - center.x) / half, -(p.y - center.y) / half)
}

pub fn projected_for_ndc(ndc: NdcPoint, zoom: f64) -> ProjectedPoint {
    let k = FRAC_PI_2 / zoom;
    ProjectedPoint::new(ndc.x * k, ndc.y * k)
}

pub fn ndc_for_projected(p: ProjectedPoint, zoom: f64) -> NdcPoint {
    let k = zoom / FRAC_PI_2;
    NdcPoint::new(p.x * k, p.y * k)
}

pub fn heading_pitch_for_direction(d: DVec3) -> HeadingPitch {
    let d = d.normalize_or_zero();
    HeadingPitch::new(
        d.x.atan2(-d.z).to_degrees(),
        d.y.clamp(-1.0, 1.0).asin().to_degrees(),
    )
}

pub fn direction_for_heading_pitch(hp: HeadingPitch) -> DVec3 {
    let (sh, ch) = hp.heading.to_radians().sin_cos();
    let (sp, cp) = hp.pitch.to_radians().sin_cos();
    DVec3::new(sh * cp, sp, -ch * cp)
}

/// Wrap into (−180, 180].
pub fn wrap_heading(deg: f64) -> f64 {
    let wrapped = (deg + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 {
        180.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_heading_half_open_interval() {
        assert_eq!(wrap_heading(180.0), 180.0);
        assert_eq!(wrap_heading(-180.0), 180.0);
        assert_eq!(wrap_heading(190.0), -170.0);
        assert_eq!(wrap_heading(-540.0), 180.0);
        assert_eq!(wrap_heading(45.0), 45.0);
    }

    #[test]
    fn ndc_window_round_trip() {
        let window = Size::new(640.0, 480.0);
        let scale = AspectScale::compute(Size::new(1000.0, 1000.0), window, false);
        let p = WindowPoint::new(17.0, 301.5);
        let back = window_for_ndc(ndc_for_window(p, window, &scale), window, &scale);
        assert!((back.x - p.x).abs() < 1e-9 && (back.y - p.y).abs() < 1e-9);
    }

    #[test]
    fn direction_heading_pitch_round_trip() {
        let hp = HeadingPitch::new(-120.0, 35.0);
        let back = heading_pitch_for_direction(direction_for_heading_pitch(hp));
        assert!((back.heading - hp.heading).abs() < 1e-9);
        assert!((back.pitch - hp.pitch).abs() < 1e-9);
    }
}
