use std::fmt;

use serde::{Deserialize, Serialize};

use crate::coords::{ImagePoint, RawPoint, Size};

/// EXIF orientation: how raw pixels must be flipped/rotated to appear
/// upright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Orientation {
    #[default]
    Identity,
    FlipHorizontal,
    Rotate180,
    FlipVertical,
    Transpose,
    Rotate90Cw,
    Transverse,
    Rotate90Ccw,
}

impl Orientation {
    pub const ALL: [Orientation; 8] = [
        Orientation::Identity,
        Orientation::FlipHorizontal,
        Orientation::Rotate180,
        Orientation::FlipVertical,
        Orientation::Transpose,
        Orientation::Rotate90Cw,
        Orientation::Transverse,
        Orientation::Rotate90Ccw,
    ];

    pub fn from_exif(code: u32) -> Option<Self> {
        match code {
            1..=8 => Some(Self::ALL[(code - 1) as usize]),
            _ => None,
        }
    }

    pub fn exif_code(self) -> u32 {
        match self {
            Orientation::Identity => 1,
            Orientation::FlipHorizontal => 2,
            Orientation::Rotate180 => 3,
            Orientation::FlipVertical => 4,
            Orientation::Transpose => 5,
            Orientation::Rotate90Cw => 6,
            Orientation::Transverse => 7,
            Orientation::Rotate90Ccw => 8,
        }
    }

    /// True when oriented width is the raw height.
    pub fn swaps_axes(self) -> bool {
        self.exif_code() >= 5
    }

    /// Linear part of the raw → oriented mapping, row-major:
    /// `oriented = matrix · raw + offset`.
    pub fn matrix(self) -> [[i32; 2]; 2] {
        match self {
            Orientation::Identity => [[1, 0], [0, 1]],
            Orientation::FlipHorizontal => [[-1, 0], [0, 1]],
            Orientation::Rotate180 => [[-1, 0], [0, -1]],
            Orientation::FlipVertical => [[1, 0], [0, -1]],
            Orientation::Transpose => [[0, 1], [1, 0]],
            Orientation::Rotate90Cw => [[0, -1], [1, 0]],
            Orientation::Transverse => [[0, -1], [-1, 0]],
            Orientation::Rotate90Ccw => [[0, 1], [-1, 0]],
        }
    }

    /// The orientation that undoes this one.
    pub fn inverse(self) -> Self {
        match self {
            Orientation::Rotate90Cw => Orientation::Rotate90Ccw,
            Orientation::Rotate90Ccw => Orientation::Rotate90Cw,
            other => other,
        }
    }

    pub fn oriented_size(self, raw_width: u32, raw_height: u32) -> (u32, u32) {
        if self.swaps_axes() {
            (raw_height, raw_width)
        } else {
            (raw_width, raw_height)
        }
    }

    fn offset(self, raw: Size) -> (f64, f64) {
        let m = self.matrix();
        let extent = [raw.width, raw.height];
        let row = |r: [i32; 2]| -> f64 {
            r.iter()
                .zip(extent)
                .map(|(&c, e)| if c < 0 { e } else { 0.0 })
                .sum()
        };
        (row(m[0]), row(m[1]))
    }

    /// Map a continuous raw position into oriented pixel space. `raw` is the
    /// raw image size.
    pub fn oriented_for_raw(self, p: RawPoint, raw: Size) -> ImagePoint {
        let m = self.matrix();
        let (tx, ty) = self.offset(raw);
        ImagePoint::new(
            f64::from(m[0][0]) * p.x + f64::from(m[0][1]) * p.y + tx,
            f64::from(m[1][0]) * p.x + f64::from(m[1][1]) * p.y + ty,
        )
    }

    /// Inverse of [`Orientation::oriented_for_raw`]; the matrix is
    /// orthogonal so its transpose undoes it.
    pub fn raw_for_oriented(self, p: ImagePoint, raw: Size) -> RawPoint {
        let m = self.matrix();
        let (tx, ty) = self.offset(raw);
        let (dx, dy) = (p.x - tx, p.y - ty);
        RawPoint::new(
            f64::from(m[0][0]) * dx + f64::from(m[1][0]) * dy,
            f64::from(m[0][1]) * dx + f64::from(m[1][1]) * dy,
        )
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Orientation::Identity => "Identity",
            Orientation::FlipHorizontal => "Flip horizontal",
            Orientation::Rotate180 => "Rotate 180°",
            Orientation::FlipVertical => "Flip vertical",
            Orientation::Transpose => "Transpose",
            Orientation::Rotate90Cw => "Rotate 90° CW",
            Orientation::Transverse => "Transverse",
            Orientation::Rotate90Ccw => "Rotate 90° CCW",
        };
        write!(f, "{name} ({})", self.exif_code())
    }
}
