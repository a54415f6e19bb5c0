//! Panorama projections between the projection plane and view directions.
//!
//! The view looks along −z with +y up. Every projection maps the plane
//! origin to that forward direction.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::coords::ProjectedPoint;
use crate::math::DVec3;

const EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Projection {
    Gnomonic,
    #[default]
    Stereographic,
    Equidistant,
    Equirectangular,
}

impl Projection {
    pub const ALL: [Projection; 4] = [
        Projection::Gnomonic,
        Projection::Stereographic,
        Projection::Equidistant,
        Projection::Equirectangular,
    ];

    /// Index used by the spherical shader.
    pub fn shader_index(self) -> u32 {
        match self {
            Projection::Gnomonic => 0,
            Projection::Stereographic => 1,
            Projection::Equidistant => 2,
            Projection::Equirectangular => 3,
        }
    }

    /// Unit view direction for a point on the projection plane.
    pub fn direction_for_projected(self, p: ProjectedPoint) -> DVec3 {
        let (x, y) = (p.x, p.y);
        match self {
            Projection::Gnomonic => {
                let d = 1.0 / (x * x + y * y + 1.0).sqrt();
                DVec3::new(x * d, y * d, -d)
            }
            Projection::Stereographic => {
                let d = x * x + y * y + 4.0;
                DVec3::new(4.0 * x / d, 4.0 * y / d, (d - 8.0) / d)
            }
            Projection::Equidistant => {
                let r = (x * x + y * y).sqrt();
                if r < EPSILON {
                    return DVec3::new(0.0, 0.0, -1.0);
                }
                let d = r.sin() / r;
                DVec3::new(x * d, y * d, -r.cos())
            }
            Projection::Equirectangular => {
                let (sx, cx) = x.sin_cos();
                let (sy, cy) = y.sin_cos();
                DVec3::new(sx * cy, sy, -cx * cy)
            }
        }
    }

    /// Point on the projection plane for a view direction, or `None` where
    /// the projection is undefined (behind a gnomonic view, or the antipode).
    pub fn projected_for_direction(self, d: DVec3) -> Option<ProjectedPoint> {
        let d = d.try_normalize()?;
        match self {
            Projection::Gnomonic => {
                if -d.z < EPSILON {
                    return None;
                }
                Some(ProjectedPoint::new(d.x / -d.z, d.y / -d.z))
            }
            Projection::Stereographic => {
                if 1.0 - d.z < EPSILON {
                    return None;
                }
                let k = 2.0 / (1.0 - d.z);
                Some(ProjectedPoint::new(d.x * k, d.y * k))
            }
            Projection::Equidistant => {
                let r = (-d.z).clamp(-1.0, 1.0).acos();
                let s = r.sin();
                if s < EPSILON {
                    return if d.z < 0.0 {
                        Some(ProjectedPoint::new(0.0, 0.0))
                    } else {
                        None
                    };
                }
                Some(ProjectedPoint::new(d.x * r / s, d.y * r / s))
            }
            Projection::Equirectangular => Some(ProjectedPoint::new(
                d.x.atan2(-d.z),
                d.y.clamp(-1.0, 1.0).asin(),
            )),
        }
    }
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Projection::Gnomonic => write!(f, "Gnomonic"),
            Projection::Stereographic => write!(f, "Stereographic"),
            Projection::Equidistant => write!(f, "Equidistant"),
            Projection::Equirectangular => write!(f, "Equirectangular"),
        }
    }
}
