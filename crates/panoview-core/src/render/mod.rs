//! Drawing a [`TiledTexture`] through a [`ViewState`].
//!
//! Flat images use the rectangular strategy: tile quads placed in oriented
//! pixel space. Panoramas use the spherical strategy: every window pixel is
//! turned into a viewing direction and looked up in the equirectangular
//! image. Both skip tiles whose uploads have not completed.

pub mod cpu;
#[cfg(feature = "gpu")]
pub mod wgpu_renderer;

use std::fmt;

use crate::coords::{heading_pitch_for_direction, ImagePoint, Size};
use crate::error::Result;
use crate::math::{DMat3, DVec3};
use crate::texture::TiledTexture;
use crate::view::ViewState;

pub use cpu::CpuRenderer;
#[cfg(feature = "gpu")]
pub use wgpu_renderer::WgpuRenderer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStrategy {
    Rectangular,
    Spherical,
}

impl RenderStrategy {
    pub fn for_view(view: &ViewState) -> Self {
        if view.is_360() {
            RenderStrategy::Spherical
        } else {
            RenderStrategy::Rectangular
        }
    }
}

impl fmt::Display for RenderStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderStrategy::Rectangular => write!(f, "Rectangular"),
            RenderStrategy::Spherical => write!(f, "Spherical"),
        }
    }
}

/// What one `paint` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    pub strategy: RenderStrategy,
    pub tiles_drawn: usize,
    /// Tiles skipped because their upload fence has not signaled.
    pub tiles_pending: usize,
}

/// Common contract of the renderers.
pub trait Renderer {
    /// Draw one frame. With no texture only the background is drawn.
    fn paint(&mut self, view: &ViewState, texture: Option<&TiledTexture>) -> Result<FrameStats>;
}

/// Oriented pixel of an equirectangular image seen in world direction
/// `world`, given the pose rotation of the panorama. The result always
/// lies in `[0, width) × [0, height)`; heading 180° wraps to column 0.
pub fn equirect_point(world: DVec3, pose_rotation: &DMat3, image: Size) -> ImagePoint {
    let hp = heading_pitch_for_direction(*pose_rotation * world);
    ImagePoint::new(
        ((hp.heading / 360.0 + 0.5) * image.width).rem_euclid(image.width),
        ((0.5 - hp.pitch / 180.0) * image.height).min(image.height * (1.0 - f64::EPSILON)),
    )
}
