use std::fmt;

use serde::{Deserialize, Serialize};

/// Texture reconstruction filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PixelFilter {
    /// Nearest texel.
    Sharp,
    Bilinear,
    /// Bilinear with smoothstep weights.
    Hermite,
    #[default]
    CatmullRom,
}

impl PixelFilter {
    pub const ALL: [PixelFilter; 4] = [
        PixelFilter::Sharp,
        PixelFilter::Bilinear,
        PixelFilter::Hermite,
        PixelFilter::CatmullRom,
    ];

    /// Index used by the shaders.
    pub fn shader_index(self) -> u32 {
        match self {
            PixelFilter::Sharp => 1,
            PixelFilter::Bilinear => 2,
            PixelFilter::Hermite => 3,
            PixelFilter::CatmullRom => 4,
        }
    }
}

impl fmt::Display for PixelFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PixelFilter::Sharp => write!(f, "Sharp"),
            PixelFilter::Bilinear => write!(f, "Bilinear"),
            PixelFilter::Hermite => write!(f, "Hermite"),
            PixelFilter::CatmullRom => write!(f, "Catmull-Rom"),
        }
    }
}
