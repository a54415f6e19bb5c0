//! Images split into GPU-sized tiles, each with its own upload fence.

mod backend;
pub mod cpu;
pub mod layout;
mod tile;
#[cfg(feature = "gpu")]
pub mod wgpu_backend;

pub use backend::{create_backend, DevicePreference, Fence, TileBackend, TileSource, TileTexture};
pub use layout::{plan_tiles, Padding, QuadVertex, TilePlan, TileRegion};
pub use tile::{Tile, TiledTexture};
