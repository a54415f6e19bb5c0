use std::time::Duration;

/// Default edge length of one texture tile, chosen well below the maximum
/// texture dimension of current desktop GPUs.
pub const DEFAULT_TILE_SIZE: u32 = 8192;

/// Overlap, in pixels, added on each interior edge of a tile so that
/// filtering across tile seams reads real neighbouring pixels.
pub const TILE_PADDING: u32 = 2;

/// Maximum texture dimension assumed by the CPU backend.
pub const CPU_MAX_TEXTURE_DIMENSION: u32 = 16384;

/// Smallest zoom factor, in windows per image.
pub const MIN_ZOOM: f64 = 0.30;

/// Distance in window pixels within which the pointer grabs a selection edge.
pub const HOVER_THRESHOLD_PX: f64 = 5.0;

/// Zoom multiplier for one mouse wheel notch.
pub const WHEEL_ZOOM_STEP: f64 = 1.25;

/// Sleep between fence polls while waiting for tile uploads.
pub const READY_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Pitch limit for panoramas, in degrees.
pub const MAX_PITCH_DEG: f64 = 90.0;

/// Bytes of the file head scanned for an XMP packet.
pub const XMP_SCAN_LIMIT: usize = 1 << 20;

/// Default clear colour (RGBA) behind the image.
pub const DEFAULT_BACKGROUND: [f32; 4] = [0.5, 0.5, 0.5, 1.0];
