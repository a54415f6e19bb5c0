//! Rotation matrices for panorama viewing and capture pose.
//!
//! Directions use a right-handed frame with +y up and the default line of
//! sight along −z. Heading turns toward +x, pitch turns toward +y.

pub use glam::{DMat3, DVec3};

/// Build a matrix from rows, which reads closer to the usual notation
/// than glam's column constructors.
pub fn from_rows(r0: [f64; 3], r1: [f64; 3], r2: [f64; 3]) -> DMat3 {
    DMat3::from_cols_array_2d(&[r0, r1, r2]).transpose()
}

/// Rotation applied to a view-space direction to obtain the world direction
/// for a viewer looking at `heading_deg`/`pitch_deg`.
pub fn view_rotation(heading_deg: f64, pitch_deg: f64) -> DMat3 {
    let (sh, ch) = heading_deg.to_radians().sin_cos();
    let (sp, cp) = pitch_deg.to_radians().sin_cos();
    let heading = from_rows([ch, 0.0, -sh], [0.0, 1.0, 0.0], [sh, 0.0, ch]);
    let pitch = from_rows([1.0, 0.0, 0.0], [0.0, cp, -sp], [0.0, sp, cp]);
    heading * pitch
}

/// Rotation taking a world direction into the panorama's own frame, given
/// the capture pose. Roll is applied last, heading first.
pub fn pose_rotation(heading_deg: f64, pitch_deg: f64, roll_deg: f64) -> DMat3 {
    let (sh, ch) = heading_deg.to_radians().sin_cos();
    let (sp, cp) = pitch_deg.to_radians().sin_cos();
    let (sr, cr) = roll_deg.to_radians().sin_cos();
    let roll = from_rows([cr, -sr, 0.0], [sr, cr, 0.0], [0.0, 0.0, 1.0]);
    let pitch = from_rows([1.0, 0.0, 0.0], [0.0, cp, sp], [0.0, -sp, cp]);
    let heading = from_rows([ch, 0.0, sh], [0.0, 1.0, 0.0], [-sh, 0.0, ch]);
    roll * pitch * heading
}

/// Row-major `f32` copy, padded to three `vec4` rows for uniform buffers.
pub fn to_padded_rows(m: &DMat3) -> [[f32; 4]; 3] {
    let t = m.transpose();
    [
        [t.x_axis.x as f32, t.x_axis.y as f32, t.x_axis.z as f32, 0.0],
        [t.y_axis.x as f32, t.y_axis.y as f32, t.y_axis.z as f32, 0.0],
        [t.z_axis.x as f32, t.z_axis.y as f32, t.z_axis.z as f32, 0.0],
    ]
}
