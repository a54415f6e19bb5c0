//! Interpretation of orientation and panorama pose metadata.
//!
//! Problems here never fail a load: the offending value falls back to
//! its default and the reason is logged at debug level.

use thiserror::Error;

use crate::math::{pose_rotation, DMat3};
use crate::orientation::Orientation;
use crate::raster::{DecodedImage, PixelLayout, SourceFormat};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetadataError {
    #[error("orientation code {0} is outside 1..=8")]
    InvalidOrientation(u32),

    #[error("no XMP packet")]
    MissingXmp,

    #[error("XMP packet has no GPano pose")]
    MissingPose,

    #[error("pose field {field} is not a number: {value:?}")]
    MalformedPose { field: &'static str, value: String },
}

/// Capture pose of a panorama, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    pub heading_deg: f64,
    pub pitch_deg: f64,
    pub roll_deg: f64,
}

impl Pose {
    pub fn rotation(&self) -> DMat3 {
        pose_rotation(self.heading_deg, self.pitch_deg, self.roll_deg)
    }
}

/// Everything the view layer needs to know about a loaded image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageMetadata {
    pub source_name: String,
    pub raw_width: u32,
    pub raw_height: u32,
    /// Upright width.
    pub width: u32,
    /// Upright height.
    pub height: u32,
    pub orientation: Orientation,
    pub is_360: bool,
    pub pose: Option<Pose>,
    pub pose_rotation: DMat3,
    pub layout: PixelLayout,
    pub format: SourceFormat,
}

pub fn resolve_orientation(code: Option<u32>) -> Result<Orientation, MetadataError> {
    match code {
        None => Ok(Orientation::Identity),
        Some(c) => Orientation::from_exif(c).ok_or(MetadataError::InvalidOrientation(c)),
    }
}

const POSE_FIELDS: [&str; 3] = [
    "GPano:PoseHeadingDegrees",
    "GPano:PosePitchDegrees",
    "GPano:PoseRollDegrees",
];

/// Value of an XMP property written either as `name="v"` or as
/// `<name>v</name>`.
fn xmp_value<'a>(xmp: &'a str, name: &str) -> Option<&'a str> {
    let attribute = format!("{name}=");
    if let Some(pos) = xmp.find(&attribute) {
        let rest = &xmp[pos + attribute.len()..];
        let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
        let body = &rest[1..];
        return body.find(quote).map(|end| body[..end].trim());
    }
    let open = format!("<{name}>");
    let close = format!("</{name}>");
    let start = xmp.find(&open)? + open.len();
    let end = xmp[start..].find(&close)? + start;
    Some(xmp[start..end].trim())
}

/// Read the GPano pose. All three angles must be present; a partial pose
/// is treated as no pose at all.
pub fn parse_pose(xmp: &str) -> Result<Pose, MetadataError> {
    let mut angles = [0.0; 3];
    for (slot, field) in angles.iter_mut().zip(POSE_FIELDS) {
        let value = xmp_value(xmp, field).ok_or(MetadataError::MissingPose)?;
        *slot = value
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| MetadataError::MalformedPose {
                field,
                value: value.to_string(),
            })?;
    }
    Ok(Pose {
        heading_deg: angles[0],
        pitch_deg: angles[1],
        roll_deg: angles[2],
    })
}

/// Resolve the decoder's raw metadata into [`ImageMetadata`].
pub fn resolve_metadata(source_name: &str, image: &DecodedImage) -> ImageMetadata {
    let raw = image.metadata();
    let orientation = resolve_orientation(raw.exif_orientation).unwrap_or_else(|e| {
        tracing::debug!("{source_name}: {e}, using identity orientation");
        Orientation::Identity
    });
    let (width, height) = orientation.oriented_size(image.width(), image.height());
    let is_360 = width == 2 * height;

    let pose = if is_360 {
        raw.xmp
            .as_deref()
            .ok_or(MetadataError::MissingXmp)
            .and_then(parse_pose)
            .map_err(|e| tracing::debug!("{source_name}: {e}, using identity pose"))
            .ok()
    } else {
        None
    };
    let pose_rotation = pose.map(|p| p.rotation()).unwrap_or(DMat3::IDENTITY);

    ImageMetadata {
        source_name: source_name.to_string(),
        raw_width: image.width(),
        raw_height: image.height(),
        width,
        height,
        orientation,
        is_360,
        pose,
        pose_rotation,
        layout: image.layout(),
        format: image.format(),
    }
}
