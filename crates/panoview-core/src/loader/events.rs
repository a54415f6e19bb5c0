use std::fmt;

use crate::texture::TiledTexture;

use super::metadata::ImageMetadata;
use super::request::RequestToken;

/// Stages a load request moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStage {
    Requested,
    Decoding,
    MetadataRead,
    TextureBuilding,
    Uploading,
    Ready,
    Failed,
}

impl LoadStage {
    /// Progress percentage reported on entering the stage.
    pub fn base_percent(self) -> u8 {
        match self {
            LoadStage::Requested => 0,
            LoadStage::Decoding => 5,
            LoadStage::MetadataRead => 40,
            LoadStage::TextureBuilding => 45,
            LoadStage::Uploading => 85,
            LoadStage::Ready | LoadStage::Failed => 100,
        }
    }
}

impl fmt::Display for LoadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadStage::Requested => write!(f, "Requested"),
            LoadStage::Decoding => write!(f, "Decoding"),
            LoadStage::MetadataRead => write!(f, "Reading metadata"),
            LoadStage::TextureBuilding => write!(f, "Building textures"),
            LoadStage::Uploading => write!(f, "Uploading"),
            LoadStage::Ready => write!(f, "Ready"),
            LoadStage::Failed => write!(f, "Failed"),
        }
    }
}

/// A fully uploaded image.
#[derive(Debug)]
pub struct LoadedImage {
    pub texture: TiledTexture,
    pub metadata: ImageMetadata,
}

#[derive(Debug)]
pub enum LoadEventKind {
    /// Upright size, sent as soon as metadata is known.
    SizeKnown { width: u32, height: u32, is_360: bool },
    /// Advisory, monotonically increasing within a request.
    Progress { stage: LoadStage, percent: u8 },
    Ready(Box<LoadedImage>),
    Failed { reason: String },
}

/// An event from the loader thread, tagged with its request.
#[derive(Debug)]
pub struct LoadEvent {
    pub request: RequestToken,
    pub kind: LoadEventKind,
}

impl LoadEvent {
    /// True for the last event a request produces.
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, LoadEventKind::Ready(_) | LoadEventKind::Failed { .. })
    }
}
