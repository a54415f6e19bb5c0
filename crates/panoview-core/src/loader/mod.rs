//! Background image loading: decode, metadata, tile build and upload
//! polling on a worker thread, with single-flight cancellation.

mod decode;
mod events;
mod metadata;
mod pipeline;
mod request;

pub use decode::{Decoder, ImageCrateDecoder, LoadSource};
pub use events::{LoadEvent, LoadEventKind, LoadStage, LoadedImage};
pub use metadata::{parse_pose, resolve_metadata, resolve_orientation, ImageMetadata, MetadataError, Pose};
pub use pipeline::{ImageLoader, LoaderOptions};
pub use request::{LatestRequest, RequestToken};
