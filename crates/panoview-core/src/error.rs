use thiserror::Error;

#[derive(Error, Debug)]
pub enum PanoviewError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not decode {source_name}: {message}")]
    Decode { source_name: String, message: String },

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Pixel buffer holds {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },

    #[error("Tile size {tile_size} is not usable with a maximum texture dimension of {max_dimension}")]
    HardwareLimit { tile_size: u32, max_dimension: u32 },

    #[error("Pixel layout {0} is not supported by the texture backend")]
    UnsupportedLayout(String),

    #[error("Graphics context error: {0}")]
    Context(String),

    #[error("GPU error: {0}")]
    GpuError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, PanoviewError>;
