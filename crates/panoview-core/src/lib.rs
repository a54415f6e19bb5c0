pub mod config;
pub mod consts;
pub mod context;
pub mod coords;
pub mod error;
pub mod loader;
pub mod math;
pub mod orientation;
pub mod projection;
pub mod raster;
pub mod render;
pub mod selection;
pub mod texture;
pub mod view;
