//! View parameters and the pointer-driven interaction built on them.

mod filter;
mod pointer;
mod state;

pub use filter::PixelFilter;
pub use pointer::PointerResponse;
pub use state::ViewState;
