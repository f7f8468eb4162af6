//! Polygon labels and the per-instance raster masks derived from them.

mod common;

pub use class::*;
mod class;

pub use mask::*;
pub mod mask;

pub use polygon::*;
pub mod polygon;

pub use region::*;
mod region;

pub use rle::*;
pub mod rle;
