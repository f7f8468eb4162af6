//! Polygon-annotated instance segmentation datasets and the k-fold hyperparameter search
//! built on top of them.

mod common;
pub mod cycle;
pub mod dataset;
pub mod detector;
pub mod error;
pub mod eval;
pub mod params;
pub mod search;
pub mod split;

pub use cycle::*;
pub use dataset::*;
pub use detector::*;
pub use error::*;
pub use eval::*;
pub use params::*;
pub use search::*;
pub use split::*;
