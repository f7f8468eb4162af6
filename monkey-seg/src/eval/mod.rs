//! Mask average precision of detections against annotated instances.
//!
//! Images and ground truth are compared at the square size the detector runs at.

mod average_precision;
mod matching;
mod resize;
mod score;

pub use average_precision::*;
pub use matching::*;
pub use resize::*;
pub use score::*;
