//! Axis-aligned bounding box types in pixel space.

mod common;

pub use rect::*;
pub mod rect;

pub use tlbr::*;
pub mod tlbr;

pub mod prelude {
    pub use crate::rect::{Rect, RectExt};
}
