//! Polygon-annotated image datasets.

mod annotated;
mod classes;
mod layout;
mod record;
mod via;

pub use annotated::*;
pub use classes::*;
pub use layout::*;
pub use record::*;
pub use via::*;
