pub use anyhow::{ensure, format_err, Result};
pub use bbox::{prelude::*, TLBR};
pub use itertools::Itertools as _;
pub use ndarray::{Array1, Array2, Array3, ArrayView2, ArrayViewMut2, Axis};
pub use serde::{Deserialize, Serialize};
