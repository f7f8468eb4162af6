//! Common imports from external crates.

pub use anyhow::{bail, ensure, format_err, Context as _, Error, Result};
pub use bbox::{prelude::*, TLBR};
pub use chrono::Local;
pub use image::{DynamicImage, GenericImageView as _};
pub use itertools::Itertools as _;
pub use label::Rle;
pub use log::{debug, info, warn};
pub use noisy_float::prelude::*;
pub use serde::{Deserialize, Serialize};
pub use std::{
    fs, iter,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};
