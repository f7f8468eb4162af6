pub use anyhow::{ensure, Context as _, Result};
pub use bbox::{prelude::*, TLBR};
pub use image::{DynamicImage, GenericImageView as _};
pub use indexmap::IndexMap;
pub use itertools::{iproduct, Itertools as _};
pub use label::{ClassAssigner, ConstantClass, InstanceMasks, Polygon, Region};
pub use log::{debug, info, warn};
pub use ndarray::Array2;
pub use noisy_float::prelude::*;
pub use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
pub use serde::{Deserialize, Serialize, Serializer};
pub use std::{
    borrow::Borrow,
    cmp::Reverse,
    collections::HashSet,
    fmt::{self, Debug, Display},
    fs, iter,
    ops::Range,
    path::{Path, PathBuf},
    sync::Arc,
};
