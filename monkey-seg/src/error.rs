//! Failure kinds raised while building datasets.

use crate::common::*;

/// Dataset failures.
///
/// They are raised through [anyhow::Error]. Use `downcast_ref::<DatasetError>()` to tell
/// them apart from other failures.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to parse annotation file '{}': {reason}", .path.display())]
    AnnotationParse { path: PathBuf, reason: String },
    #[error("image file '{}' is missing or unreadable: {reason}", .path.display())]
    MissingImage { path: PathBuf, reason: String },
    #[error("image id {id} is not in the dataset")]
    UnknownImage { id: usize },
}
