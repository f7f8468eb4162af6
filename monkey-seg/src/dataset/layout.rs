use super::VIA_ANNOTATION_FILE;
use crate::common::*;

/// Where the annotation file and the images live in a dataset directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetLayout {
    pub dir: PathBuf,
    #[serde(default = "default_annotation_file")]
    pub annotation_file: String,
    #[serde(default = "default_image_dir")]
    pub image_dir: String,
    /// File name pattern of images inside the image directory.
    #[serde(default = "default_image_glob")]
    pub image_glob: String,
}

impl DatasetLayout {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_owned(),
            annotation_file: default_annotation_file(),
            image_dir: default_image_dir(),
            image_glob: default_image_glob(),
        }
    }

    pub fn annotation_path(&self) -> PathBuf {
        self.dir.join(&self.annotation_file)
    }

    pub fn image_path(&self, filename: &str) -> PathBuf {
        self.dir.join(&self.image_dir).join(filename)
    }

    /// List the names of image files in the image directory, sorted by name.
    pub fn list_image_files(&self) -> Result<Vec<String>> {
        let image_dir = self.dir.join(&self.image_dir);
        let pattern = format!("{}/{}", image_dir.display(), self.image_glob);

        let paths: Vec<PathBuf> = glob::glob(&pattern)
            .with_context(|| format!("invalid image file pattern '{}'", pattern))?
            .try_collect()?;
        let filenames: Vec<_> = paths
            .into_iter()
            .filter(|path| path.is_file())
            .filter_map(|path| {
                let name = path.file_name()?.to_str()?.to_owned();
                Some(name)
            })
            .sorted()
            .collect();

        debug!(
            "found {} image files in '{}'",
            filenames.len(),
            image_dir.display()
        );
        Ok(filenames)
    }
}

fn default_annotation_file() -> String {
    VIA_ANNOTATION_FILE.into()
}

fn default_image_dir() -> String {
    "images".into()
}

fn default_image_glob() -> String {
    "*.*".into()
}
