use crate::{common::*, error::DatasetError};

/// The default annotation file name inside a dataset directory.
pub const VIA_ANNOTATION_FILE: &str = "via_region_data.json";

/// Image annotations exported by the VGG Image Annotator.
///
/// The VIA 1.x format stores the regions of an image in a mapping keyed by region
/// index, while VIA 2.x stores them in a list. Both are normalized into an ordered list
/// when the file is parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct ViaAnnotations {
    pub images: Vec<ViaImage>,
}

/// The annotations of one image.
#[derive(Debug, Clone, PartialEq)]
pub struct ViaImage {
    pub filename: String,
    pub regions: Vec<Region>,
}

impl ViaAnnotations {
    /// Parse the annotation file at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| DatasetError::AnnotationParse {
            path: path.to_owned(),
            reason: err.to_string(),
        })?;
        Self::parse(&text).map_err(|reason| {
            DatasetError::AnnotationParse {
                path: path.to_owned(),
                reason,
            }
            .into()
        })
    }

    /// Parse annotation text.
    ///
    /// The error is a human readable reason.
    pub fn parse(text: &str) -> Result<Self, String> {
        let document: schema::Document =
            serde_json::from_str(text).map_err(|err| err.to_string())?;

        let entries = match document {
            schema::Document::Map(map) => map.into_iter().map(|(_key, entry)| entry).collect(),
            schema::Document::List(list) => list,
        };

        let images: Vec<_> = entries
            .into_iter()
            .map(|entry| -> Result<_, String> {
                let schema::Entry { filename, regions } = entry;
                let regions: Vec<_> = regions
                    .into_vec()
                    .into_iter()
                    .enumerate()
                    .map(|(index, region)| -> Result<_, String> {
                        let schema::Region {
                            shape_attributes:
                                schema::ShapeAttributes {
                                    all_points_x,
                                    all_points_y,
                                },
                            region_attributes,
                        } = region;
                        let polygon = Polygon::new(all_points_x, all_points_y).map_err(|err| {
                            format!("region {} of '{}': {}", index, filename, err)
                        })?;
                        Ok(Region {
                            polygon,
                            attributes: region_attributes,
                        })
                    })
                    .try_collect()?;

                Ok(ViaImage { filename, regions })
            })
            .try_collect()?;

        Ok(Self { images })
    }

    /// Images that carry at least one region, in file order.
    pub fn annotated(&self) -> impl Iterator<Item = &ViaImage> {
        self.images.iter().filter(|image| !image.regions.is_empty())
    }
}

mod schema {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Debug, Deserialize)]
    #[serde(untagged)]
    pub enum Document {
        List(Vec<Entry>),
        Map(IndexMap<String, Entry>),
    }

    #[derive(Debug, Deserialize)]
    pub struct Entry {
        pub filename: String,
        pub regions: Regions,
    }

    #[derive(Debug, Deserialize)]
    #[serde(untagged)]
    pub enum Regions {
        List(Vec<Region>),
        Map(IndexMap<String, Region>),
    }

    impl Regions {
        pub fn into_vec(self) -> Vec<Region> {
            match self {
                Self::List(list) => list,
                Self::Map(map) => map.into_iter().map(|(_key, region)| region).collect(),
            }
        }
    }

    #[derive(Debug, Deserialize)]
    pub struct Region {
        pub shape_attributes: ShapeAttributes,
        #[serde(default)]
        pub region_attributes: BTreeMap<String, serde_json::Value>,
    }

    #[derive(Debug, Deserialize)]
    pub struct ShapeAttributes {
        pub all_points_x: Vec<i64>,
        pub all_points_y: Vec<i64>,
    }
}
