use crate::{common::*, Polygon};
use std::collections::BTreeMap;

/// A labeled region: the outline polygon and the free-form attributes attached to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub polygon: Polygon,
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl Region {
    pub fn new(polygon: Polygon) -> Self {
        Self {
            polygon,
            attributes: BTreeMap::new(),
        }
    }

    /// Look up a string-valued attribute.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name)?.as_str()
    }
}
