use crate::Region;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt::Debug};

/// Assigns a class id to every labeled region.
pub trait ClassAssigner
where
    Self: Debug + Send + Sync,
{
    fn class_id(&self, region: &Region) -> i32;
}

/// Gives every region the same class id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantClass(pub i32);

impl ClassAssigner for ConstantClass {
    fn class_id(&self, _region: &Region) -> i32 {
        self.0
    }
}

/// Maps the value of a region attribute to a class id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeClass {
    /// The attribute holding the class name.
    pub attribute: String,
    pub classes: HashMap<String, i32>,
    /// The class id of regions whose attribute is missing or unknown.
    pub fallback: i32,
}

impl ClassAssigner for AttributeClass {
    fn class_id(&self, region: &Region) -> i32 {
        region
            .attribute(&self.attribute)
            .and_then(|name| self.classes.get(name))
            .cloned()
            .unwrap_or(self.fallback)
    }
}
