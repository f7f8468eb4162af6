use super::{BACKGROUND_CLASS_ID, MONKEY_CLASS_ID};
use crate::common::*;
use label::AttributeClass;

/// How annotated regions are assigned to classes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassMapping {
    /// Every region gets the same class id.
    Constant(i32),
    /// The class is named by a region attribute.
    Attribute(AttributeClass),
}

impl Default for ClassMapping {
    fn default() -> Self {
        Self::Constant(MONKEY_CLASS_ID)
    }
}

impl ClassMapping {
    /// Check that every produced class id is a valid id of a model with `num_classes`
    /// classes including the background.
    pub fn check(&self, num_classes: usize) -> Result<()> {
        let ids: Vec<i32> = match self {
            Self::Constant(class_id) => vec![*class_id],
            Self::Attribute(assigner) => assigner
                .classes
                .values()
                .cloned()
                .chain(iter::once(assigner.fallback))
                .collect(),
        };
        ensure!(
            ids.iter()
                .all(|&id| id >= BACKGROUND_CLASS_ID && (id as usize) < num_classes),
            "class ids {:?} do not fit a model with {} classes",
            ids,
            num_classes
        );
        Ok(())
    }

    pub fn assigner(&self) -> Arc<dyn ClassAssigner> {
        match self {
            Self::Constant(class_id) => Arc::new(ConstantClass(*class_id)),
            Self::Attribute(assigner) => Arc::new(assigner.clone()),
        }
    }
}
