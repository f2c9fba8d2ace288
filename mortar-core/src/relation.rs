use crate::{AttributeDefinition, EntityLocation};

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinType {
    #[default]
    Inner,
    Left,
}

/// Join from an attribute of the selected entity (or of an already joined table) to the
/// attribute of another table.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    pub join: JoinType,
    pub source: &'static AttributeDefinition,
    pub target: &'static AttributeDefinition,
}

impl Relation {
    /// Table brought in by the join.
    pub fn location(&self) -> &EntityLocation {
        &self.target.location
    }
}
