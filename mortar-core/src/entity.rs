use crate::{AttributeDefinition, EntityLocation, Result, Row, RowLabeled};
use std::fmt::{self, Debug, Formatter};

/// Mapped type backed by a static, cached [`EntityDefinition`].
pub trait Entity: Sized {
    /// Schema metadata, built once and kept for the whole program.
    fn definition() -> &'static EntityDefinition;

    /// Values of every attribute, ordered by ordinal.
    fn row(&self) -> Row;

    /// Rebuild an item from a result row labelled with [`AttributeDefinition::label`].
    fn from_row(row: RowLabeled) -> Result<Self>;
}

/// Schema metadata of a mapped type.
#[derive(Clone, PartialEq)]
pub struct EntityDefinition {
    pub name: &'static str,
    pub location: EntityLocation,
    pub attributes: Box<[AttributeDefinition]>,
    /// Server side table type a row set of this entity binds to.
    pub structured_type: Option<EntityLocation>,
}

impl EntityDefinition {
    pub fn builder(name: &'static str, location: EntityLocation) -> EntityDefinitionBuilder {
        EntityDefinitionBuilder {
            definition: EntityDefinition {
                name,
                location,
                attributes: Default::default(),
                structured_type: None,
            },
            attributes: Vec::new(),
        }
    }

    pub fn attributes(&self) -> impl Iterator<Item = &AttributeDefinition> + Clone {
        self.attributes.iter()
    }

    pub fn direct_attributes(&self) -> impl Iterator<Item = &AttributeDefinition> + Clone {
        self.attributes.iter().filter(|v| v.is_direct())
    }

    pub fn primary_key(&self) -> impl Iterator<Item = &AttributeDefinition> + Clone {
        self.attributes.iter().filter(|v| v.primary_key)
    }

    pub fn insertable(&self) -> impl Iterator<Item = &AttributeDefinition> + Clone {
        self.attributes.iter().filter(|v| v.is_insertable())
    }

    pub fn updateable(&self) -> impl Iterator<Item = &AttributeDefinition> + Clone {
        self.attributes.iter().filter(|v| v.is_updateable())
    }

    /// Attribute by reference name, falling back to the physical name of a direct attribute.
    pub fn find(&self, reference_name: &str) -> Option<&AttributeDefinition> {
        self.attributes
            .iter()
            .find(|v| v.reference_name() == reference_name)
            .or_else(|| {
                self.direct_attributes()
                    .find(|v| v.physical_name == reference_name)
            })
    }
}

impl Debug for EntityDefinition {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.location.full_name())
    }
}

pub struct EntityDefinitionBuilder {
    definition: EntityDefinition,
    attributes: Vec<AttributeDefinition>,
}

impl EntityDefinitionBuilder {
    /// Appends the next attribute, its ordinal is the insertion position.
    pub fn attribute(mut self, mut attribute: AttributeDefinition) -> Self {
        attribute.ordinal = self.attributes.len();
        if attribute.is_direct() {
            attribute.location = self.definition.location.clone();
        }
        self.attributes.push(attribute);
        self
    }

    pub fn structured_type(mut self, container: &'static str, name: &'static str) -> Self {
        self.definition.structured_type = Some(EntityLocation::table(container, name));
        self
    }

    pub fn build(mut self) -> EntityDefinition {
        self.definition.attributes = self.attributes.into();
        self.definition
    }
}

#[cfg(test)]
mod tests {
    use super::EntityDefinition;
    use crate::{AttributeDefinition, EntityLocation};

    #[test]
    fn builder_assigns_ordinals_and_locations() {
        let customer = EntityLocation::table("sales", "Customer");
        let definition = EntityDefinition::builder("Account", EntityLocation::table("dbo", "Account"))
            .attribute(AttributeDefinition::of::<i32>("Id").primary_key().identity())
            .attribute(AttributeDefinition::of::<String>("Code"))
            .attribute(
                AttributeDefinition::of::<String>("CustomerName")
                    .physical_name("Name")
                    .related("Customer", customer.clone()),
            )
            .build();
        let ordinals: Vec<_> = definition.attributes().map(|v| v.ordinal).collect();
        assert_eq!(ordinals, [0, 1, 2]);
        assert_eq!(definition.attributes[1].location, definition.location);
        assert_eq!(definition.attributes[2].location, customer);
        assert_eq!(definition.direct_attributes().count(), 2);
        assert_eq!(definition.insertable().count(), 1);
        assert!(definition.attributes[0].identity);
        assert_eq!(
            definition.find("Customer.CustomerName").map(|v| v.ordinal),
            Some(2)
        );
        assert!(definition.find("Name").is_none());
        assert_eq!(format!("{definition:?}"), "Account(dbo.Account)");
    }
}
