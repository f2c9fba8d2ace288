use crate::{
    AttributeDefinition, ColumnTrait, Entity, EntityDefinition, Error, FilterType,
    Result, Row, Selection, Value, ValueFilter,
};

/// `UPDATE … SET … WHERE …` over the rows matched by a selection.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateSet {
    pub selection: Selection,
    pub values: Vec<(&'static AttributeDefinition, Value)>,
}

impl UpdateSet {
    /// The selection may carry filters and joins, nothing else.
    pub fn new(selection: Selection) -> Result<Self> {
        selection.ensure_mutable("update")?;
        Ok(Self {
            selection,
            values: Vec::new(),
        })
    }

    pub fn set(mut self, column: impl ColumnTrait, value: impl Into<Value>) -> Result<Self> {
        let attribute = column.attribute();
        if !attribute.is_updateable() {
            return Err(Error::msg(format!("{attribute:?} is not updateable")));
        }
        if attribute.location != self.selection.definition.location {
            return Err(Error::msg(format!(
                "{attribute:?} does not belong to {:?}",
                self.selection.definition
            )));
        }
        let value = value.into();
        if let Some(entry) = self.values.iter_mut().find(|(v, _)| *v == attribute) {
            entry.1 = value;
        } else {
            self.values.push((attribute, value));
        }
        Ok(self)
    }

    /// Every updateable attribute of `item`, filtered on its primary key.
    pub fn from_item<E: Entity>(item: &E) -> Result<Self> {
        let definition = E::definition();
        let row = checked_row(definition, item.row())?;
        let mut selection = Selection::new(definition);
        for key in definition.primary_key() {
            let value = row[key.ordinal].clone();
            if value.is_null() {
                return Err(Error::msg(format!(
                    "Cannot update {definition:?}, primary key {key:?} is NULL"
                )));
            }
            selection =
                selection.filter(ValueFilter::new(key, FilterType::Equality, [value])?);
        }
        if selection.filters.is_empty() {
            return Err(Error::msg(format!(
                "Cannot update {definition:?} by item, it has no primary key"
            )));
        }
        let mut result = Self::new(selection)?;
        result.values = definition
            .updateable()
            .map(|v| (v, row[v.ordinal].clone()))
            .collect();
        if result.values.is_empty() {
            return Err(Error::msg(format!(
                "Cannot update {definition:?} by item, it has no updateable attribute"
            )));
        }
        Ok(result)
    }

    /// An UPDATE needs at least one SET assignment.
    pub fn ensure_assignments(&self) -> Result<()> {
        if self.values.is_empty() {
            return Err(Error::msg(format!(
                "Update of {:?} assigns no value",
                self.selection.definition
            )));
        }
        Ok(())
    }

    /// SET values (NULLs excluded) followed by the filter operands.
    pub fn arguments(&self) -> Vec<Value> {
        let mut result: Vec<Value> = self
            .values
            .iter()
            .map(|(_, v)| v)
            .filter(|v| !v.is_null())
            .cloned()
            .collect();
        result.extend(self.selection.arguments());
        result
    }
}

/// Single item `INSERT` returning the server generated values.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertItem {
    pub definition: &'static EntityDefinition,
    pub row: Row,
}

impl InsertItem {
    pub fn of<E: Entity>(item: &E) -> Result<Self> {
        let definition = E::definition();
        Ok(Self {
            definition,
            row: checked_row(definition, item.row())?,
        })
    }

    /// Insertable attributes with their value.
    pub fn values(&self) -> impl Iterator<Item = (&'static AttributeDefinition, &Value)> {
        self.definition
            .insertable()
            .map(|v| (v, &self.row[v.ordinal]))
    }

    pub fn arguments(&self) -> Vec<Value> {
        self.values()
            .map(|(_, v)| v)
            .filter(|v| !v.is_null())
            .cloned()
            .collect()
    }
}

/// Rows produced by [`Entity::row`] must be aligned with the definition.
pub(crate) fn checked_row(definition: &EntityDefinition, row: Row) -> Result<Row> {
    if row.len() != definition.attributes.len() {
        return Err(Error::msg(format!(
            "Row of {definition:?} has {} values, expected {}",
            row.len(),
            definition.attributes.len()
        )));
    }
    Ok(row)
}
