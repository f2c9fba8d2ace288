mod compiled;
mod insert;
mod merge;

pub use compiled::*;
pub use insert::*;
pub use merge::*;

use crate::{AttributeDefinition, Column, ColumnTrait, Entity, EntityDefinition, Error, Result, Value};
use std::ptr;

/// Alias of the row source inside structured commands.
pub const SOURCE_ALIAS: &str = "source";
/// Alias of the merged table.
pub const TARGET_ALIAS: &str = "target";
/// Table variable collecting the OUTPUT rows, and its alias in the final SELECT.
pub const INSERTED_TABLE: &str = "inserted";
/// Extra column of the table variable holding the merge `$action`.
pub const MERGE_ACTION_COLUMN: &str = "__merge_action";

/// Target attribute fed by (or compared with) a source attribute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnPair {
    pub target: &'static AttributeDefinition,
    pub source: &'static AttributeDefinition,
}

/// OUTPUT capture and the correlated SELECT returned to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultPlan {
    /// Target attributes written into the table variable.
    pub captured: Vec<&'static AttributeDefinition>,
    /// Target attributes returned, all of them captured.
    pub inserted: Vec<&'static AttributeDefinition>,
    /// Source attributes returned, joined back through `matching`.
    pub source: Vec<&'static AttributeDefinition>,
    pub matching: Vec<ColumnPair>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertPlan {
    pub target: &'static EntityDefinition,
    pub source: &'static EntityDefinition,
    pub columns: Vec<ColumnPair>,
    pub result: Option<ResultPlan>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergePlan {
    pub target: &'static EntityDefinition,
    pub source: &'static EntityDefinition,
    pub on: Vec<ColumnPair>,
    pub update: Vec<ColumnPair>,
    pub insert: Vec<ColumnPair>,
    /// `WHEN NOT MATCHED BY SOURCE` is emitted when present, each pair scopes the deletion.
    pub delete_unmatched: Option<Vec<ColumnPair>>,
    pub result: Option<ResultPlan>,
}

impl MergePlan {
    /// The merge action is captured to drop deleted rows from the result.
    pub fn captures_action(&self) -> bool {
        self.result.is_some() && self.delete_unmatched.is_some()
    }
}

/// Result options shared by inserts and merges.
pub(crate) struct ResultSpec<T, S> {
    pub(crate) enabled: bool,
    pub(crate) inserted: Vec<Column<T>>,
    pub(crate) source: Vec<Column<S>>,
    pub(crate) matching: Vec<(Column<T>, Column<S>)>,
}

impl<T, S> Default for ResultSpec<T, S> {
    fn default() -> Self {
        Self {
            enabled: false,
            inserted: Vec::new(),
            source: Vec::new(),
            matching: Vec::new(),
        }
    }
}

impl<T, S> Clone for ResultSpec<T, S> {
    fn clone(&self) -> Self {
        Self {
            enabled: self.enabled,
            inserted: self.inserted.clone(),
            source: self.source.clone(),
            matching: self.matching.clone(),
        }
    }
}

impl<T: Entity, S: Entity> ResultSpec<T, S> {
    pub(crate) fn resolve(&self) -> Result<Option<ResultPlan>> {
        if !self.enabled {
            return Ok(None);
        }
        let target = T::definition();
        let source = S::definition();
        let inserted: Vec<_> = if self.inserted.is_empty() {
            target.direct_attributes().collect()
        } else {
            attributes(&self.inserted)
        };
        if let Some(related) = inserted.iter().find(|v| !v.is_direct()) {
            return Err(Error::msg(format!(
                "Cannot select {related:?} from the inserted rows, it is not a column of {target:?}"
            )));
        }
        let selected_source = attributes(&self.source);
        let matching = if selected_source.is_empty() {
            Vec::new()
        } else if !self.matching.is_empty() {
            self.matching
                .iter()
                .map(|(t, s)| ColumnPair {
                    target: t.attribute(),
                    source: s.attribute(),
                })
                .collect()
        } else {
            let matching: Vec<_> = target
                .primary_key()
                .map(|key| {
                    source
                        .direct_attributes()
                        .find(|v| v.physical_name == key.physical_name)
                        .map(|v| ColumnPair {
                            target: key,
                            source: v,
                        })
                        .ok_or_else(|| {
                            Error::msg(format!(
                                "Cannot correlate the inserted rows with {source:?}: no source column named like the key {key:?}"
                            ))
                        })
                })
                .collect::<Result<_>>()?;
            if matching.is_empty() {
                return Err(Error::msg(format!(
                    "Cannot correlate the inserted rows with {source:?}: {target:?} has no primary key"
                )));
            }
            matching
        };
        let mut captured = inserted.clone();
        for pair in &matching {
            if !captured.iter().any(|v| ptr::eq(*v, pair.target)) {
                captured.push(pair.target);
            }
        }
        for attribute in &captured {
            check_declarable(attribute)?;
            check_identity(attribute)?;
        }
        Ok(Some(ResultPlan {
            captured,
            inserted,
            source: selected_source,
            matching,
        }))
    }
}

pub(crate) fn attributes<E: Entity>(columns: &[Column<E>]) -> Vec<&'static AttributeDefinition> {
    columns.iter().map(ColumnTrait::attribute).collect()
}

/// Direct source attribute with the same reference name as `target`.
pub fn matching_source(
    source: &'static EntityDefinition,
    target: &AttributeDefinition,
) -> Option<&'static AttributeDefinition> {
    source
        .find(&target.reference_name())
        .filter(|v| v.is_direct())
}

/// Explicit pairs when `sources` is given, else each target with its matching source.
pub(crate) fn resolve_pairs(
    target: &'static EntityDefinition,
    source: &'static EntityDefinition,
    targets: Vec<&'static AttributeDefinition>,
    sources: Vec<&'static AttributeDefinition>,
) -> Result<Vec<ColumnPair>> {
    if !sources.is_empty() {
        if sources.len() != targets.len() {
            return Err(Error::msg(format!(
                "{} target columns of {target:?} but {} source columns of {source:?}",
                targets.len(),
                sources.len()
            )));
        }
        if let Some(related) = sources.iter().find(|v| !v.is_direct()) {
            return Err(Error::msg(format!(
                "Source column {related:?} is not a direct attribute of {source:?}"
            )));
        }
        return Ok(targets
            .into_iter()
            .zip(sources)
            .map(|(target, source)| ColumnPair { target, source })
            .collect());
    }
    targets
        .into_iter()
        .map(|t| {
            matching_source(source, t)
                .map(|s| ColumnPair {
                    target: t,
                    source: s,
                })
                .ok_or_else(|| {
                    Error::msg(format!(
                        "No column of {source:?} matches the target column {t:?}"
                    ))
                })
        })
        .collect()
}

/// Identity values come back through OUTPUT, only integral types are supported.
pub fn check_identity(attribute: &AttributeDefinition) -> Result<()> {
    if !attribute.identity {
        return Ok(());
    }
    match attribute.value {
        Value::UInt8(..) | Value::Int16(..) | Value::Int32(..) | Value::Int64(..) => Ok(()),
        Value::Decimal(.., 0) => Ok(()),
        ref v => Err(Error::msg(format!(
            "Identity column {attribute:?} has unsupported type {:?}",
            v.as_null()
        ))),
    }
}

/// The attribute type must be expressible as a column of a table variable.
pub fn check_declarable(attribute: &AttributeDefinition) -> Result<()> {
    if attribute.column_type.is_empty() && matches!(attribute.value, Value::Null | Value::Table(..))
    {
        return Err(Error::msg(format!(
            "Column {attribute:?} has no declarable type"
        )));
    }
    Ok(())
}
