use super::{ColumnPair, MergePlan, ResultSpec, attributes, matching_source, resolve_pairs};
use crate::{
    Column, ColumnTrait, CompiledCommand, Entity, Error, Result, RowSource, SqlWriter,
    truncate_long,
};
use std::ptr;

/// Bulk `MERGE` of a row set of `S` into the table of `T`: matched rows are updated,
/// unmatched source rows inserted and, on request, unmatched target rows deleted.
///
/// The deletion branch is not atomic with the rest of the statement on every server
/// version, scope it with [`StructuredMerge::delete_unmatched_in_source_where`].
pub struct StructuredMerge<T: Entity, S: Entity = T> {
    target_columns: Vec<Column<T>>,
    source_columns: Vec<Column<S>>,
    on: Vec<(Column<T>, Column<S>)>,
    delete_unmatched: Option<Vec<Column<T>>>,
    result: ResultSpec<T, S>,
}

impl<T: Entity, S: Entity> Default for StructuredMerge<T, S> {
    fn default() -> Self {
        Self {
            target_columns: Vec::new(),
            source_columns: Vec::new(),
            on: Vec::new(),
            delete_unmatched: None,
            result: Default::default(),
        }
    }
}

impl<T: Entity, S: Entity> Clone for StructuredMerge<T, S> {
    fn clone(&self) -> Self {
        Self {
            target_columns: self.target_columns.clone(),
            source_columns: self.source_columns.clone(),
            on: self.on.clone(),
            delete_unmatched: self.delete_unmatched.clone(),
            result: self.result.clone(),
        }
    }
}

impl<T: Entity, S: Entity> StructuredMerge<T, S> {
    pub fn new() -> Self {
        Default::default()
    }

    /// Target columns to update and insert, every matching one when never called.
    pub fn merge_into(mut self, columns: impl IntoIterator<Item = Column<T>>) -> Self {
        self.target_columns.extend(columns);
        self
    }

    /// Source columns paired by position with [`StructuredMerge::merge_into`].
    pub fn from(mut self, columns: impl IntoIterator<Item = Column<S>>) -> Self {
        self.source_columns.extend(columns);
        self
    }

    /// Merge match pair, the primary key matched by name when never called.
    pub fn on(mut self, target: Column<T>, source: Column<S>) -> Self {
        self.on.push((target, source));
        self
    }

    /// Delete every target row the source does not match.
    pub fn delete_unmatched_in_source(mut self) -> Self {
        self.delete_unmatched.get_or_insert_with(Vec::new);
        self
    }

    /// Delete the unmatched target rows whose `columns` values appear in the source.
    pub fn delete_unmatched_in_source_where(
        mut self,
        columns: impl IntoIterator<Item = Column<T>>,
    ) -> Self {
        self.delete_unmatched
            .get_or_insert_with(Vec::new)
            .extend(columns);
        self
    }

    pub fn select_from_inserted(mut self) -> Self {
        self.result.enabled = true;
        self
    }

    pub fn selecting(mut self, columns: impl IntoIterator<Item = Column<T>>) -> Self {
        self.result.enabled = true;
        self.result.inserted.extend(columns);
        self
    }

    pub fn selecting_source(mut self, columns: impl IntoIterator<Item = Column<S>>) -> Self {
        self.result.enabled = true;
        self.result.source.extend(columns);
        self
    }

    pub fn matching_on(mut self, target: Column<T>, source: Column<S>) -> Self {
        self.result.matching.push((target, source));
        self
    }

    pub fn plan(&self) -> Result<MergePlan> {
        let target = T::definition();
        let source = S::definition();
        let on: Vec<_> = if self.on.is_empty() {
            resolve_pairs(target, source, target.primary_key().collect(), Vec::new())?
        } else {
            self.on
                .iter()
                .map(|(t, s)| ColumnPair {
                    target: t.attribute(),
                    source: s.attribute(),
                })
                .collect()
        };
        if on.is_empty() {
            return Err(Error::msg(format!(
                "Cannot merge into {target:?}: no match columns and no primary key"
            )));
        }
        let candidates: Vec<ColumnPair> = if self.target_columns.is_empty() {
            target
                .direct_attributes()
                .filter_map(|t| {
                    matching_source(source, t).map(|s| ColumnPair {
                        target: t,
                        source: s,
                    })
                })
                .collect()
        } else {
            resolve_pairs(
                target,
                source,
                attributes(&self.target_columns),
                attributes(&self.source_columns),
            )?
        };
        let is_match_column = |pair: &ColumnPair| on.iter().any(|v| ptr::eq(v.target, pair.target));
        let update: Vec<_> = candidates
            .iter()
            .filter(|v| v.target.is_updateable() && !is_match_column(*v))
            .copied()
            .collect();
        let insert: Vec<_> = candidates
            .iter()
            .filter(|v| v.target.is_insertable())
            .copied()
            .collect();
        let delete_unmatched = self
            .delete_unmatched
            .as_ref()
            .map(|columns| resolve_pairs(target, source, attributes(columns), Vec::new()))
            .transpose()?;
        if update.is_empty() && insert.is_empty() && delete_unmatched.is_none() {
            return Err(Error::msg(format!(
                "Nothing to merge from {source:?} into {target:?}"
            )));
        }
        Ok(MergePlan {
            target,
            source,
            on,
            update,
            insert,
            delete_unmatched,
            result: self.result.resolve()?,
        })
    }

    pub fn compile<W, R>(&self, writer: &W, row_source: R) -> Result<CompiledCommand<S, R>>
    where
        W: SqlWriter + ?Sized,
        R: RowSource,
    {
        let plan = self.plan()?;
        if plan.delete_unmatched.is_some() {
            log::warn!(
                "Merge into {:?} deletes unmatched rows, the deletion is not atomic with the rest of the statement",
                plan.target
            );
        }
        let mut sql = String::with_capacity(1024);
        writer.write_structured_merge(&mut sql, &plan, &row_source)?;
        log::debug!(
            "Compiled structured merge into {:?}: {}",
            plan.target,
            truncate_long!(sql)
        );
        Ok(CompiledCommand::new(sql, row_source, plan.result.is_some()))
    }
}
