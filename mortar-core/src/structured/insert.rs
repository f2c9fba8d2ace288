use super::{InsertPlan, ResultSpec, attributes, resolve_pairs};
use crate::{
    Column, CompiledCommand, Entity, Error, Result, RowSource, SqlWriter, truncate_long,
};

/// Bulk `INSERT` of a row set of `S` into the table of `T`, optionally returning the
/// inserted rows with their server generated values.
///
/// ```ignore
/// let command = StructuredInsert::<Ledger>::new()
///     .select_from_inserted()
///     .compile(&writer, row_source)?;
/// let inserted: Vec<Ledger> = command.select_results(&mut connection, &ledgers).await?;
/// ```
pub struct StructuredInsert<T: Entity, S: Entity = T> {
    target_columns: Vec<Column<T>>,
    source_columns: Vec<Column<S>>,
    result: ResultSpec<T, S>,
}

impl<T: Entity, S: Entity> Default for StructuredInsert<T, S> {
    fn default() -> Self {
        Self {
            target_columns: Vec::new(),
            source_columns: Vec::new(),
            result: Default::default(),
        }
    }
}

impl<T: Entity, S: Entity> Clone for StructuredInsert<T, S> {
    fn clone(&self) -> Self {
        Self {
            target_columns: self.target_columns.clone(),
            source_columns: self.source_columns.clone(),
            result: self.result.clone(),
        }
    }
}

impl<T: Entity, S: Entity> StructuredInsert<T, S> {
    pub fn new() -> Self {
        Default::default()
    }

    /// Target columns, every insertable attribute when never called.
    pub fn insert_into(mut self, columns: impl IntoIterator<Item = Column<T>>) -> Self {
        self.target_columns.extend(columns);
        self
    }

    /// Source columns paired by position with the target ones, matched by name when never
    /// called.
    pub fn from(mut self, columns: impl IntoIterator<Item = Column<S>>) -> Self {
        self.source_columns.extend(columns);
        self
    }

    /// Return every direct attribute of the inserted rows.
    pub fn select_from_inserted(mut self) -> Self {
        self.result.enabled = true;
        self
    }

    /// Return only these attributes of the inserted rows.
    pub fn selecting(mut self, columns: impl IntoIterator<Item = Column<T>>) -> Self {
        self.result.enabled = true;
        self.result.inserted.extend(columns);
        self
    }

    /// Also return these source columns, joined with the inserted rows.
    pub fn selecting_source(mut self, columns: impl IntoIterator<Item = Column<S>>) -> Self {
        self.result.enabled = true;
        self.result.source.extend(columns);
        self
    }

    /// Correlate inserted and source rows on this pair instead of the primary key.
    pub fn matching_on(mut self, target: Column<T>, source: Column<S>) -> Self {
        self.result.matching.push((target, source));
        self
    }

    pub fn plan(&self) -> Result<InsertPlan> {
        let target = T::definition();
        let source = S::definition();
        let targets = if self.target_columns.is_empty() {
            target.insertable().collect()
        } else {
            attributes(&self.target_columns)
        };
        if let Some(v) = targets.iter().find(|v| !v.is_insertable()) {
            return Err(Error::msg(format!("Column {v:?} is not insertable")));
        }
        if targets.is_empty() {
            return Err(Error::msg(format!(
                "{target:?} has no insertable column"
            )));
        }
        let columns = resolve_pairs(target, source, targets, attributes(&self.source_columns))?;
        Ok(InsertPlan {
            target,
            source,
            columns,
            result: self.result.resolve()?,
        })
    }

    pub fn compile<W, R>(&self, writer: &W, row_source: R) -> Result<CompiledCommand<S, R>>
    where
        W: SqlWriter + ?Sized,
        R: RowSource,
    {
        let plan = self.plan()?;
        let mut sql = String::with_capacity(512);
        writer.write_structured_insert(&mut sql, &plan, &row_source)?;
        log::debug!(
            "Compiled structured insert into {:?}: {}",
            plan.target,
            truncate_long!(sql)
        );
        Ok(CompiledCommand::new(sql, row_source, plan.result.is_some()))
    }
}
