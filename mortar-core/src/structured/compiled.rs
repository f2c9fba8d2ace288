use crate::{
    Entity, Error, ErrorContext, Executor, Query, Result, RowLabeled, RowSource, RowsAffected,
    mutation::checked_row,
    stream::{Stream, TryStreamExt},
};
use futures::TryFutureExt;
use std::{
    fmt::{self, Debug, Formatter},
    marker::PhantomData,
    sync::Arc,
};

/// Text of a structured command, compiled once and executed with a fresh row set of `S`
/// on every call.
pub struct CompiledCommand<S: Entity, R: RowSource> {
    sql: Arc<str>,
    row_source: R,
    returns_rows: bool,
    _source: PhantomData<fn(&S)>,
}

impl<S: Entity, R: RowSource> CompiledCommand<S, R> {
    pub(crate) fn new(sql: String, row_source: R, returns_rows: bool) -> Self {
        Self {
            sql: sql.into(),
            row_source,
            returns_rows,
            _source: PhantomData,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Whether the command ends with the SELECT of the inserted rows.
    pub fn returns_rows(&self) -> bool {
        self.returns_rows
    }

    /// Query binding `items` as the single row set argument.
    pub fn query<'a, I>(&self, items: I) -> Result<Query>
    where
        S: 'a,
        I: IntoIterator<Item = &'a S>,
    {
        let definition = S::definition();
        let rows = items
            .into_iter()
            .map(|v| checked_row(definition, v.row()))
            .collect::<Result<Vec<_>>>()?;
        let count = rows.len();
        let value = self
            .row_source
            .bind(definition, rows)
            .with_context(|| format!("While binding {count} rows of {definition:?}"))?;
        Ok(Query::new(self.sql.clone()).with_arguments([value]))
    }

    pub async fn execute<'a, E, I>(&self, executor: &mut E, items: I) -> Result<RowsAffected>
    where
        S: 'a,
        E: Executor,
        I: IntoIterator<Item = &'a S>,
    {
        let query = self.query(items)?;
        executor.execute(query).await
    }

    pub fn fetch<'a, E, I>(
        &self,
        executor: &mut E,
        items: I,
    ) -> impl Stream<Item = Result<RowLabeled>> + Send
    where
        S: 'a,
        E: Executor,
        I: IntoIterator<Item = &'a S>,
    {
        let query = self.query(items);
        async move { Ok::<_, Error>(executor.fetch(query?)) }.try_flatten_stream()
    }

    /// Inserted (or merged) rows, decoded as `T`.
    pub async fn select_results<'a, T, E, I>(&self, executor: &mut E, items: I) -> Result<Vec<T>>
    where
        S: 'a,
        T: Entity,
        E: Executor,
        I: IntoIterator<Item = &'a S>,
    {
        if !self.returns_rows {
            return Err(Error::msg(format!(
                "Command writing {:?} does not select its results",
                S::definition()
            )));
        }
        self.fetch(executor, items)
            .and_then(|row| async move { T::from_row(row) })
            .try_collect()
            .await
    }
}

impl<S: Entity, R: RowSource> Debug for CompiledCommand<S, R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledCommand")
            .field("source", S::definition())
            .field("sql", &self.sql)
            .field("returns_rows", &self.returns_rows)
            .finish()
    }
}
