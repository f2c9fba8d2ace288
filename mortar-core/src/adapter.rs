use crate::{
    AsValue, CompiledCommand, Driver, Entity, Error, Executor, InsertItem, Page, Query,
    RepositoryError, RepositoryResult, Result, RowLabeled, Selection, SqlWriter,
    StructuredInsert, StructuredMerge, UpdateSet, Value,
    stream::{StreamExt, TryStreamExt},
    truncate_long,
};
use std::{fmt::Debug, pin::pin, ptr};

/// Executes compiled statements through an [`Executor`] (a connection or a transaction),
/// turning every failure into a [`RepositoryError`] about the selection or item involved.
pub struct RepositoryAdapter<D: Driver> {
    driver: D,
    writer: D::SqlWriter,
}

impl<D: Driver> RepositoryAdapter<D> {
    pub fn new(driver: D) -> Self {
        let writer = driver.sql_writer();
        Self { driver, writer }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn writer(&self) -> &D::SqlWriter {
        &self.writer
    }

    pub fn select_query(&self, selection: &Selection) -> Query {
        let mut sql = String::new();
        self.writer.write_select(&mut sql, selection);
        Query::new(sql).with_arguments(selection.arguments())
    }

    pub fn exists_query(&self, selection: &Selection) -> Query {
        let mut sql = String::new();
        self.writer.write_exists(&mut sql, selection);
        Query::new(sql).with_arguments(selection.arguments())
    }

    pub fn update_query(&self, update: &UpdateSet) -> Result<Query> {
        update.ensure_assignments()?;
        let mut sql = String::new();
        self.writer.write_update(&mut sql, update);
        Ok(Query::new(sql).with_arguments(update.arguments()))
    }

    pub fn delete_query(&self, selection: &Selection) -> Result<Query> {
        selection.ensure_mutable("delete")?;
        let mut sql = String::new();
        self.writer.write_delete(&mut sql, selection);
        Ok(Query::new(sql).with_arguments(selection.arguments()))
    }

    pub fn insert_query(&self, item: &InsertItem) -> Query {
        let mut sql = String::new();
        self.writer.write_insert_item(&mut sql, item);
        Query::new(sql).with_arguments(item.arguments())
    }

    /// Compile a bulk insert with the row source of the driver.
    pub fn compile_insert<T: Entity, S: Entity>(
        &self,
        command: &StructuredInsert<T, S>,
    ) -> Result<CompiledCommand<S, D::RowSource>> {
        command.compile(&self.writer, self.driver.row_source())
    }

    /// Compile a bulk merge with the row source of the driver.
    pub fn compile_merge<T: Entity, S: Entity>(
        &self,
        command: &StructuredMerge<T, S>,
    ) -> Result<CompiledCommand<S, D::RowSource>> {
        command.compile(&self.writer, self.driver.row_source())
    }

    /// Whether the selection matches at least one row.
    pub async fn contains<E: Executor>(
        &self,
        executor: &mut E,
        selection: &Selection,
    ) -> RepositoryResult<bool> {
        let result: Result<bool> = async {
            let value = first_value(executor, self.exists_query(selection))
                .await?
                .ok_or_else(|| Error::msg("Existence check returned no row"))?;
            bool::try_from_value(value)
        }
        .await;
        result.map_err(|e| RepositoryError::new("contains", selection, e))
    }

    /// First matching item, paging the selection to one row when it is not paged already.
    pub async fn first_or_default<T: Entity, E: Executor>(
        &self,
        executor: &mut E,
        selection: &Selection,
    ) -> RepositoryResult<Option<T>> {
        let result: Result<Option<T>> = async {
            ensure_selects::<T>(selection)?;
            let mut selection = selection.clone();
            if selection.page.is_none() && selection.links.is_empty() {
                selection.page = Some(Page {
                    offset: 0,
                    size: Some(1),
                });
            }
            first_row(executor, self.select_query(&selection))
                .await?
                .map(T::from_row)
                .transpose()
        }
        .await;
        result.map_err(|e| RepositoryError::new("first_or_default", selection, e))
    }

    pub async fn select_items<T: Entity, E: Executor>(
        &self,
        executor: &mut E,
        selection: &Selection,
    ) -> RepositoryResult<Vec<T>> {
        let result: Result<Vec<T>> = async {
            ensure_selects::<T>(selection)?;
            let query = self.select_query(selection);
            log::debug!("Selecting {:?}: {}", selection.definition, query);
            executor
                .fetch(query)
                .and_then(|row| async move { T::from_row(row) })
                .try_collect()
                .await
        }
        .await;
        result.map_err(|e| RepositoryError::new("select_items", selection, e))
    }

    /// Insert one item, returning it as stored (identity and computed values included).
    pub async fn insert<T: Entity + Debug, E: Executor>(
        &self,
        executor: &mut E,
        item: &T,
    ) -> RepositoryResult<T> {
        let result: Result<T> = async {
            let query = self.insert_query(&InsertItem::of(item)?);
            let row = first_row(executor, query)
                .await?
                .ok_or_else(|| Error::msg("Insert returned no row"))?;
            T::from_row(row)
        }
        .await;
        result.map_err(|e| RepositoryError::new("insert", item, e))
    }

    /// Apply the update, returning the number of rows changed.
    pub async fn update<E: Executor>(
        &self,
        executor: &mut E,
        update: &UpdateSet,
    ) -> RepositoryResult<u64> {
        let result: Result<u64> = async {
            let query = self.update_query(update)?;
            log::debug!("Updating {:?}: {}", update.selection.definition, query);
            executor.execute(query).await.map(|v| v.rows_affected)
        }
        .await;
        result.map_err(|e| RepositoryError::new("update", update, e))
    }

    /// Update every updateable attribute of `item`, matched on its primary key.
    pub async fn update_item<T: Entity + Debug, E: Executor>(
        &self,
        executor: &mut E,
        item: &T,
    ) -> RepositoryResult<u64> {
        let update = UpdateSet::from_item(item)
            .map_err(|e| RepositoryError::new("update_item", item, e))?;
        self.update(executor, &update).await
    }

    pub async fn delete_selection<E: Executor>(
        &self,
        executor: &mut E,
        selection: &Selection,
    ) -> RepositoryResult<u64> {
        let result: Result<u64> = async {
            let query = self.delete_query(selection)?;
            log::debug!("Deleting {:?}: {}", selection.definition, query);
            executor.execute(query).await.map(|v| v.rows_affected)
        }
        .await;
        result.map_err(|e| RepositoryError::new("delete_selection", selection, e))
    }

    /// Bulk insert of `items`, returning the number of rows written.
    pub async fn insert_rows<T: Entity, S: Entity + Debug, E: Executor>(
        &self,
        executor: &mut E,
        command: &StructuredInsert<T, S>,
        items: &[S],
    ) -> RepositoryResult<u64> {
        self.write_rows("insert_rows", self.compile_insert(command), executor, items)
            .await
    }

    /// Bulk insert of `items` selecting the inserted rows, decoded as `R`.
    pub async fn insert_rows_returning<R: Entity, T: Entity, S: Entity + Debug, E: Executor>(
        &self,
        executor: &mut E,
        command: &StructuredInsert<T, S>,
        items: &[S],
    ) -> RepositoryResult<Vec<R>> {
        self.select_rows("insert_rows", self.compile_insert(command), executor, items)
            .await
    }

    /// Bulk merge of `items`, returning the number of rows inserted, updated or deleted.
    pub async fn merge_rows<T: Entity, S: Entity + Debug, E: Executor>(
        &self,
        executor: &mut E,
        command: &StructuredMerge<T, S>,
        items: &[S],
    ) -> RepositoryResult<u64> {
        self.write_rows("merge_rows", self.compile_merge(command), executor, items)
            .await
    }

    /// Bulk merge of `items` selecting the inserted or updated rows, decoded as `R`.
    pub async fn merge_rows_returning<R: Entity, T: Entity, S: Entity + Debug, E: Executor>(
        &self,
        executor: &mut E,
        command: &StructuredMerge<T, S>,
        items: &[S],
    ) -> RepositoryResult<Vec<R>> {
        self.select_rows("merge_rows", self.compile_merge(command), executor, items)
            .await
    }

    async fn write_rows<S: Entity + Debug, E: Executor>(
        &self,
        operation: &'static str,
        command: Result<CompiledCommand<S, D::RowSource>>,
        executor: &mut E,
        items: &[S],
    ) -> RepositoryResult<u64> {
        let result: Result<u64> = async {
            let command = command?;
            log::debug!(
                "Writing {} rows of {:?}: {}",
                items.len(),
                S::definition(),
                truncate_long!(command.sql())
            );
            command
                .execute(executor, items)
                .await
                .map(|v| v.rows_affected)
        }
        .await;
        result.map_err(|e| RepositoryError::new(operation, &items, e))
    }

    async fn select_rows<R: Entity, S: Entity + Debug, E: Executor>(
        &self,
        operation: &'static str,
        command: Result<CompiledCommand<S, D::RowSource>>,
        executor: &mut E,
        items: &[S],
    ) -> RepositoryResult<Vec<R>> {
        let result: Result<Vec<R>> = async {
            let command = command?;
            log::debug!(
                "Writing {} rows of {:?}: {}",
                items.len(),
                S::definition(),
                truncate_long!(command.sql())
            );
            command.select_results(executor, items).await
        }
        .await;
        result.map_err(|e| RepositoryError::new(operation, &items, e))
    }

    /// First column of the first row, `None` when there is no row or the value is NULL.
    pub async fn execute_scalar<T: AsValue, E: Executor>(
        &self,
        executor: &mut E,
        query: Query,
    ) -> RepositoryResult<Option<T>> {
        let sql = query.sql.clone();
        let result: Result<Option<T>> = async {
            match first_value(executor, query).await? {
                Some(value) => Option::<T>::try_from_value(value),
                None => Ok(None),
            }
        }
        .await;
        result.map_err(|e| RepositoryError::new("execute_scalar", &sql, e))
    }
}

fn ensure_selects<T: Entity>(selection: &Selection) -> Result<()> {
    if !ptr::eq(selection.definition, T::definition()) {
        return Err(Error::msg(format!(
            "Selection of {:?} cannot produce items of {:?}",
            selection.definition,
            T::definition()
        )));
    }
    Ok(())
}

async fn first_row<E: Executor>(executor: &mut E, query: Query) -> Result<Option<RowLabeled>> {
    let mut stream = pin!(executor.fetch(query));
    stream.next().await.transpose()
}

async fn first_value<E: Executor>(executor: &mut E, query: Query) -> Result<Option<Value>> {
    Ok(first_row(executor, query)
        .await?
        .and_then(|row| row.values.into_vec().into_iter().next()))
}

/// Synchronous face of [`RepositoryAdapter`], running each operation to completion on the
/// calling thread.
pub struct BlockingAdapter<D: Driver> {
    adapter: RepositoryAdapter<D>,
}

impl<D: Driver> BlockingAdapter<D> {
    pub fn new(driver: D) -> Self {
        Self {
            adapter: RepositoryAdapter::new(driver),
        }
    }

    pub fn adapter(&self) -> &RepositoryAdapter<D> {
        &self.adapter
    }

    pub fn contains<E: Executor>(
        &self,
        executor: &mut E,
        selection: &Selection,
    ) -> RepositoryResult<bool> {
        futures::executor::block_on(self.adapter.contains(executor, selection))
    }

    pub fn first_or_default<T: Entity, E: Executor>(
        &self,
        executor: &mut E,
        selection: &Selection,
    ) -> RepositoryResult<Option<T>> {
        futures::executor::block_on(self.adapter.first_or_default(executor, selection))
    }

    pub fn select_items<T: Entity, E: Executor>(
        &self,
        executor: &mut E,
        selection: &Selection,
    ) -> RepositoryResult<Vec<T>> {
        futures::executor::block_on(self.adapter.select_items(executor, selection))
    }

    pub fn insert<T: Entity + Debug, E: Executor>(
        &self,
        executor: &mut E,
        item: &T,
    ) -> RepositoryResult<T> {
        futures::executor::block_on(self.adapter.insert(executor, item))
    }

    pub fn update<E: Executor>(&self, executor: &mut E, update: &UpdateSet) -> RepositoryResult<u64> {
        futures::executor::block_on(self.adapter.update(executor, update))
    }

    pub fn update_item<T: Entity + Debug, E: Executor>(
        &self,
        executor: &mut E,
        item: &T,
    ) -> RepositoryResult<u64> {
        futures::executor::block_on(self.adapter.update_item(executor, item))
    }

    pub fn delete_selection<E: Executor>(
        &self,
        executor: &mut E,
        selection: &Selection,
    ) -> RepositoryResult<u64> {
        futures::executor::block_on(self.adapter.delete_selection(executor, selection))
    }

    pub fn insert_rows<T: Entity, S: Entity + Debug, E: Executor>(
        &self,
        executor: &mut E,
        command: &StructuredInsert<T, S>,
        items: &[S],
    ) -> RepositoryResult<u64> {
        futures::executor::block_on(self.adapter.insert_rows(executor, command, items))
    }

    pub fn insert_rows_returning<R: Entity, T: Entity, S: Entity + Debug, E: Executor>(
        &self,
        executor: &mut E,
        command: &StructuredInsert<T, S>,
        items: &[S],
    ) -> RepositoryResult<Vec<R>> {
        futures::executor::block_on(self.adapter.insert_rows_returning(executor, command, items))
    }

    pub fn merge_rows<T: Entity, S: Entity + Debug, E: Executor>(
        &self,
        executor: &mut E,
        command: &StructuredMerge<T, S>,
        items: &[S],
    ) -> RepositoryResult<u64> {
        futures::executor::block_on(self.adapter.merge_rows(executor, command, items))
    }

    pub fn merge_rows_returning<R: Entity, T: Entity, S: Entity + Debug, E: Executor>(
        &self,
        executor: &mut E,
        command: &StructuredMerge<T, S>,
        items: &[S],
    ) -> RepositoryResult<Vec<R>> {
        futures::executor::block_on(self.adapter.merge_rows_returning(executor, command, items))
    }

    pub fn execute_scalar<T: AsValue, E: Executor>(
        &self,
        executor: &mut E,
        query: Query,
    ) -> RepositoryResult<Option<T>> {
        futures::executor::block_on(self.adapter.execute_scalar(executor, query))
    }
}
