use futures::{future, stream};
use mortar_core::{
    Connection, Executor, Query, QueryResult, Result, RowLabeled, RowNames, RowsAffected,
    Transaction, Value, stream::Stream,
};
use std::{collections::VecDeque, future::Future};

type Handler = Box<dyn FnMut(&Query) -> Result<Vec<QueryResult>> + Send>;

/// In-memory connection: records every query it receives and answers through a handler.
pub struct MockConnection {
    /// Queries received so far, transaction statements included.
    pub queries: Vec<Query>,
    handler: Handler,
}

impl MockConnection {
    pub fn new<F>(handler: F) -> Self
    where
        F: FnMut(&Query) -> Result<Vec<QueryResult>> + Send + 'static,
    {
        Self {
            queries: Vec::new(),
            handler: Box::new(handler),
        }
    }

    /// Answers each query with the next scripted result, nothing once the script is over.
    pub fn replaying(script: impl IntoIterator<Item = Result<Vec<QueryResult>>>) -> Self {
        let mut script: VecDeque<_> = script.into_iter().collect();
        Self::new(move |_| script.pop_front().unwrap_or_else(|| Ok(Vec::new())))
    }

    pub fn last_query(&self) -> Option<&Query> {
        self.queries.last()
    }
}

impl Executor for MockConnection {
    fn run(&mut self, query: Query) -> impl Stream<Item = Result<QueryResult>> + Send {
        log::debug!("Mock connection received: {query}");
        let results = match (self.handler)(&query) {
            Ok(v) => v.into_iter().map(Ok).collect(),
            Err(e) => vec![Err(e)],
        };
        self.queries.push(query);
        stream::iter(results)
    }
}

impl Connection for MockConnection {
    type Transaction<'c> = MockTransaction<'c>;

    fn begin(&mut self) -> impl Future<Output = Result<MockTransaction<'_>>> + Send {
        self.queries.push(Query::new("BEGIN TRANSACTION;"));
        future::ready(Ok(MockTransaction { connection: self }))
    }
}

pub struct MockTransaction<'c> {
    connection: &'c mut MockConnection,
}

impl<'c> Executor for MockTransaction<'c> {
    fn run(&mut self, query: Query) -> impl Stream<Item = Result<QueryResult>> + Send {
        self.connection.run(query)
    }
}

impl<'c> Transaction<'c> for MockTransaction<'c> {
    fn commit(self) -> impl Future<Output = Result<()>> + Send {
        self.connection.queries.push(Query::new("COMMIT;"));
        future::ready(Ok(()))
    }

    fn rollback(self) -> impl Future<Output = Result<()>> + Send {
        self.connection.queries.push(Query::new("ROLLBACK;"));
        future::ready(Ok(()))
    }
}

/// Result row labelled with `names`.
pub fn labeled(names: &[&str], values: impl IntoIterator<Item = Value>) -> RowLabeled {
    let names: RowNames = names.iter().map(|v| v.to_string()).collect();
    RowLabeled::new(names, values.into_iter().collect())
}

pub fn affected(rows_affected: u64) -> QueryResult {
    QueryResult::Affected(RowsAffected { rows_affected })
}
