use crate::{Executor, Result};
use std::future::Future;

/// Live session with the server.
///
/// Associating a command with a transaction means running it through the executor the
/// transaction exposes, nothing in this crate opens or closes connections.
pub trait Connection: Executor {
    type Transaction<'c>: Transaction<'c>
    where
        Self: 'c;

    fn begin(&mut self) -> impl Future<Output = Result<Self::Transaction<'_>>> + Send;
}

pub trait Transaction<'c>: Executor {
    fn commit(self) -> impl Future<Output = Result<()>> + Send;
    fn rollback(self) -> impl Future<Output = Result<()>> + Send;
}
