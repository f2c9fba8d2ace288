use crate::{RowSource, SqlWriter};

/// Dialect bundle: the writer compiling statements and the default row source strategy.
pub trait Driver: Send + Sync {
    type SqlWriter: SqlWriter + Send + Sync;
    type RowSource: RowSource + Clone;

    const NAME: &'static str;

    fn sql_writer(&self) -> Self::SqlWriter;
    fn row_source(&self) -> Self::RowSource;
}
