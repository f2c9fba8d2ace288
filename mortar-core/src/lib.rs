mod adapter;
mod as_value;
mod column;
mod connection;
mod driver;
mod entity;
mod error;
mod executor;
mod filter;
mod location;
mod mutation;
mod query;
mod relation;
mod row_source;
mod selection;
mod structured;
mod util;
mod value;
pub mod writer;

pub use ::anyhow::Context as ErrorContext;
pub use adapter::*;
pub use as_value::*;
pub use column::*;
pub use connection::*;
pub use driver::*;
pub use entity::*;
pub use error::*;
pub use executor::*;
pub use filter::*;
pub use location::*;
pub use mutation::*;
pub use query::*;
pub use relation::*;
pub use row_source::*;
pub use selection::*;
pub use structured::*;
pub use util::*;
pub use value::*;
pub use writer::{Context, Fragment, GenericSqlWriter, Projection, SqlWriter};
pub mod stream {
    pub use ::futures::stream::*;
}
pub use ::futures::future;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
