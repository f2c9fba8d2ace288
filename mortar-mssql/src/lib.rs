mod driver;
mod json;
mod sql_writer;
mod table_valued;

pub use driver::*;
pub use json::*;
pub use sql_writer::*;
pub use table_valued::*;
