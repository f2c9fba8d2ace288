use crate::{AttributeDefinition, EntityDefinition, Result, Row, SqlWriter, Value, writer::Context};

/// Strategy shipping a row set to the server as a named, table shaped source.
///
/// Both methods see the same source definition. `write_source` renders what follows `FROM`
/// or `USING` (the statement adds the alias), `bind` turns the rows into the single argument
/// at the reserved `parameter` index.
pub trait RowSource: Send + Sync {
    fn write_source(
        &self,
        writer: &dyn SqlWriter,
        context: &mut Context,
        out: &mut String,
        source: &EntityDefinition,
        parameter: u32,
    ) -> Result<()>;

    fn bind(&self, source: &EntityDefinition, rows: Vec<Row>) -> Result<Value>;
}

impl<R: RowSource + ?Sized> RowSource for &R {
    fn write_source(
        &self,
        writer: &dyn SqlWriter,
        context: &mut Context,
        out: &mut String,
        source: &EntityDefinition,
        parameter: u32,
    ) -> Result<()> {
        (*self).write_source(writer, context, out, source, parameter)
    }

    fn bind(&self, source: &EntityDefinition, rows: Vec<Row>) -> Result<Value> {
        (*self).bind(source, rows)
    }
}

/// Attributes a row source materializes, in ordinal order.
pub fn source_columns(source: &EntityDefinition) -> impl Iterator<Item = &AttributeDefinition> {
    source.direct_attributes()
}
