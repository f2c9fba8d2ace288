use mortar_core::{
    EntityDefinition, EntityLocation, Error, Result, Row, RowSource, SqlWriter, TableValue, Value,
    source_columns, writer::Context,
};

/// Ships the rows as one table-valued parameter of the table type the source declares.
///
/// The type must exist on the server, see [`SqlWriter::write_create_table_type`].
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableValuedSource;

impl TableValuedSource {
    pub const fn new() -> Self {
        Self
    }

    fn table_type(source: &EntityDefinition) -> Result<&EntityLocation> {
        source.structured_type.as_ref().ok_or_else(|| {
            Error::msg(format!(
                "{source:?} does not declare the table type its rows bind to"
            ))
        })
    }
}

impl RowSource for TableValuedSource {
    fn write_source(
        &self,
        writer: &dyn SqlWriter,
        context: &mut Context,
        out: &mut String,
        source: &EntityDefinition,
        parameter: u32,
    ) -> Result<()> {
        Self::table_type(source)?;
        writer.write_parameter_placeholder(context, out, parameter);
        Ok(())
    }

    fn bind(&self, source: &EntityDefinition, rows: Vec<Row>) -> Result<Value> {
        let type_name = Self::table_type(source)?.full_name();
        let columns: Box<[_]> = source_columns(source)
            .map(|v| (v.physical_name, v.value.clone()))
            .collect();
        let rows = rows
            .into_iter()
            .map(|row| {
                source_columns(source)
                    .map(|v| {
                        row.get(v.ordinal).cloned().ok_or_else(|| {
                            Error::msg(format!("Row of {source:?} has no value for {v:?}"))
                        })
                    })
                    .collect::<Result<Row>>()
            })
            .collect::<Result<_>>()?;
        Ok(Value::Table(Some(Box::new(TableValue {
            type_name: type_name.into(),
            columns,
            rows,
        }))))
    }
}
