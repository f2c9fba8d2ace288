use mortar_core::{Context, Selection, SqlWriter, Value};
use std::fmt::Write;

/// Transact-SQL writer: bracket quoting, server column types and statement hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TSqlWriter {
    /// Append `OPTION (RECOMPILE)` to selections paged through a parent expression.
    pub recompile_paged_queries: bool,
}

impl TSqlWriter {
    pub const fn new() -> Self {
        Self {
            recompile_paged_queries: true,
        }
    }

    pub const fn recompile_paged_queries(mut self, value: bool) -> Self {
        self.recompile_paged_queries = value;
        self
    }
}

impl Default for TSqlWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlWriter for TSqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }

    fn write_identifier_quoted(&self, context: &mut Context, out: &mut String, value: &str) {
        out.push('[');
        self.write_escaped(context, out, value, ']', "]]");
        out.push(']');
    }

    fn write_value_type(&self, _context: &mut Context, out: &mut String, value: &Value) {
        match value {
            Value::Boolean(..) => out.push_str("BIT"),
            Value::UInt8(..) => out.push_str("TINYINT"),
            Value::Int16(..) => out.push_str("SMALLINT"),
            Value::Int32(..) => out.push_str("INT"),
            Value::Int64(..) => out.push_str("BIGINT"),
            Value::Float32(..) => out.push_str("REAL"),
            Value::Float64(..) => out.push_str("FLOAT"),
            Value::Decimal(.., precision, scale) => {
                if (precision, scale) == (&0, &0) {
                    out.push_str("DECIMAL(38,10)");
                } else {
                    let _ = write!(out, "DECIMAL({},{})", precision, scale);
                }
            }
            Value::Varchar(..) => out.push_str("NVARCHAR(MAX)"),
            Value::Blob(..) => out.push_str("VARBINARY(MAX)"),
            Value::Date(..) => out.push_str("DATE"),
            Value::Time(..) => out.push_str("TIME(7)"),
            Value::Timestamp(..) => out.push_str("DATETIME2(7)"),
            Value::TimestampWithTimezone(..) => out.push_str("DATETIMEOFFSET(7)"),
            Value::Uuid(..) => out.push_str("UNIQUEIDENTIFIER"),
            Value::Null | Value::Table(..) => {
                log::error!("Value {value:?} has no Transact-SQL column type");
            }
        }
    }

    fn write_query_hints(&self, _context: &mut Context, out: &mut String, selection: &Selection) {
        if self.recompile_paged_queries
            && selection
                .branches()
                .filter_map(|v| v.parent.as_ref())
                .any(|v| v.selection.page.is_some())
        {
            out.push_str("\nOPTION (RECOMPILE)");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TSqlWriter;
    use mortar_core::{AsValue, AttributeDefinition, Context, SqlWriter, Value};
    use rust_decimal::Decimal;

    #[test]
    fn quotes_with_brackets() {
        let writer = TSqlWriter::new();
        let mut out = String::new();
        writer.write_identifier_quoted(&mut Context::default(), &mut out, "odd]name");
        assert_eq!(out, "[odd]]name]");
    }

    #[test]
    fn decimal_types() {
        let writer = TSqlWriter::new();
        let mut out = String::new();
        let mut context = Context::default();
        writer.write_value_type(&mut context, &mut out, &Value::Decimal(None, 19, 2));
        out.push(' ');
        writer.write_value_type(&mut context, &mut out, &Value::Decimal(None, 0, 0));
        out.push(' ');
        let amount = AttributeDefinition::new("Amount", Decimal::new(1050, 2).as_value());
        writer.write_value_type(&mut context, &mut out, &amount.value);
        assert_eq!(out, "DECIMAL(19,2) DECIMAL(38,10) DECIMAL(38,2)");
    }
}
