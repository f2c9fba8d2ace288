use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use mortar_core::{
    EntityDefinition, Error, Result, Row, RowSource, SqlWriter, Value, source_columns,
    writer::Context,
};
use serde_json::{Map, Number, Value as JsonValue};
use time::macros::format_description;

/// Ships the rows as a JSON array in one text parameter, expanded by `OPENJSON` with an
/// explicit schema.
///
/// No server side type registration is needed. Decimals travel as strings so that their
/// scale survives, blobs as base64.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsonSource;

impl JsonSource {
    pub const fn new() -> Self {
        Self
    }
}

impl RowSource for JsonSource {
    fn write_source(
        &self,
        writer: &dyn SqlWriter,
        context: &mut Context,
        out: &mut String,
        source: &EntityDefinition,
        parameter: u32,
    ) -> Result<()> {
        out.push_str("OPENJSON(");
        writer.write_parameter_placeholder(context, out, parameter);
        out.push_str(") WITH (");
        let mut first = true;
        for column in source_columns(source) {
            if !first {
                out.push_str(", ");
            }
            first = false;
            writer.write_identifier_quoted(context, out, column.physical_name);
            out.push(' ');
            writer.write_column_type(context, out, column);
            out.push_str(" '$.\"");
            writer.write_escaped(context, out, column.physical_name, '\'', "''");
            out.push_str("\"'");
        }
        out.push(')');
        Ok(())
    }

    fn bind(&self, source: &EntityDefinition, rows: Vec<Row>) -> Result<Value> {
        let rows = rows
            .into_iter()
            .map(|row| -> Result<JsonValue> {
                let mut object = Map::new();
                for column in source_columns(source) {
                    let value = row.get(column.ordinal).ok_or_else(|| {
                        Error::msg(format!("Row of {source:?} has no value for {column:?}"))
                    })?;
                    object.insert(column.physical_name.into(), json_value(value)?);
                }
                Ok(JsonValue::Object(object))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Value::Varchar(Some(JsonValue::Array(rows).to_string())))
    }
}

/// JSON form of a value, readable back by `OPENJSON` into the column type of its prototype.
pub fn json_value(value: &Value) -> Result<JsonValue> {
    if value.is_null() {
        return Ok(JsonValue::Null);
    }
    Ok(match value {
        Value::Boolean(Some(v)) => JsonValue::Bool(*v),
        Value::UInt8(Some(v)) => JsonValue::Number((*v).into()),
        Value::Int16(Some(v)) => JsonValue::Number((*v).into()),
        Value::Int32(Some(v)) => JsonValue::Number((*v).into()),
        Value::Int64(Some(v)) => JsonValue::Number((*v).into()),
        Value::Float32(Some(v)) => float(*v as f64)?,
        Value::Float64(Some(v)) => float(*v)?,
        Value::Decimal(Some(v), ..) => JsonValue::String(v.to_string()),
        Value::Varchar(Some(v)) => JsonValue::String(v.clone()),
        Value::Blob(Some(v)) => JsonValue::String(BASE64.encode(v)),
        Value::Date(Some(v)) => {
            JsonValue::String(v.format(format_description!("[year]-[month]-[day]"))?)
        }
        Value::Time(Some(v)) => JsonValue::String(
            v.format(format_description!("[hour]:[minute]:[second].[subsecond]"))?,
        ),
        Value::Timestamp(Some(v)) => JsonValue::String(v.format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"
        ))?),
        Value::TimestampWithTimezone(Some(v)) => JsonValue::String(v.format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond][offset_hour sign:mandatory]:[offset_minute]"
        ))?),
        Value::Uuid(Some(v)) => JsonValue::String(v.to_string()),
        _ => {
            return Err(Error::msg(format!(
                "Value {value:?} cannot be shipped through a JSON row source"
            )));
        }
    })
}

fn float(value: f64) -> Result<JsonValue> {
    Number::from_f64(value)
        .map(JsonValue::Number)
        .ok_or_else(|| Error::msg(format!("Float {value} has no JSON representation")))
}

#[cfg(test)]
mod tests {
    use super::json_value;
    use mortar_core::Value;
    use rust_decimal::Decimal;
    use serde_json::json;
    use time::macros::{date, datetime};

    #[test]
    fn text_forms() {
        assert_eq!(
            json_value(&Value::Decimal(Some(Decimal::new(1050, 2)), 19, 2)).unwrap(),
            json!("10.50")
        );
        assert_eq!(
            json_value(&Value::Date(Some(date!(2025 - 03 - 09)))).unwrap(),
            json!("2025-03-09")
        );
        assert_eq!(
            json_value(&Value::TimestampWithTimezone(Some(datetime!(
                2025-03-09 10:15:30.5 +01:00
            ))))
            .unwrap(),
            json!("2025-03-09T10:15:30.5+01:00")
        );
        assert_eq!(
            json_value(&Value::Blob(Some([1u8, 2, 255].into()))).unwrap(),
            json!("AQL/")
        );
        assert_eq!(json_value(&Value::Int32(None)).unwrap(), json!(null));
        assert!(json_value(&Value::Float64(Some(f64::NAN))).is_err());
    }
}
