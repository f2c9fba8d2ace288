use crate::{Error, Result, Value};
use rust_decimal::{
    Decimal,
    prelude::{FromPrimitive, ToPrimitive},
};
use std::{any, borrow::Cow};
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use uuid::Uuid;

/// Conversion between native Rust types and the dynamically typed [`Value`] used for
/// query arguments, structured parameter rows and decoded result rows.
///
/// # Error semantics
/// - Integer conversions accept any narrower or wider integer variant (and scale zero
///   decimals) as long as the value fits, otherwise the error names both the value and
///   the target type.
/// - A NULL can only be converted into `Option<T>`.
///
/// # Examples
/// ```rust
/// use mortar_core::{AsValue, Value};
/// let v = 42i32.as_value();
/// assert!(matches!(v, Value::Int32(Some(42))));
/// let n: i64 = AsValue::try_from_value(v).unwrap();
/// assert_eq!(n, 42);
/// ```
pub trait AsValue {
    /// Typed NULL for this type, used as a column type prototype.
    fn as_empty_value() -> Value;
    /// Convert into the owned [`Value`] representation.
    fn as_value(self) -> Value;
    /// Attempt to convert a dynamic [`Value`] into `Self`.
    fn try_from_value(value: Value) -> Result<Self>
    where
        Self: Sized;
}

impl<T: AsValue> From<T> for Value {
    fn from(value: T) -> Self {
        value.as_value()
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Varchar(Some(value.into()))
    }
}

fn conversion_error<T>(value: &Value) -> Error {
    Error::msg(format!(
        "Cannot convert {value:?} to {}",
        any::type_name::<T>()
    ))
}

fn integer(value: &Value) -> Option<i128> {
    match value {
        Value::UInt8(Some(v)) => Some(*v as _),
        Value::Int16(Some(v)) => Some(*v as _),
        Value::Int32(Some(v)) => Some(*v as _),
        Value::Int64(Some(v)) => Some(*v as _),
        Value::Decimal(Some(v), ..) if v.fract().is_zero() => v.to_i128(),
        _ => None,
    }
}

macro_rules! impl_as_value_integer {
    ($source:ty, $destination:path) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                $destination(None)
            }
            fn as_value(self) -> Value {
                $destination(Some(self))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                let Some(v) = integer(&value) else {
                    return Err(conversion_error::<Self>(&value));
                };
                <$source>::try_from(v).map_err(|_| {
                    Error::msg(format!(
                        "Value {v} is out of range for {}",
                        any::type_name::<Self>()
                    ))
                })
            }
        }
    };
}
impl_as_value_integer!(u8, Value::UInt8);
impl_as_value_integer!(i16, Value::Int16);
impl_as_value_integer!(i32, Value::Int32);
impl_as_value_integer!(i64, Value::Int64);

macro_rules! impl_as_value {
    ($source:ty, $destination:path $(, $pat_rest:pat $(if $guard:expr)? => $expr_rest:expr)* $(,)?) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                $destination(None)
            }
            fn as_value(self) -> Value {
                $destination(Some(self.into()))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                match value {
                    $destination(Some(v)) => Ok(v.into()),
                    $($pat_rest $(if $guard)? => $expr_rest,)*
                    _ => Err(conversion_error::<Self>(&value)),
                }
            }
        }
    };
}
impl_as_value!(
    bool,
    Value::Boolean,
    Value::UInt8(Some(v)) if v <= 1 => Ok(v == 1),
    Value::Int32(Some(v)) if v == 0 || v == 1 => Ok(v == 1),
);
impl_as_value!(
    f32,
    Value::Float32,
    Value::Float64(Some(v)) => Ok(v as _),
);
impl_as_value!(
    f64,
    Value::Float64,
    Value::Float32(Some(v)) => Ok(v as _),
    Value::Decimal(Some(v), ..) => v.to_f64().ok_or_else(|| Error::msg(format!("Decimal {v} does not fit f64"))),
);
impl_as_value!(String, Value::Varchar);
impl_as_value!(
    Cow<'static, str>,
    Value::Varchar,
);
impl_as_value!(Box<[u8]>, Value::Blob);
impl_as_value!(
    Vec<u8>,
    Value::Blob,
);
impl_as_value!(Date, Value::Date);
impl_as_value!(Time, Value::Time);
impl_as_value!(
    PrimitiveDateTime,
    Value::Timestamp,
    Value::TimestampWithTimezone(Some(v)) => {
        let v = v.to_utc();
        Ok(PrimitiveDateTime::new(v.date(), v.time()))
    },
);
impl_as_value!(
    OffsetDateTime,
    Value::TimestampWithTimezone,
    Value::Timestamp(Some(v)) => Ok(v.assume_utc()),
);
impl_as_value!(
    Uuid,
    Value::Uuid,
    Value::Varchar(Some(ref v)) => Uuid::parse_str(v).map_err(|e| Error::new(e).context(format!("Cannot parse `{v}` as Uuid"))),
);

impl AsValue for Decimal {
    fn as_empty_value() -> Value {
        Value::Decimal(None, 0, 0)
    }
    fn as_value(self) -> Value {
        // Widest precision, the scale is the one of the value
        Value::Decimal(Some(self), 38, self.scale() as _)
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Decimal(Some(v), ..) => Ok(v),
            Value::Float32(Some(v)) => {
                Decimal::from_f32(v).ok_or_else(|| conversion_error::<Self>(&value))
            }
            Value::Float64(Some(v)) => {
                Decimal::from_f64(v).ok_or_else(|| conversion_error::<Self>(&value))
            }
            // Decimals travel as strings through JSON, the scale must survive
            Value::Varchar(Some(ref v)) => Decimal::from_str_exact(v)
                .map_err(|e| Error::new(e).context(format!("Cannot parse `{v}` as Decimal"))),
            ref v => integer(v)
                .and_then(Decimal::from_i128)
                .ok_or_else(|| conversion_error::<Self>(v)),
        }
    }
}

impl<T: AsValue> AsValue for Option<T> {
    fn as_empty_value() -> Value {
        T::as_empty_value()
    }
    fn as_value(self) -> Value {
        match self {
            Some(v) => v.as_value(),
            None => T::as_empty_value(),
        }
    }
    fn try_from_value(value: Value) -> Result<Self> {
        Ok(if value.is_null() {
            None
        } else {
            Some(<T as AsValue>::try_from_value(value)?)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{AsValue, Value};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn integers_widen_and_narrow() {
        assert_eq!(i64::try_from_value(Value::Int32(Some(7))).unwrap(), 7);
        assert_eq!(u8::try_from_value(Value::Int64(Some(255))).unwrap(), 255);
        assert!(u8::try_from_value(Value::Int64(Some(256))).is_err());
        assert_eq!(
            i32::try_from_value(Value::Decimal(Some(Decimal::new(42, 0)), 38, 0)).unwrap(),
            42
        );
        assert!(i32::try_from_value(Value::Decimal(Some(Decimal::new(425, 1)), 38, 1)).is_err());
    }

    #[test]
    fn decimal_from_text_keeps_scale() {
        let value = Decimal::try_from_value(Value::Varchar(Some("10.50".into()))).unwrap();
        assert_eq!(value, Decimal::from_str("10.50").unwrap());
        assert_eq!(value.scale(), 2);
        assert!(matches!(value.as_value(), Value::Decimal(Some(..), 38, 2)));
    }

    #[test]
    fn options() {
        assert_eq!(Option::<i32>::try_from_value(Value::Null).unwrap(), None);
        assert_eq!(Some(3i16).as_value(), Value::Int16(Some(3)));
        assert!(matches!(Option::<String>::None.as_value(), Value::Varchar(None)));
        assert!(i32::try_from_value(Value::Int32(None)).is_err());
    }
}
