use crate::{AttributeDefinition, Error, Result, Value};
use std::fmt::{self, Debug, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterType {
    Equality,
    Inequality,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Between,
    MatchesSet,
    DoesNotMatchSet,
    IsNull,
    IsNotNull,
}

impl FilterType {
    /// Operand count, `None` for set predicates which take any positive amount.
    pub fn arity(&self) -> Option<usize> {
        match self {
            FilterType::IsNull | FilterType::IsNotNull => Some(0),
            FilterType::Between => Some(2),
            FilterType::MatchesSet | FilterType::DoesNotMatchSet => None,
            _ => Some(1),
        }
    }
}

/// Predicate on one attribute: `attribute <filter_type> values`.
#[derive(Clone, PartialEq)]
pub struct ValueFilter {
    pub attribute: &'static AttributeDefinition,
    pub filter_type: FilterType,
    pub values: Vec<Value>,
}

impl ValueFilter {
    pub fn new(
        attribute: &'static AttributeDefinition,
        filter_type: FilterType,
        values: impl IntoIterator<Item = Value>,
    ) -> Result<Self> {
        let values: Vec<Value> = values.into_iter().collect();
        match filter_type.arity() {
            Some(arity) if arity != values.len() => {
                return Err(Error::msg(format!(
                    "{filter_type:?} on {attribute:?} expects {arity} operands, got {}",
                    values.len()
                )));
            }
            None if values.is_empty() => {
                return Err(Error::msg(format!(
                    "{filter_type:?} on {attribute:?} expects at least one operand"
                )));
            }
            _ => {}
        }
        if !matches!(filter_type, FilterType::Equality | FilterType::Inequality)
            && values.iter().any(Value::is_null)
        {
            return Err(Error::msg(format!(
                "{filter_type:?} on {attribute:?} does not accept NULL operands"
            )));
        }
        Ok(Self {
            attribute,
            filter_type,
            values,
        })
    }

    /// Equality or inequality against NULL, rendered as `IS [NOT] NULL`.
    pub fn is_null_check(&self) -> bool {
        match self.filter_type {
            FilterType::IsNull | FilterType::IsNotNull => true,
            FilterType::Equality | FilterType::Inequality => self.values.iter().all(Value::is_null),
            _ => false,
        }
    }

    /// Positional arguments this filter consumes, in order.
    pub fn arguments(&self) -> impl Iterator<Item = &Value> {
        self.values.iter().filter(|v| !v.is_null())
    }
}

impl Debug for ValueFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} {:?} {:?}",
            self.attribute, self.filter_type, self.values
        )
    }
}
