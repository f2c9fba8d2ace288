use crate::{AsValue, Entity, EntityLocation, FilterType, Result, Value, ValueFilter};
use std::{
    borrow::Cow,
    fmt::{self, Debug, Formatter},
    marker::PhantomData,
};

/// Resolved metadata of a single mapped attribute.
///
/// Built once with the chained constructors below, then frozen inside its
/// [`EntityDefinition`](crate::EntityDefinition) which assigns `ordinal` and, for direct
/// attributes, `location`.
#[derive(Clone, PartialEq)]
pub struct AttributeDefinition {
    /// Name of the field on the mapped type.
    pub property_name: &'static str,
    /// Column name on the server.
    pub physical_name: &'static str,
    /// Result label override (may be empty).
    pub alias: &'static str,
    /// Position inside the owning definition and inside every [`Row`](crate::Row) of it.
    pub ordinal: usize,
    pub primary_key: bool,
    /// Server generated identity.
    pub identity: bool,
    /// Server generated, not an identity (defaults, computed columns, row versions).
    pub computed: bool,
    /// Join path the attribute is resolved through, empty for direct attributes.
    pub path: &'static str,
    /// Table the physical column lives in.
    pub location: EntityLocation,
    /// Typed NULL describing the declared type.
    pub value: Value,
    /// Server type overriding the one derived from `value` (may be empty).
    pub column_type: &'static str,
}

impl AttributeDefinition {
    pub fn new(property_name: &'static str, value: Value) -> Self {
        Self {
            property_name,
            physical_name: property_name,
            alias: "",
            ordinal: 0,
            primary_key: false,
            identity: false,
            computed: false,
            path: "",
            location: Default::default(),
            value: value.as_null(),
            column_type: "",
        }
    }

    pub fn of<T: AsValue>(property_name: &'static str) -> Self {
        Self::new(property_name, T::as_empty_value())
    }

    pub fn physical_name(mut self, physical_name: &'static str) -> Self {
        self.physical_name = physical_name;
        self
    }

    pub fn alias(mut self, alias: &'static str) -> Self {
        self.alias = alias;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn identity(mut self) -> Self {
        self.identity = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn column_type(mut self, column_type: &'static str) -> Self {
        self.column_type = column_type;
        self
    }

    /// Marks the attribute as resolved through `path`, its column living in `location`.
    pub fn related(mut self, path: &'static str, location: EntityLocation) -> Self {
        self.path = path;
        self.location = location;
        self
    }

    pub fn is_direct(&self) -> bool {
        self.path.is_empty()
    }

    pub fn is_insertable(&self) -> bool {
        !self.identity && !self.computed && self.is_direct()
    }

    pub fn is_updateable(&self) -> bool {
        self.is_insertable() && !self.primary_key
    }

    /// Join path plus property name: `Amount`, `Customer.Name`.
    pub fn reference_name(&self) -> Cow<'static, str> {
        if self.path.is_empty() {
            Cow::Borrowed(self.property_name)
        } else {
            Cow::Owned(format!("{}.{}", self.path, self.property_name))
        }
    }

    /// Name of the attribute in a result set.
    pub fn label(&self) -> &'static str {
        if !self.alias.is_empty() {
            self.alias
        } else if self.is_direct() {
            self.physical_name
        } else {
            self.property_name
        }
    }
}

impl Debug for AttributeDefinition {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.location.full_name(), self.physical_name)
    }
}

/// Typed handle to the attribute at `ordinal` of `E::definition()`.
///
/// `ordinal` must be lower than the number of attributes of `E`, handles are meant to be
/// declared once next to the definition (`const NAME: Column<Self> = Column::new(1)`).
pub struct Column<E> {
    pub ordinal: usize,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Column<E> {
    pub const fn new(ordinal: usize) -> Self {
        Self {
            ordinal,
            _entity: PhantomData,
        }
    }
}

impl<E> Clone for Column<E> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<E> Copy for Column<E> {}

impl<E: Entity> Debug for Column<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.attribute().fmt(f)
    }
}

/// Anything that resolves to an attribute of a static entity definition.
///
/// The provided methods build [`ValueFilter`]s, validating the operand count and nullness.
pub trait ColumnTrait {
    fn attribute(&self) -> &'static AttributeDefinition;

    fn equal_to(&self, value: impl Into<Value>) -> Result<ValueFilter> {
        ValueFilter::new(self.attribute(), FilterType::Equality, [value.into()])
    }
    fn not_equal_to(&self, value: impl Into<Value>) -> Result<ValueFilter> {
        ValueFilter::new(self.attribute(), FilterType::Inequality, [value.into()])
    }
    fn less_than(&self, value: impl Into<Value>) -> Result<ValueFilter> {
        ValueFilter::new(self.attribute(), FilterType::LessThan, [value.into()])
    }
    fn less_than_or_equal(&self, value: impl Into<Value>) -> Result<ValueFilter> {
        ValueFilter::new(
            self.attribute(),
            FilterType::LessThanOrEqual,
            [value.into()],
        )
    }
    fn greater_than(&self, value: impl Into<Value>) -> Result<ValueFilter> {
        ValueFilter::new(self.attribute(), FilterType::GreaterThan, [value.into()])
    }
    fn greater_than_or_equal(&self, value: impl Into<Value>) -> Result<ValueFilter> {
        ValueFilter::new(
            self.attribute(),
            FilterType::GreaterThanOrEqual,
            [value.into()],
        )
    }
    fn between(&self, low: impl Into<Value>, high: impl Into<Value>) -> Result<ValueFilter> {
        ValueFilter::new(
            self.attribute(),
            FilterType::Between,
            [low.into(), high.into()],
        )
    }
    fn in_set<T: Into<Value>>(&self, values: impl IntoIterator<Item = T>) -> Result<ValueFilter> {
        ValueFilter::new(
            self.attribute(),
            FilterType::MatchesSet,
            values.into_iter().map(Into::into),
        )
    }
    fn not_in_set<T: Into<Value>>(&self, values: impl IntoIterator<Item = T>) -> Result<ValueFilter> {
        ValueFilter::new(
            self.attribute(),
            FilterType::DoesNotMatchSet,
            values.into_iter().map(Into::into),
        )
    }
    fn is_null(&self) -> ValueFilter {
        ValueFilter {
            attribute: self.attribute(),
            filter_type: FilterType::IsNull,
            values: Vec::new(),
        }
    }
    fn is_not_null(&self) -> ValueFilter {
        ValueFilter {
            attribute: self.attribute(),
            filter_type: FilterType::IsNotNull,
            values: Vec::new(),
        }
    }
}

impl<E: Entity> ColumnTrait for Column<E> {
    /// # Panics
    ///
    /// When `ordinal` is out of the attributes of `E`.
    fn attribute(&self) -> &'static AttributeDefinition {
        let attributes = &E::definition().attributes;
        debug_assert!(
            self.ordinal < attributes.len(),
            "Column {} is out of the {} attributes of {:?}",
            self.ordinal,
            attributes.len(),
            E::definition()
        );
        &attributes[self.ordinal]
    }
}

impl ColumnTrait for &'static AttributeDefinition {
    fn attribute(&self) -> &'static AttributeDefinition {
        *self
    }
}
