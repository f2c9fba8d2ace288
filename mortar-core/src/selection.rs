use crate::{
    AttributeDefinition, ColumnTrait, Entity, EntityDefinition, Error, JoinType, Relation,
    Result, Value, ValueFilter,
};
use std::{borrow::Cow, iter, mem};

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub attribute: &'static AttributeDefinition,
    pub order: Order,
}

/// Rows to skip and, optionally, rows to return. Both are bound as parameters.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: u32,
    pub size: Option<u32>,
}

impl Page {
    pub fn arguments(&self) -> impl Iterator<Item = Value> {
        iter::once(Value::Int64(Some(self.offset.into())))
            .chain(self.size.map(|v| Value::Int64(Some(v.into()))))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperator {
    Union,
    UnionAll,
    Intersect,
    Except,
}

/// Common table expression a selection reads its keys from.
#[derive(Debug, Clone, PartialEq)]
pub struct ParentExpression {
    pub name: Cow<'static, str>,
    pub selection: Box<Selection>,
    /// Pairs of (column projected by the expression, attribute of the outer selection).
    pub correlation: Vec<(&'static AttributeDefinition, &'static AttributeDefinition)>,
}

/// Declarative SELECT over one entity: filters, joins, ordering, paging, an optional parent
/// expression and a chain of set operations.
///
/// A selection is a plain value, compiling it never changes it and compiling it twice
/// produces the same text.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub definition: &'static EntityDefinition,
    /// Explicit projection, empty means every returnable attribute.
    pub columns: Vec<&'static AttributeDefinition>,
    pub filters: Vec<ValueFilter>,
    pub relations: Vec<Relation>,
    pub order_by: Vec<OrderBy>,
    pub page: Option<Page>,
    pub parent: Option<ParentExpression>,
    /// Flattened set operations, each applied to everything before it.
    pub links: Vec<(SetOperator, Selection)>,
}

impl Selection {
    pub fn new(definition: &'static EntityDefinition) -> Self {
        Self {
            definition,
            columns: Vec::new(),
            filters: Vec::new(),
            relations: Vec::new(),
            order_by: Vec::new(),
            page: None,
            parent: None,
            links: Vec::new(),
        }
    }

    pub fn of<E: Entity>() -> Self {
        Self::new(E::definition())
    }

    pub fn select<C: ColumnTrait>(mut self, columns: impl IntoIterator<Item = C>) -> Self {
        self.columns
            .extend(columns.into_iter().map(|v| v.attribute()));
        self
    }

    pub fn filter(mut self, filter: ValueFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn join(
        mut self,
        join: JoinType,
        source: impl ColumnTrait,
        target: impl ColumnTrait,
    ) -> Self {
        self.relations.push(Relation {
            join,
            source: source.attribute(),
            target: target.attribute(),
        });
        self
    }

    pub fn inner_join(self, source: impl ColumnTrait, target: impl ColumnTrait) -> Self {
        self.join(JoinType::Inner, source, target)
    }

    pub fn left_join(self, source: impl ColumnTrait, target: impl ColumnTrait) -> Self {
        self.join(JoinType::Left, source, target)
    }

    pub fn order_by(mut self, column: impl ColumnTrait) -> Self {
        self.order_by.push(OrderBy {
            attribute: column.attribute(),
            order: Order::Asc,
        });
        self
    }

    pub fn order_by_descending(mut self, column: impl ColumnTrait) -> Self {
        self.order_by.push(OrderBy {
            attribute: column.attribute(),
            order: Order::Desc,
        });
        self
    }

    pub fn page(mut self, offset: u32, size: Option<u32>) -> Self {
        self.page = Some(Page { offset, size });
        self
    }

    /// Reads the keys from the common table expression `name` defined by `parent`.
    ///
    /// `parent` projects the key columns (its primary key when it selects nothing
    /// explicitly), each of them must resolve to an attribute of this selection.
    pub fn with_parent(
        mut self,
        name: impl Into<Cow<'static, str>>,
        mut parent: Selection,
    ) -> Result<Self> {
        let name = name.into();
        if self.parent.is_some() {
            return Err(Error::msg(format!(
                "Selection of {:?} already reads from a parent expression",
                self.definition
            )));
        }
        if parent.parent.is_some() || !parent.links.is_empty() {
            return Err(Error::msg(format!(
                "Parent expression `{name}` cannot itself have a parent or set operations"
            )));
        }
        if parent.columns.is_empty() {
            parent.columns = parent.definition.primary_key().collect();
        }
        if parent.columns.is_empty() {
            return Err(Error::msg(format!(
                "Parent expression `{name}` projects no key: {:?} has no primary key",
                parent.definition
            )));
        }
        let correlation = parent
            .columns
            .iter()
            .map(|key| {
                self.definition
                    .find(&key.reference_name())
                    .map(|outer| (*key, outer))
                    .ok_or_else(|| {
                        Error::msg(format!(
                            "Parent expression `{name}` projects {key:?} which does not match any attribute of {:?}",
                            self.definition
                        ))
                    })
            })
            .collect::<Result<_>>()?;
        self.parent = Some(ParentExpression {
            name,
            selection: parent.into(),
            correlation,
        });
        Ok(self)
    }

    /// Two-phase paging: filters, joins, ordering and page move to a key-only parent
    /// expression named `name`, this selection then fetches the full rows of those keys in
    /// the same order.
    pub fn page_by_keys(mut self, name: impl Into<Cow<'static, str>>) -> Result<Self> {
        let keys: Vec<_> = self.definition.primary_key().collect();
        if keys.is_empty() {
            return Err(Error::msg(format!(
                "Cannot page {:?} by keys, it has no primary key",
                self.definition
            )));
        }
        let parent = Selection {
            definition: self.definition,
            columns: keys,
            filters: mem::take(&mut self.filters),
            relations: self.relations.clone(),
            order_by: mem::take(&mut self.order_by),
            page: self.page.take(),
            parent: None,
            links: Vec::new(),
        };
        self.order_by = parent.resolved_order();
        self.with_parent(name, parent)
    }

    fn link(mut self, operator: SetOperator, mut other: Selection) -> Self {
        let links = mem::take(&mut other.links);
        self.links.push((operator, other));
        self.links.extend(links);
        self
    }

    pub fn union(self, other: Selection) -> Self {
        self.link(SetOperator::Union, other)
    }

    pub fn union_all(self, other: Selection) -> Self {
        self.link(SetOperator::UnionAll, other)
    }

    pub fn intersect(self, other: Selection) -> Self {
        self.link(SetOperator::Intersect, other)
    }

    pub fn except(self, other: Selection) -> Self {
        self.link(SetOperator::Except, other)
    }

    /// This selection followed by every linked one.
    pub fn branches(&self) -> impl Iterator<Item = &Selection> {
        iter::once(self).chain(self.links.iter().map(|(_, v)| v))
    }

    /// Whether column references must carry their table.
    pub fn qualify_columns(&self) -> bool {
        !self.relations.is_empty() || self.parent.is_some()
    }

    /// Attributes to project: the explicit list, else the direct attributes plus the related
    /// ones whose table is joined.
    pub fn resolved_columns(&self) -> Vec<&'static AttributeDefinition> {
        if !self.columns.is_empty() {
            return self.columns.clone();
        }
        self.definition
            .attributes
            .iter()
            .filter(|v| {
                v.is_direct()
                    || self
                        .relations
                        .iter()
                        .any(|relation| *relation.location() == v.location)
            })
            .collect()
    }

    /// Ordering, falling back to the primary key when paged without one.
    pub fn resolved_order(&self) -> Vec<OrderBy> {
        if !self.order_by.is_empty() || self.page.is_none() {
            return self.order_by.clone();
        }
        self.definition
            .primary_key()
            .map(|attribute| OrderBy {
                attribute,
                order: Order::Asc,
            })
            .collect()
    }

    fn body_arguments(&self, out: &mut Vec<Value>) {
        out.extend(
            self.filters
                .iter()
                .flat_map(ValueFilter::arguments)
                .cloned(),
        );
        if let Some(page) = self.page {
            out.extend(page.arguments());
        }
    }

    /// Positional arguments in the order the compiled text consumes them: every parent
    /// expression, then the body of each branch.
    pub fn arguments(&self) -> Vec<Value> {
        let mut result = Vec::new();
        for branch in self.branches() {
            if let Some(parent) = &branch.parent {
                parent.selection.body_arguments(&mut result);
            }
        }
        for branch in self.branches() {
            branch.body_arguments(&mut result);
        }
        result
    }

    /// Mutations accept filters and joins only.
    pub fn ensure_mutable(&self, operation: &str) -> Result<()> {
        if self.page.is_some() || self.parent.is_some() || !self.links.is_empty() {
            return Err(Error::msg(format!(
                "Cannot {operation} {:?} through a paged, parented or linked selection",
                self.definition
            )));
        }
        Ok(())
    }
}
