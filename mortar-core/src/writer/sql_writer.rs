use crate::{
    AttributeDefinition, ColumnPair, EntityDefinition, EntityLocation, FilterType, INSERTED_TABLE,
    InsertItem, InsertPlan, JoinType, MERGE_ACTION_COLUMN, MergePlan, Order, OrderBy, Page,
    ParentExpression, Relation, Result, ResultPlan, RowSource, SOURCE_ALIAS, Selection,
    SetOperator, TARGET_ALIAS, UpdateSet, Value, ValueFilter, possibly_parenthesized,
    separated_by, writer::Context, writer::Fragment,
};
use std::fmt::Write;

/// What a selection body projects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// The resolved columns of the selection.
    Columns,
    /// The constant `1`, for existence checks.
    One,
}

/// Dialect printer converting selections, mutations and structured commands into
/// parameterized SQL text.
///
/// Every statement method starts from a fresh [`Context`], so the parameter indices of a
/// statement always start from zero and follow the order of the matching `arguments()`.
pub trait SqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter;

    /// Whether the current fragment context allows alias declaration.
    fn alias_declaration(&self, context: &mut Context) -> bool {
        matches!(
            context.fragment,
            Fragment::SqlSelectFrom
                | Fragment::SqlJoin
                | Fragment::SqlMerge
                | Fragment::SqlMergeUsing
        )
    }

    /// Escape occurrences of `search` char with `replace` while copying into buffer.
    fn write_escaped(
        &self,
        _context: &mut Context,
        out: &mut String,
        value: &str,
        search: char,
        replace: &str,
    ) {
        let mut position = 0;
        for (i, c) in value.char_indices() {
            if c == search {
                out.push_str(&value[position..i]);
                out.push_str(replace);
                position = i + c.len_utf8();
            }
        }
        out.push_str(&value[position..]);
    }

    /// Quote identifiers ("name") doubling inner quotes.
    fn write_identifier_quoted(&self, context: &mut Context, out: &mut String, value: &str) {
        out.push('"');
        self.write_escaped(context, out, value, '"', "\"\"");
        out.push('"');
    }

    /// Name a declared table is referenced by: its alias, else `container.name`.
    fn write_location_qualifier(
        &self,
        context: &mut Context,
        out: &mut String,
        value: &EntityLocation,
    ) {
        if value.is_aliased() {
            self.write_identifier_quoted(context, out, &value.alias);
            return;
        }
        if !value.container.is_empty() {
            self.write_identifier_quoted(context, out, &value.container);
            out.push('.');
        }
        self.write_identifier_quoted(context, out, &value.name);
    }

    /// Render a table reference, declaring its alias where the fragment allows it.
    fn write_table_ref(&self, context: &mut Context, out: &mut String, value: &EntityLocation) {
        if !self.alias_declaration(context) || !value.is_aliased() {
            self.write_location_qualifier(context, out, value);
            return;
        }
        if !value.container.is_empty() {
            self.write_identifier_quoted(context, out, &value.container);
            out.push('.');
        }
        self.write_identifier_quoted(context, out, &value.name);
        out.push_str(" AS ");
        self.write_identifier_quoted(context, out, &value.alias);
    }

    /// Render a column reference, qualified with its table when the context asks for it.
    fn write_column_ref(
        &self,
        context: &mut Context,
        out: &mut String,
        value: &AttributeDefinition,
    ) {
        if context.qualify_columns {
            self.write_location_qualifier(context, out, &value.location);
            out.push('.');
        }
        self.write_identifier_quoted(context, out, value.physical_name);
    }

    /// `qualifier.column`, for the fixed aliases of structured commands.
    fn write_aliased_column(
        &self,
        context: &mut Context,
        out: &mut String,
        qualifier: &str,
        column: &str,
    ) {
        self.write_identifier_quoted(context, out, qualifier);
        out.push('.');
        self.write_identifier_quoted(context, out, column);
    }

    /// Column reference followed by `AS label` when the label differs from the column.
    fn write_column_labeled(
        &self,
        context: &mut Context,
        out: &mut String,
        value: &AttributeDefinition,
    ) {
        self.write_column_ref(context, out, value);
        if value.label() != value.physical_name {
            out.push_str(" AS ");
            self.write_identifier_quoted(context, out, value.label());
        }
    }

    /// Render the placeholder of the positional parameter `index`.
    fn write_parameter_placeholder(&self, _context: &mut Context, out: &mut String, index: u32) {
        let _ = write!(out, "@{index}");
    }

    /// Render the next positional parameter, consuming one index.
    fn write_parameter(&self, context: &mut Context, out: &mut String) {
        let index = context.reserve_parameter();
        self.write_parameter_placeholder(context, out, index);
    }

    /// Render NULL literal.
    fn write_value_none(&self, _context: &mut Context, out: &mut String) {
        out.push_str("NULL");
    }

    /// Render the SQL type for a `Value` prototype.
    fn write_value_type(&self, _context: &mut Context, out: &mut String, value: &Value) {
        match value {
            Value::Boolean(..) => out.push_str("BOOLEAN"),
            Value::UInt8(..) => out.push_str("TINYINT"),
            Value::Int16(..) => out.push_str("SMALLINT"),
            Value::Int32(..) => out.push_str("INTEGER"),
            Value::Int64(..) => out.push_str("BIGINT"),
            Value::Float32(..) => out.push_str("REAL"),
            Value::Float64(..) => out.push_str("DOUBLE PRECISION"),
            Value::Decimal(.., precision, scale) => {
                out.push_str("DECIMAL");
                if (precision, scale) != (&0, &0) {
                    let _ = write!(out, "({},{})", precision, scale);
                }
            }
            Value::Varchar(..) => out.push_str("VARCHAR"),
            Value::Blob(..) => out.push_str("BLOB"),
            Value::Date(..) => out.push_str("DATE"),
            Value::Time(..) => out.push_str("TIME"),
            Value::Timestamp(..) => out.push_str("TIMESTAMP"),
            Value::TimestampWithTimezone(..) => out.push_str("TIMESTAMP WITH TIME ZONE"),
            Value::Uuid(..) => out.push_str("UUID"),
            Value::Null | Value::Table(..) => {
                log::error!("Value {value:?} has no column type");
            }
        }
    }

    /// Declared type of an attribute: its override, else the type of its prototype.
    fn write_column_type(
        &self,
        context: &mut Context,
        out: &mut String,
        value: &AttributeDefinition,
    ) {
        if !value.column_type.is_empty() {
            out.push_str(value.column_type);
        } else {
            self.write_value_type(context, out, &value.value);
        }
    }

    /// Render one predicate, consuming one parameter per non NULL operand.
    fn write_filter(&self, context: &mut Context, out: &mut String, value: &ValueFilter) {
        self.write_column_ref(context, out, value.attribute);
        let text = value.values.first().is_some_and(Value::is_text);
        let operator = match value.filter_type {
            FilterType::Equality | FilterType::IsNull if value.is_null_check() => {
                out.push_str(" IS NULL");
                return;
            }
            FilterType::Inequality | FilterType::IsNotNull if value.is_null_check() => {
                out.push_str(" IS NOT NULL");
                return;
            }
            FilterType::Equality if text => " LIKE ",
            FilterType::Equality => " = ",
            FilterType::Inequality if text => " NOT LIKE ",
            FilterType::Inequality => " <> ",
            FilterType::LessThan => " < ",
            FilterType::LessThanOrEqual => " <= ",
            FilterType::GreaterThan => " > ",
            FilterType::GreaterThanOrEqual => " >= ",
            FilterType::Between => {
                out.push_str(" BETWEEN ");
                self.write_parameter(context, out);
                out.push_str(" AND ");
                self.write_parameter(context, out);
                return;
            }
            FilterType::MatchesSet | FilterType::DoesNotMatchSet => {
                out.push_str(if value.filter_type == FilterType::MatchesSet {
                    " IN ("
                } else {
                    " NOT IN ("
                });
                separated_by(
                    out,
                    &value.values,
                    |out, _| self.write_parameter(context, out),
                    ", ",
                );
                out.push(')');
                return;
            }
            FilterType::IsNull | FilterType::IsNotNull => return,
        };
        out.push_str(operator);
        self.write_parameter(context, out);
    }

    /// Render the predicates joined by `AND`.
    fn write_filters(&self, context: &mut Context, out: &mut String, values: &[ValueFilter]) {
        separated_by(
            out,
            values,
            |out, v| self.write_filter(context, out, v),
            " AND ",
        );
    }

    fn write_join_type(&self, _context: &mut Context, out: &mut String, join_type: &JoinType) {
        out.push_str(match join_type {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
        });
    }

    /// Render a JOIN clause: `INNER JOIN target ON target.column = source.column`.
    fn write_join(&self, context: &mut Context, out: &mut String, relation: &Relation) {
        let mut context = context.switch_fragment(Fragment::SqlJoin);
        context.current.qualify_columns = true;
        self.write_join_type(&mut context.current, out, &relation.join);
        out.push(' ');
        self.write_table_ref(&mut context.current, out, relation.location());
        out.push_str(" ON ");
        self.write_column_ref(&mut context.current, out, relation.target);
        out.push_str(" = ");
        self.write_column_ref(&mut context.current, out, relation.source);
    }

    fn write_order(&self, _context: &mut Context, out: &mut String, order: &Order) {
        out.push_str(match order {
            Order::Asc => " ASC",
            Order::Desc => " DESC",
        });
    }

    /// Render the ORDER BY list, `(SELECT NULL)` when there is nothing to order by.
    fn write_order_by(&self, context: &mut Context, out: &mut String, values: &[OrderBy]) {
        let mut context = context.switch_fragment(Fragment::SqlSelectOrderBy);
        out.push_str("ORDER BY ");
        if values.is_empty() {
            out.push_str("(SELECT NULL)");
            return;
        }
        separated_by(
            out,
            values,
            |out, v| {
                self.write_column_ref(&mut context.current, out, v.attribute);
                self.write_order(&mut context.current, out, &v.order);
            },
            ", ",
        );
    }

    /// `OFFSET @i ROWS [FETCH NEXT @j ROWS ONLY]`.
    fn write_page(&self, context: &mut Context, out: &mut String, page: &Page) {
        out.push_str("OFFSET ");
        self.write_parameter(context, out);
        out.push_str(" ROWS");
        if page.size.is_some() {
            out.push_str(" FETCH NEXT ");
            self.write_parameter(context, out);
            out.push_str(" ROWS ONLY");
        }
    }

    fn write_set_operator(&self, _context: &mut Context, out: &mut String, value: &SetOperator) {
        out.push_str(match value {
            SetOperator::Union => "UNION",
            SetOperator::UnionAll => "UNION ALL",
            SetOperator::Intersect => "INTERSECT",
            SetOperator::Except => "EXCEPT",
        });
    }

    /// `EXISTS (SELECT 1 FROM parent WHERE parent.key = outer.key …)`.
    fn write_parent_correlation(
        &self,
        context: &mut Context,
        out: &mut String,
        parent: &ParentExpression,
    ) {
        out.push_str("EXISTS (SELECT 1 FROM ");
        self.write_identifier_quoted(context, out, &parent.name);
        out.push_str(" WHERE ");
        separated_by(
            out,
            &parent.correlation,
            |out, (key, outer)| {
                self.write_aliased_column(context, out, &parent.name, key.label());
                out.push_str(" = ");
                self.write_column_ref(context, out, outer);
            },
            " AND ",
        );
        out.push(')');
    }

    /// Hoisted `WITH` clause declaring the parent expression of every branch.
    /// Returns whether anything was written.
    fn write_parent_expressions(
        &self,
        context: &mut Context,
        out: &mut String,
        selection: &Selection,
    ) -> bool {
        let parents: Vec<_> = selection
            .branches()
            .filter_map(|v| v.parent.as_ref())
            .collect();
        if parents.is_empty() {
            return false;
        }
        let mut context = context.switch_fragment(Fragment::SqlWith);
        out.push_str("WITH ");
        separated_by(
            out,
            parents,
            |out, parent| {
                self.write_identifier_quoted(&mut context.current, out, &parent.name);
                out.push_str(" AS (\n");
                self.write_selection_body(
                    &mut context.current,
                    out,
                    &parent.selection,
                    Projection::Columns,
                    true,
                );
                out.push_str("\n)");
            },
            ",\n",
        );
        out.push('\n');
        true
    }

    /// Render one `SELECT … FROM … WHERE … ORDER BY … OFFSET …` block.
    ///
    /// A `nested` body (inside parentheses or a common table expression) keeps its ORDER BY
    /// only when it is paged.
    fn write_selection_body(
        &self,
        context: &mut Context,
        out: &mut String,
        selection: &Selection,
        projection: Projection,
        nested: bool,
    ) {
        let mut context = context.switch_fragment(Fragment::SqlSelect);
        context.current.qualify_columns = selection.qualify_columns();
        out.push_str("SELECT ");
        match projection {
            Projection::Columns => separated_by(
                out,
                selection.resolved_columns(),
                |out, v| self.write_column_labeled(&mut context.current, out, v),
                ", ",
            ),
            Projection::One => out.push('1'),
        }
        out.push_str("\nFROM ");
        self.write_table_ref(
            &mut context.current.switch_fragment(Fragment::SqlSelectFrom).current,
            out,
            &selection.definition.location,
        );
        for relation in &selection.relations {
            out.push('\n');
            self.write_join(&mut context.current, out, relation);
        }
        if selection.parent.is_some() || !selection.filters.is_empty() {
            let mut context = context.current.switch_fragment(Fragment::SqlSelectWhere);
            out.push_str("\nWHERE ");
            if let Some(parent) = &selection.parent {
                self.write_parent_correlation(&mut context.current, out, parent);
                if !selection.filters.is_empty() {
                    out.push_str(" AND ");
                }
            }
            self.write_filters(&mut context.current, out, &selection.filters);
        }
        let order = selection.resolved_order();
        if selection.page.is_some() || (!nested && !order.is_empty()) {
            out.push('\n');
            self.write_order_by(&mut context.current, out, &order);
        }
        if let Some(page) = &selection.page {
            out.push('\n');
            self.write_page(&mut context.current, out, page);
        }
    }

    /// Main body followed by every linked branch, all parenthesized when linked.
    fn write_selection_branches(
        &self,
        context: &mut Context,
        out: &mut String,
        selection: &Selection,
        projection: Projection,
        nested: bool,
    ) {
        let linked = !selection.links.is_empty();
        possibly_parenthesized!(
            out,
            linked,
            self.write_selection_body(context, out, selection, projection, nested || linked)
        );
        for (operator, branch) in &selection.links {
            out.push('\n');
            self.write_set_operator(context, out, operator);
            out.push_str("\n(");
            self.write_selection_body(context, out, branch, projection, true);
            out.push(')');
        }
    }

    /// Statement level hints, appended before the terminating semicolon.
    fn write_query_hints(&self, _context: &mut Context, _out: &mut String, _selection: &Selection) {
    }

    /// Emit SELECT statement.
    fn write_select(&self, out: &mut String, selection: &Selection) {
        out.reserve(256 + selection.definition.attributes.len() * 32);
        if !out.is_empty() {
            out.push('\n');
        }
        let mut context = Context::new(Fragment::SqlSelect, selection.qualify_columns());
        self.write_parent_expressions(&mut context, out, selection);
        self.write_selection_branches(&mut context, out, selection, Projection::Columns, false);
        self.write_query_hints(&mut context, out, selection);
        out.push(';');
    }

    /// Emit a statement returning one row and one column: 1 when the selection matches
    /// anything, 0 otherwise.
    fn write_exists(&self, out: &mut String, selection: &Selection) {
        out.reserve(256);
        if !out.is_empty() {
            out.push('\n');
        }
        let mut context = Context::new(Fragment::SqlSelect, selection.qualify_columns());
        let with = self.write_parent_expressions(&mut context, out, selection);
        out.push_str(if with {
            "SELECT CASE WHEN EXISTS (\n"
        } else {
            "IF EXISTS (\n"
        });
        // Set operations compare whole rows, the constant projection only fits a single body
        let projection = if selection.links.is_empty() {
            Projection::One
        } else {
            Projection::Columns
        };
        self.write_selection_branches(&mut context, out, selection, projection, true);
        out.push_str(if with {
            "\n) THEN 1 ELSE 0 END"
        } else {
            "\n) SELECT 1 ELSE SELECT 0"
        });
        self.write_query_hints(&mut context, out, selection);
        out.push(';');
    }

    /// Emit UPDATE statement, a NULL value renders `column = NULL` and takes no parameter.
    ///
    /// The update must assign something, see [`UpdateSet::ensure_assignments`].
    fn write_update(&self, out: &mut String, value: &UpdateSet) {
        let selection = &value.selection;
        if value.values.is_empty() {
            log::error!("Update of {:?} assigns no value", selection.definition);
        }
        out.reserve(128 + value.values.len() * 32);
        if !out.is_empty() {
            out.push('\n');
        }
        let joined = !selection.relations.is_empty();
        let mut context = Context::new(Fragment::SqlUpdate, joined);
        out.push_str("UPDATE ");
        if joined {
            self.write_location_qualifier(&mut context, out, &selection.definition.location);
        } else {
            self.write_table_ref(
                &mut context,
                out,
                &selection.definition.location.clone().aliased(""),
            );
        }
        out.push_str("\nSET ");
        {
            let mut context = context.switch_fragment(Fragment::SqlUpdateSet);
            separated_by(
                out,
                &value.values,
                |out, (attribute, value)| {
                    self.write_identifier_quoted(&mut context.current, out, attribute.physical_name);
                    out.push_str(" = ");
                    if value.is_null() {
                        self.write_value_none(&mut context.current, out);
                    } else {
                        self.write_parameter(&mut context.current, out);
                    }
                },
                ", ",
            );
        }
        if joined {
            out.push_str("\nFROM ");
            self.write_table_ref(
                &mut context.switch_fragment(Fragment::SqlSelectFrom).current,
                out,
                &selection.definition.location,
            );
            for relation in &selection.relations {
                out.push('\n');
                self.write_join(&mut context, out, relation);
            }
        }
        if !selection.filters.is_empty() {
            out.push_str("\nWHERE ");
            self.write_filters(
                &mut context.switch_fragment(Fragment::SqlSelectWhere).current,
                out,
                &selection.filters,
            );
        }
        out.push(';');
    }

    /// Emit DELETE statement, `DELETE t FROM t JOIN …` when the predicates span joined tables.
    fn write_delete(&self, out: &mut String, selection: &Selection) {
        out.reserve(128);
        if !out.is_empty() {
            out.push('\n');
        }
        let joined = !selection.relations.is_empty();
        let mut context = Context::new(Fragment::SqlDeleteFrom, joined);
        if joined {
            out.push_str("DELETE ");
            self.write_location_qualifier(&mut context, out, &selection.definition.location);
            out.push_str("\nFROM ");
            self.write_table_ref(
                &mut context.switch_fragment(Fragment::SqlSelectFrom).current,
                out,
                &selection.definition.location,
            );
            for relation in &selection.relations {
                out.push('\n');
                self.write_join(&mut context, out, relation);
            }
        } else {
            out.push_str("DELETE FROM ");
            self.write_table_ref(
                &mut context,
                out,
                &selection.definition.location.clone().aliased(""),
            );
        }
        if !selection.filters.is_empty() {
            out.push_str("\nWHERE ");
            self.write_filters(
                &mut context.switch_fragment(Fragment::SqlSelectWhere).current,
                out,
                &selection.filters,
            );
        }
        out.push(';');
    }

    /// `OUTPUT INSERTED.column, …` listing `columns`.
    fn write_output_inserted(
        &self,
        context: &mut Context,
        out: &mut String,
        columns: &[&AttributeDefinition],
    ) {
        out.push_str("OUTPUT ");
        separated_by(
            out,
            columns,
            |out, v| {
                out.push_str("INSERTED.");
                self.write_identifier_quoted(context, out, v.physical_name);
            },
            ", ",
        );
    }

    /// Emit single row INSERT returning every direct attribute, generated values included.
    fn write_insert_item(&self, out: &mut String, value: &InsertItem) {
        out.reserve(128 + value.definition.attributes.len() * 32);
        if !out.is_empty() {
            out.push('\n');
        }
        let mut context = Context::new(Fragment::SqlInsertInto, false);
        let location = value.definition.location.clone().aliased("");
        out.push_str("INSERT INTO ");
        self.write_table_ref(&mut context, out, &location);
        let values: Vec<_> = value.values().collect();
        if !values.is_empty() {
            out.push_str(" (");
            separated_by(
                out,
                &values,
                |out, (attribute, _)| {
                    self.write_identifier_quoted(&mut context, out, attribute.physical_name)
                },
                ", ",
            );
            out.push(')');
        }
        out.push('\n');
        let returned: Vec<_> = value.definition.direct_attributes().collect();
        self.write_output_inserted(
            &mut context.switch_fragment(Fragment::SqlInsertIntoOutput).current,
            out,
            &returned,
        );
        out.push('\n');
        if values.is_empty() {
            out.push_str("DEFAULT VALUES;");
            return;
        }
        let mut context = context.switch_fragment(Fragment::SqlInsertIntoValues);
        out.push_str("VALUES (");
        separated_by(
            out,
            &values,
            |out, (_, v)| {
                if v.is_null() {
                    self.write_value_none(&mut context.current, out);
                } else {
                    self.write_parameter(&mut context.current, out);
                }
            },
            ", ",
        );
        out.push_str(");");
    }

    /// Emit the DDL of the table type a row set of `definition` binds to.
    fn write_create_table_type(
        &self,
        out: &mut String,
        location: &EntityLocation,
        definition: &EntityDefinition,
    ) {
        out.reserve(128 + definition.attributes.len() * 32);
        if !out.is_empty() {
            out.push('\n');
        }
        let mut context = Context::new(Fragment::SqlCreateType, false);
        out.push_str("CREATE TYPE ");
        self.write_location_qualifier(&mut context, out, location);
        out.push_str(" AS TABLE (\n");
        separated_by(
            out,
            definition.direct_attributes(),
            |out, v| {
                self.write_identifier_quoted(&mut context, out, v.physical_name);
                out.push(' ');
                self.write_column_type(&mut context, out, v);
            },
            ",\n",
        );
        out.push_str("\n);");
    }

    /// Name of a table variable.
    fn write_table_variable(&self, _context: &mut Context, out: &mut String, name: &str) {
        out.push('@');
        out.push_str(name);
    }

    /// `DECLARE @inserted TABLE (…);` shaped after the captured columns.
    fn write_declare_result_table(
        &self,
        context: &mut Context,
        out: &mut String,
        result: &ResultPlan,
        action: bool,
    ) {
        let mut context = context.switch_fragment(Fragment::SqlDeclare);
        out.push_str("DECLARE ");
        self.write_table_variable(&mut context.current, out, INSERTED_TABLE);
        out.push_str(" TABLE (");
        separated_by(
            out,
            &result.captured,
            |out, v| {
                self.write_identifier_quoted(&mut context.current, out, v.physical_name);
                out.push(' ');
                self.write_column_type(&mut context.current, out, v);
            },
            ", ",
        );
        if action {
            out.push_str(", ");
            self.write_identifier_quoted(&mut context.current, out, MERGE_ACTION_COLUMN);
            out.push(' ');
            self.write_value_type(&mut context.current, out, &Value::Varchar(None));
        }
        out.push_str(");\n");
    }

    /// `OUTPUT INSERTED.… [, $action] INTO @inserted (…)`.
    fn write_output_into(
        &self,
        context: &mut Context,
        out: &mut String,
        result: &ResultPlan,
        action: bool,
    ) {
        let mut context = context.switch_fragment(Fragment::SqlInsertIntoOutput);
        self.write_output_inserted(&mut context.current, out, &result.captured);
        if action {
            out.push_str(", $action");
        }
        out.push_str("\nINTO ");
        self.write_table_variable(&mut context.current, out, INSERTED_TABLE);
        out.push_str(" (");
        separated_by(
            out,
            &result.captured,
            |out, v| self.write_identifier_quoted(&mut context.current, out, v.physical_name),
            ", ",
        );
        if action {
            out.push_str(", ");
            self.write_identifier_quoted(&mut context.current, out, MERGE_ACTION_COLUMN);
        }
        out.push(')');
    }

    /// Row source followed by its alias.
    fn write_row_source(
        &self,
        context: &mut Context,
        out: &mut String,
        row_source: &dyn RowSource,
        source: &EntityDefinition,
        parameter: u32,
    ) -> Result<()> {
        row_source.write_source(self.as_dyn(), context, out, source, parameter)?;
        out.push_str(" AS ");
        self.write_identifier_quoted(context, out, SOURCE_ALIAS);
        Ok(())
    }

    /// Final SELECT of the captured rows, joined back with the source when source columns
    /// are requested.
    fn write_result_select(
        &self,
        context: &mut Context,
        out: &mut String,
        result: &ResultPlan,
        row_source: &dyn RowSource,
        source: &EntityDefinition,
        parameter: u32,
        exclude_deleted: bool,
    ) -> Result<()> {
        let mut context = context.switch_fragment(Fragment::SqlSelect);
        out.push_str("SELECT ");
        separated_by(
            out,
            &result.inserted,
            |out, v| {
                self.write_aliased_column(&mut context.current, out, INSERTED_TABLE, v.physical_name);
                if v.label() != v.physical_name {
                    out.push_str(" AS ");
                    self.write_identifier_quoted(&mut context.current, out, v.label());
                }
            },
            ", ",
        );
        for v in &result.source {
            out.push_str(", ");
            self.write_aliased_column(&mut context.current, out, SOURCE_ALIAS, v.physical_name);
        }
        out.push_str("\nFROM ");
        self.write_table_variable(&mut context.current, out, INSERTED_TABLE);
        out.push_str(" AS ");
        self.write_identifier_quoted(&mut context.current, out, INSERTED_TABLE);
        if !result.source.is_empty() {
            out.push_str("\nINNER JOIN ");
            self.write_row_source(&mut context.current, out, row_source, source, parameter)?;
            out.push_str(" ON ");
            self.write_column_pairs(
                &mut context.current,
                out,
                &result.matching,
                INSERTED_TABLE,
                " AND ",
            );
        }
        if exclude_deleted {
            out.push_str("\nWHERE ");
            self.write_aliased_column(&mut context.current, out, INSERTED_TABLE, MERGE_ACTION_COLUMN);
            out.push_str(" <> 'DELETE'");
        }
        out.push(';');
        Ok(())
    }

    /// `qualifier.target = source.source` for every pair.
    fn write_column_pairs(
        &self,
        context: &mut Context,
        out: &mut String,
        pairs: &[ColumnPair],
        qualifier: &str,
        separator: &str,
    ) {
        separated_by(
            out,
            pairs,
            |out, v| {
                self.write_aliased_column(context, out, qualifier, v.target.physical_name);
                out.push_str(" = ");
                self.write_aliased_column(context, out, SOURCE_ALIAS, v.source.physical_name);
            },
            separator,
        );
    }

    /// Emit the bulk INSERT of a row source, with the optional OUTPUT capture.
    fn write_structured_insert(
        &self,
        out: &mut String,
        plan: &InsertPlan,
        row_source: &dyn RowSource,
    ) -> Result<()> {
        out.reserve(512 + plan.columns.len() * 64);
        if !out.is_empty() {
            out.push('\n');
        }
        let mut context = Context::new(Fragment::SqlInsertInto, false);
        let parameter = context.reserve_parameter();
        if let Some(result) = &plan.result {
            self.write_declare_result_table(&mut context, out, result, false);
        }
        out.push_str("INSERT INTO ");
        self.write_table_ref(&mut context, out, &plan.target.location.clone().aliased(""));
        out.push_str(" (");
        separated_by(
            out,
            &plan.columns,
            |out, v| self.write_identifier_quoted(&mut context, out, v.target.physical_name),
            ", ",
        );
        out.push_str(")\n");
        if let Some(result) = &plan.result {
            self.write_output_into(&mut context, out, result, false);
            out.push('\n');
        }
        out.push_str("SELECT ");
        separated_by(
            out,
            &plan.columns,
            |out, v| {
                self.write_aliased_column(&mut context, out, SOURCE_ALIAS, v.source.physical_name)
            },
            ", ",
        );
        out.push_str("\nFROM ");
        self.write_row_source(&mut context, out, row_source, plan.source, parameter)?;
        out.push(';');
        if let Some(result) = &plan.result {
            out.push('\n');
            self.write_result_select(
                &mut context,
                out,
                result,
                row_source,
                plan.source,
                parameter,
                false,
            )?;
        }
        Ok(())
    }

    /// Emit the bulk MERGE of a row source, with the optional OUTPUT capture.
    fn write_structured_merge(
        &self,
        out: &mut String,
        plan: &MergePlan,
        row_source: &dyn RowSource,
    ) -> Result<()> {
        out.reserve(1024);
        if !out.is_empty() {
            out.push('\n');
        }
        let mut context = Context::new(Fragment::SqlMerge, false);
        let parameter = context.reserve_parameter();
        let action = plan.captures_action();
        if let Some(result) = &plan.result {
            self.write_declare_result_table(&mut context, out, result, action);
        }
        out.push_str("MERGE ");
        self.write_table_ref(
            &mut context,
            out,
            &plan.target.location.clone().aliased(TARGET_ALIAS),
        );
        out.push_str("\nUSING ");
        self.write_row_source(
            &mut context.switch_fragment(Fragment::SqlMergeUsing).current,
            out,
            row_source,
            plan.source,
            parameter,
        )?;
        out.push_str("\nON (");
        self.write_column_pairs(&mut context, out, &plan.on, TARGET_ALIAS, " AND ");
        out.push(')');
        if !plan.update.is_empty() {
            out.push_str("\nWHEN MATCHED THEN\nUPDATE SET ");
            separated_by(
                out,
                &plan.update,
                |out, v| {
                    self.write_aliased_column(
                        &mut context,
                        out,
                        TARGET_ALIAS,
                        v.target.physical_name,
                    );
                    out.push_str(" = ");
                    self.write_aliased_column(
                        &mut context,
                        out,
                        SOURCE_ALIAS,
                        v.source.physical_name,
                    );
                },
                ", ",
            );
        }
        if !plan.insert.is_empty() {
            out.push_str("\nWHEN NOT MATCHED BY TARGET THEN\nINSERT (");
            separated_by(
                out,
                &plan.insert,
                |out, v| self.write_identifier_quoted(&mut context, out, v.target.physical_name),
                ", ",
            );
            out.push_str(") VALUES (");
            separated_by(
                out,
                &plan.insert,
                |out, v| {
                    self.write_aliased_column(
                        &mut context,
                        out,
                        SOURCE_ALIAS,
                        v.source.physical_name,
                    )
                },
                ", ",
            );
            out.push(')');
        }
        if let Some(constraints) = &plan.delete_unmatched {
            out.push_str("\nWHEN NOT MATCHED BY SOURCE");
            for constraint in constraints {
                out.push_str(" AND ");
                self.write_aliased_column(
                    &mut context,
                    out,
                    TARGET_ALIAS,
                    constraint.target.physical_name,
                );
                out.push_str(" IN (SELECT ");
                self.write_identifier_quoted(&mut context, out, constraint.source.physical_name);
                out.push_str(" FROM ");
                row_source.write_source(self.as_dyn(), &mut context, out, plan.source, parameter)?;
                out.push(')');
            }
            out.push_str(" THEN DELETE");
        }
        if let Some(result) = &plan.result {
            out.push('\n');
            self.write_output_into(&mut context, out, result, action);
        }
        out.push(';');
        if let Some(result) = &plan.result {
            out.push('\n');
            self.write_result_select(
                &mut context,
                out,
                result,
                row_source,
                plan.source,
                parameter,
                action,
            )?;
        }
        Ok(())
    }
}

/// Fallback writer with ANSI quoting and types, the statement shapes being the ones of the
/// dialect the crate compiles for.
#[derive(Default, Debug, Clone, Copy)]
pub struct GenericSqlWriter;

impl GenericSqlWriter {
    pub fn new() -> Self {
        Self {}
    }
}

impl SqlWriter for GenericSqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }
}
