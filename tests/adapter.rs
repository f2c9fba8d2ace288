#[cfg(test)]
mod tests {
    use indoc::indoc;
    use mortar::{
        BlockingAdapter, ColumnTrait, Context, Driver, EntityDefinition, Error, ErrorContext,
        GenericSqlWriter, Query, QueryResult, RepositoryAdapter, RepositoryError, Result, Row,
        RowSource, Selection, SqlWriter, StructuredInsert, StructuredMerge, UpdateSet, Value,
    };
    use mortar_tests::{Account, Customer, Ledger, MockConnection, affected, init_logs, labeled};
    use rust_decimal::Decimal;
    use std::error::Error as _;

    #[derive(Clone)]
    struct Parameter;
    impl RowSource for Parameter {
        fn write_source(
            &self,
            writer: &dyn SqlWriter,
            context: &mut Context,
            out: &mut String,
            _source: &EntityDefinition,
            parameter: u32,
        ) -> Result<()> {
            writer.write_parameter_placeholder(context, out, parameter);
            Ok(())
        }

        fn bind(&self, _source: &EntityDefinition, rows: Vec<Row>) -> Result<Value> {
            Ok(Value::Int64(Some(rows.len() as i64)))
        }
    }

    struct TestDriver;
    impl Driver for TestDriver {
        type SqlWriter = GenericSqlWriter;
        type RowSource = Parameter;

        const NAME: &'static str = "test";

        fn sql_writer(&self) -> GenericSqlWriter {
            GenericSqlWriter::new()
        }

        fn row_source(&self) -> Parameter {
            Parameter
        }
    }

    fn scalar(value: Value) -> Result<Vec<QueryResult>> {
        Ok(vec![QueryResult::Row(labeled(&[""], [value]))])
    }

    fn customer_row(id: i32, name: &str) -> QueryResult {
        QueryResult::Row(labeled(
            &["CustomerId", "Name"],
            [Value::Int32(Some(id)), Value::Varchar(Some(name.into()))],
        ))
    }

    #[tokio::test]
    async fn contains() {
        init_logs();
        let adapter = RepositoryAdapter::new(TestDriver);
        let selection =
            Selection::of::<Customer>().filter(Customer::NAME.equal_to("Acme").unwrap());
        let mut connection = MockConnection::replaying([
            scalar(Value::Int32(Some(1))),
            scalar(Value::Int32(Some(0))),
        ]);
        assert!(adapter.contains(&mut connection, &selection).await.unwrap());
        assert!(!adapter.contains(&mut connection, &selection).await.unwrap());
        let query = connection.last_query().unwrap();
        assert_eq!(
            &*query.sql,
            indoc! {r#"
                IF EXISTS (
                SELECT 1
                FROM "sales"."Customer"
                WHERE "Name" LIKE @0
                ) SELECT 1 ELSE SELECT 0;"#}
            .trim()
        );
        assert_eq!(query.arguments, [Value::Varchar(Some("Acme".into()))]);

        let error = adapter
            .contains(&mut connection, &selection)
            .await
            .unwrap_err();
        assert_eq!(error.operation, "contains");
    }

    #[tokio::test]
    async fn first_or_default() {
        let adapter = RepositoryAdapter::new(TestDriver);
        let selection =
            Selection::of::<Customer>().filter(Customer::NAME.equal_to("Acme").unwrap());
        let mut connection =
            MockConnection::replaying([Ok(vec![customer_row(4, "Acme")]), Ok(vec![])]);
        let customer: Option<Customer> = adapter
            .first_or_default(&mut connection, &selection)
            .await
            .unwrap();
        assert_eq!(
            customer,
            Some(Customer {
                customer_id: Some(4),
                name: "Acme".into(),
            })
        );
        let query = connection.last_query().unwrap();
        assert_eq!(
            &*query.sql,
            indoc! {r#"
                SELECT "CustomerId", "Name"
                FROM "sales"."Customer"
                WHERE "Name" LIKE @0
                ORDER BY "CustomerId" ASC
                OFFSET @1 ROWS FETCH NEXT @2 ROWS ONLY;"#}
            .trim()
        );
        assert_eq!(
            query.arguments,
            [
                Value::Varchar(Some("Acme".into())),
                Value::Int64(Some(0)),
                Value::Int64(Some(1)),
            ]
        );
        assert!(selection.page.is_none(), "The selection is left untouched");

        let customer: Option<Customer> = adapter
            .first_or_default(&mut connection, &selection)
            .await
            .unwrap();
        assert_eq!(customer, None);
    }

    #[tokio::test]
    async fn select_items() {
        let adapter = RepositoryAdapter::new(TestDriver);
        let mut connection = MockConnection::replaying([Ok(vec![
            customer_row(1, "Acme"),
            affected(2),
            customer_row(2, "Initech"),
        ])]);
        let customers: Vec<Customer> = adapter
            .select_items(&mut connection, &Selection::of::<Customer>())
            .await
            .unwrap();
        assert_eq!(customers.len(), 2);
        assert_eq!(customers[1].name, "Initech");

        let error = adapter
            .select_items::<Ledger, _>(&mut connection, &Selection::of::<Customer>())
            .await
            .unwrap_err();
        assert_eq!(error.operation, "select_items");
        assert_eq!(error.subject, format!("{:?}", Selection::of::<Customer>()));
        assert_eq!(connection.queries.len(), 1, "Nothing is sent for the wrong entity");
    }

    #[tokio::test]
    async fn insert_and_update() {
        let adapter = RepositoryAdapter::new(TestDriver);
        let mut connection =
            MockConnection::replaying([Ok(vec![customer_row(9, "Acme")]), Ok(vec![affected(1)])]);
        let inserted = adapter
            .insert(
                &mut connection,
                &Customer {
                    customer_id: None,
                    name: "Acme".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(inserted.customer_id, Some(9));
        assert_eq!(
            &*connection.queries[0].sql,
            indoc! {r#"
                INSERT INTO "sales"."Customer" ("Name")
                OUTPUT INSERTED."CustomerId", INSERTED."Name"
                VALUES (@0);"#}
            .trim()
        );

        let updated = adapter
            .update_item(&mut connection, &inserted)
            .await
            .unwrap();
        assert_eq!(updated, 1);
        assert_eq!(
            &*connection.queries[1].sql,
            indoc! {r#"
                UPDATE "sales"."Customer"
                SET "Name" = @0
                WHERE "CustomerId" = @1;"#}
            .trim()
        );

        let error = adapter
            .update_item(&mut connection, &Customer::default())
            .await
            .unwrap_err();
        assert_eq!(error.operation, "update_item");
        assert_eq!(connection.queries.len(), 2);

        let mut connection = MockConnection::replaying([Ok(vec![affected(2), affected(3)])]);
        let update = UpdateSet::new(
            Selection::of::<Account>().filter(Account::CODE.equal_to("A%").unwrap()),
        )
        .unwrap();
        let error = adapter.update(&mut connection, &update).await.unwrap_err();
        assert_eq!(error.operation, "update");
        assert!(connection.queries.is_empty(), "Nothing to SET, nothing is sent");
        assert!(adapter.update_query(&update).is_err());

        let update = update.set(Account::AMOUNT, Decimal::ZERO).unwrap();
        assert_eq!(adapter.update(&mut connection, &update).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn bulk_commands() {
        let adapter = RepositoryAdapter::new(TestDriver);
        let ledgers = [
            Ledger::new(Decimal::new(1050, 2)),
            Ledger::new(Decimal::new(2025, 2)),
        ];
        let mut connection = MockConnection::replaying([
            Ok(vec![affected(2)]),
            Ok(ledgers
                .iter()
                .zip(1..)
                .map(|(ledger, id)| {
                    QueryResult::Row(labeled(
                        &["Id", "Amount"],
                        [
                            Value::Int64(Some(id)),
                            Value::Decimal(Some(ledger.amount), 19, 2),
                        ],
                    ))
                })
                .collect()),
        ]);
        let written = adapter
            .insert_rows(&mut connection, &StructuredInsert::<Ledger>::new(), &ledgers)
            .await
            .unwrap();
        assert_eq!(written, 2);
        assert_eq!(connection.queries[0].arguments, [Value::Int64(Some(2))]);

        let inserted: Vec<Ledger> = adapter
            .insert_rows_returning(
                &mut connection,
                &StructuredInsert::<Ledger>::new().select_from_inserted(),
                &ledgers,
            )
            .await
            .unwrap();
        assert_eq!(inserted.len(), 2);
        assert_eq!(inserted[1].id, Some(2));
        assert_eq!(inserted[1].amount, Decimal::new(2025, 2));
    }

    #[tokio::test]
    async fn bulk_failures_carry_the_rows() {
        let adapter = RepositoryAdapter::new(TestDriver);
        let mut connection =
            MockConnection::new(|_| Err(Error::msg("Violation of PRIMARY KEY constraint")));
        let ledgers = [Ledger::new(Decimal::ONE)];
        let error = adapter
            .merge_rows(&mut connection, &StructuredMerge::<Ledger>::new(), &ledgers)
            .await
            .unwrap_err();
        assert_eq!(error.operation, "merge_rows");
        assert_eq!(error.subject, format!("{:?}", &ledgers[..]));
        assert_eq!(
            error.source().map(|v| v.to_string()).as_deref(),
            Some("Violation of PRIMARY KEY constraint")
        );
        assert_eq!(connection.queries.len(), 1);

        let error = adapter
            .merge_rows_returning::<Ledger, _, _, _>(
                &mut connection,
                &StructuredMerge::<Ledger>::new().select_from_inserted(),
                &ledgers,
            )
            .await
            .unwrap_err();
        assert_eq!(error.operation, "merge_rows");

        let error = adapter
            .insert_rows(
                &mut connection,
                &StructuredInsert::<Customer, Ledger>::new(),
                &ledgers,
            )
            .await
            .unwrap_err();
        assert_eq!(error.operation, "insert_rows");
        assert_eq!(connection.queries.len(), 2, "The insert does not compile");

        let error: Box<dyn std::error::Error> = error.into();
        assert!(error.downcast_ref::<RepositoryError>().is_some());
    }

    #[tokio::test]
    async fn delete_selection() {
        let adapter = RepositoryAdapter::new(TestDriver);
        let mut connection = MockConnection::new(|query| {
            Err(Error::msg("connection reset")).with_context(|| format!("While running {query}"))
        });
        let paged = Selection::of::<Ledger>().page(0, Some(10));
        let error = adapter
            .delete_selection(&mut connection, &paged)
            .await
            .unwrap_err();
        assert_eq!(error.operation, "delete_selection");
        assert!(connection.queries.is_empty());

        let selection = Selection::of::<Ledger>().filter(Ledger::ID.in_set([1i64, 2]).unwrap());
        let error = adapter
            .delete_selection(&mut connection, &selection)
            .await
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            format!("delete_selection failed for {selection:?}")
        );
        let source = error.source().expect("The cause is kept");
        assert!(source.to_string().starts_with("While running"), "{source}");
        assert_eq!(
            &*connection.queries[0].sql,
            "DELETE FROM \"dbo\".\"Ledger\"\nWHERE \"Id\" IN (@0, @1);"
        );
    }

    #[tokio::test]
    async fn execute_scalar() {
        let adapter = RepositoryAdapter::new(TestDriver);
        let mut connection =
            MockConnection::replaying([scalar(Value::Int64(Some(3))), scalar(Value::Int64(None))]);
        let query = Query::new("SELECT COUNT(*) FROM [dbo].[Ledger] WHERE [Amount] > @0;")
            .bind(Decimal::ZERO);
        let count: Option<i64> = adapter
            .execute_scalar(&mut connection, query.clone())
            .await
            .unwrap();
        assert_eq!(count, Some(3));
        let count: Option<i64> = adapter
            .execute_scalar(&mut connection, query.clone())
            .await
            .unwrap();
        assert_eq!(count, None);
        let count: Option<i64> = adapter.execute_scalar(&mut connection, query).await.unwrap();
        assert_eq!(count, None, "No row at all");
    }

    #[test]
    fn blocking() {
        let adapter = BlockingAdapter::new(TestDriver);
        let mut connection = MockConnection::replaying([
            scalar(Value::Boolean(Some(true))),
            Ok(vec![customer_row(1, "Acme")]),
        ]);
        let selection = Selection::of::<Customer>();
        assert!(adapter.contains(&mut connection, &selection).unwrap());
        let customers: Vec<Customer> = adapter.select_items(&mut connection, &selection).unwrap();
        assert_eq!(customers.len(), 1);
        assert_eq!(connection.queries.len(), 2);
        assert_eq!(TestDriver::NAME, "test");

        let mut connection = MockConnection::new(|_| Err(Error::msg("deadlock victim")));
        let error = adapter
            .merge_rows(
                &mut connection,
                &StructuredMerge::<Ledger>::new(),
                &[Ledger::new(Decimal::ONE)],
            )
            .unwrap_err();
        assert_eq!(error.operation, "merge_rows");
    }
}
