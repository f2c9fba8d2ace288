#[cfg(test)]
mod tests {
    use indoc::indoc;
    use mortar::{Column, ColumnTrait, Selection, SqlWriter, Value};
    use mortar_tests::{Account, Customer, Ledger};
    use rust_decimal::Decimal;

    struct Writer;
    impl SqlWriter for Writer {
        fn as_dyn(&self) -> &dyn SqlWriter {
            self
        }
    }

    const WRITER: Writer = Writer {};

    fn select(selection: &Selection) -> String {
        let mut out = String::new();
        WRITER.write_select(&mut out, selection);
        out
    }

    fn exists(selection: &Selection) -> String {
        let mut out = String::new();
        WRITER.write_exists(&mut out, selection);
        out
    }

    #[test]
    fn filters_consume_parameters_in_order() {
        let selection = Selection::of::<Account>()
            .filter(Account::CUSTOMER_ID.equal_to(7).unwrap())
            .filter(Account::CODE.equal_to("A-1").unwrap())
            .filter(Account::AMOUNT.greater_than(Decimal::new(100, 0)).unwrap());
        let sql = select(&selection);
        assert_eq!(
            sql,
            indoc! {r#"
                SELECT "Id", "Code", "Amount", "CustomerId"
                FROM "dbo"."Account"
                WHERE "CustomerId" = @0 AND "Code" LIKE @1 AND "Amount" > @2;"#}
            .trim()
        );
        assert_eq!(
            selection.arguments(),
            [
                Value::Int32(Some(7)),
                Value::Varchar(Some("A-1".into())),
                Value::Decimal(Some(Decimal::new(100, 0)), 38, 0),
            ]
        );
        assert_eq!(sql, select(&selection), "Compilation must be deterministic");
    }

    #[test]
    fn operators() {
        let selection = Selection::of::<Account>()
            .filter(Account::CODE.not_equal_to("X%").unwrap())
            .filter(Account::CUSTOMER_ID.equal_to(None::<i32>).unwrap())
            .filter(Account::ID.between(1, 10).unwrap())
            .filter(Account::ID.in_set([1, 2, 3]).unwrap())
            .filter(Account::CUSTOMER_ID.not_equal_to(None::<i32>).unwrap())
            .filter(Account::AMOUNT.is_not_null())
            .order_by_descending(Account::AMOUNT)
            .order_by(Account::ID);
        assert_eq!(
            select(&selection),
            indoc! {r#"
                SELECT "Id", "Code", "Amount", "CustomerId"
                FROM "dbo"."Account"
                WHERE "Code" NOT LIKE @0 AND "CustomerId" IS NULL AND "Id" BETWEEN @1 AND @2 AND "Id" IN (@3, @4, @5) AND "CustomerId" IS NOT NULL AND "Amount" IS NOT NULL
                ORDER BY "Amount" DESC, "Id" ASC;"#}
            .trim()
        );
        assert_eq!(selection.arguments().len(), 6);
        assert_eq!(selection.arguments()[5], Value::Int32(Some(3)));
    }

    #[test]
    fn invalid_operands() {
        assert!(Account::ID.less_than(None::<i32>).is_err());
        assert!(Account::ID.in_set(Vec::<i32>::new()).is_err());
        assert!(Account::ID.not_in_set([Some(1), None]).is_err());
        assert!(Account::ID.not_in_set([1]).is_ok());
    }

    #[test]
    fn join_projects_related_attributes() {
        let selection = Selection::of::<Account>()
            .left_join(Account::CUSTOMER_ID, Customer::CUSTOMER_ID)
            .filter(Customer::NAME.equal_to("Acme%").unwrap());
        assert_eq!(
            select(&selection),
            indoc! {r#"
                SELECT "dbo"."Account"."Id", "dbo"."Account"."Code", "dbo"."Account"."Amount", "dbo"."Account"."CustomerId", "sales"."Customer"."Name" AS "CustomerName"
                FROM "dbo"."Account"
                LEFT JOIN "sales"."Customer" ON "sales"."Customer"."CustomerId" = "dbo"."Account"."CustomerId"
                WHERE "sales"."Customer"."Name" LIKE @0;"#}
            .trim()
        );
        let selection = Selection::of::<Account>()
            .select([Account::CODE, Account::CUSTOMER_NAME])
            .inner_join(Account::CUSTOMER_ID, Customer::CUSTOMER_ID);
        assert_eq!(
            select(&selection),
            indoc! {r#"
                SELECT "dbo"."Account"."Code", "sales"."Customer"."Name" AS "CustomerName"
                FROM "dbo"."Account"
                INNER JOIN "sales"."Customer" ON "sales"."Customer"."CustomerId" = "dbo"."Account"."CustomerId";"#}
            .trim()
        );
    }

    #[test]
    fn two_phase_paging() {
        let keys = Selection::of::<Ledger>()
            .filter(Ledger::AMOUNT.greater_than(Decimal::new(100, 0)).unwrap())
            .page(10, Some(20));
        let selection = Selection::of::<Ledger>().with_parent("page", keys).unwrap();
        assert_eq!(
            select(&selection),
            indoc! {r#"
                WITH "page" AS (
                SELECT "Id"
                FROM "dbo"."Ledger"
                WHERE "Amount" > @0
                ORDER BY "Id" ASC
                OFFSET @1 ROWS FETCH NEXT @2 ROWS ONLY
                )
                SELECT "dbo"."Ledger"."Id", "dbo"."Ledger"."Amount"
                FROM "dbo"."Ledger"
                WHERE EXISTS (SELECT 1 FROM "page" WHERE "page"."Id" = "dbo"."Ledger"."Id");"#}
            .trim()
        );
        assert_eq!(
            selection.arguments(),
            [
                Value::Decimal(Some(Decimal::new(100, 0)), 38, 0),
                Value::Int64(Some(10)),
                Value::Int64(Some(20)),
            ]
        );

        let keys = Selection::of::<Ledger>()
            .filter(Ledger::AMOUNT.greater_than(Decimal::new(100, 0)).unwrap())
            .page(10, None);
        let selection = Selection::of::<Ledger>()
            .with_parent("page", keys)
            .unwrap()
            .filter(Ledger::ID.not_in_set([4i64]).unwrap());
        let sql = select(&selection);
        assert!(sql.contains("ORDER BY \"Id\" ASC\nOFFSET @1 ROWS\n)"), "{sql}");
        assert!(!sql.contains("FETCH NEXT"));
        assert!(sql.ends_with(
            "WHERE EXISTS (SELECT 1 FROM \"page\" WHERE \"page\".\"Id\" = \"dbo\".\"Ledger\".\"Id\") AND \"dbo\".\"Ledger\".\"Id\" NOT IN (@2);"
        ));
        assert_eq!(selection.arguments().len(), 3);
    }

    #[test]
    fn parent_errors() {
        let paged = Selection::of::<Ledger>().page_by_keys("keys").unwrap();
        assert!(
            Selection::of::<Ledger>()
                .with_parent("again", paged.clone())
                .is_err(),
            "A parent cannot have its own parent"
        );
        assert!(paged.with_parent("twice", Selection::of::<Ledger>()).is_err());
        assert!(
            Selection::of::<Customer>()
                .with_parent("keys", Selection::of::<Ledger>())
                .is_err(),
            "Id of the ledger is not an attribute of the customer"
        );
        assert!(
            Selection::of::<Account>()
                .with_parent("keys", Selection::of::<Customer>())
                .is_ok()
        );
        assert!(
            Selection::of::<Account>()
                .with_parent("keys", Selection::of::<Customer>().select([Customer::NAME]))
                .is_err(),
            "Name of the customer is not an attribute of the account"
        );
        assert!(
            Selection::of::<Account>()
                .with_parent("keys", Selection::of::<Account>().select([Account::CUSTOMER_ID]))
                .is_ok()
        );
    }

    #[test]
    #[should_panic]
    fn column_out_of_the_definition() {
        Column::<Ledger>::new(2).attribute();
    }

    #[test]
    fn paging_by_keys_keeps_the_key_order() {
        let selection = Selection::of::<Ledger>()
            .page(0, Some(5))
            .page_by_keys("k")
            .unwrap();
        assert_eq!(
            select(&selection),
            indoc! {r#"
                WITH "k" AS (
                SELECT "Id"
                FROM "dbo"."Ledger"
                ORDER BY "Id" ASC
                OFFSET @0 ROWS FETCH NEXT @1 ROWS ONLY
                )
                SELECT "dbo"."Ledger"."Id", "dbo"."Ledger"."Amount"
                FROM "dbo"."Ledger"
                WHERE EXISTS (SELECT 1 FROM "k" WHERE "k"."Id" = "dbo"."Ledger"."Id")
                ORDER BY "dbo"."Ledger"."Id" ASC;"#}
            .trim()
        );

        let selection = Selection::of::<Ledger>()
            .order_by_descending(Ledger::AMOUNT)
            .page(0, None)
            .page_by_keys("k")
            .unwrap();
        assert!(
            select(&selection).ends_with("\nORDER BY \"dbo\".\"Ledger\".\"Amount\" DESC;"),
            "{}",
            select(&selection)
        );
    }

    #[test]
    fn set_operations_continue_the_parameter_sequence() {
        let selection = Selection::of::<Ledger>()
            .filter(Ledger::AMOUNT.greater_than(Decimal::new(100, 0)).unwrap())
            .union(Selection::of::<Ledger>().filter(Ledger::ID.in_set([1i64, 2]).unwrap()))
            .except(
                Selection::of::<Ledger>()
                    .filter(Ledger::AMOUNT.equal_to(Decimal::ZERO).unwrap())
                    .order_by(Ledger::ID),
            );
        assert_eq!(
            select(&selection),
            indoc! {r#"
                (SELECT "Id", "Amount"
                FROM "dbo"."Ledger"
                WHERE "Amount" > @0)
                UNION
                (SELECT "Id", "Amount"
                FROM "dbo"."Ledger"
                WHERE "Id" IN (@1, @2))
                EXCEPT
                (SELECT "Id", "Amount"
                FROM "dbo"."Ledger"
                WHERE "Amount" = @3);"#}
            .trim()
        );
        assert_eq!(
            selection.arguments(),
            [
                Value::Decimal(Some(Decimal::new(100, 0)), 38, 0),
                Value::Int64(Some(1)),
                Value::Int64(Some(2)),
                Value::Decimal(Some(Decimal::ZERO), 38, 0),
            ]
        );
    }

    #[test]
    fn linked_branches_with_parents() {
        let selection = Selection::of::<Ledger>()
            .page(0, Some(5))
            .page_by_keys("first")
            .unwrap()
            .union_all(
                Selection::of::<Ledger>()
                    .filter(Ledger::AMOUNT.less_than(Decimal::ZERO).unwrap())
                    .page(5, Some(5))
                    .page_by_keys("second")
                    .unwrap(),
            );
        assert_eq!(
            select(&selection),
            indoc! {r#"
                WITH "first" AS (
                SELECT "Id"
                FROM "dbo"."Ledger"
                ORDER BY "Id" ASC
                OFFSET @0 ROWS FETCH NEXT @1 ROWS ONLY
                ),
                "second" AS (
                SELECT "Id"
                FROM "dbo"."Ledger"
                WHERE "Amount" < @2
                ORDER BY "Id" ASC
                OFFSET @3 ROWS FETCH NEXT @4 ROWS ONLY
                )
                (SELECT "dbo"."Ledger"."Id", "dbo"."Ledger"."Amount"
                FROM "dbo"."Ledger"
                WHERE EXISTS (SELECT 1 FROM "first" WHERE "first"."Id" = "dbo"."Ledger"."Id"))
                UNION ALL
                (SELECT "dbo"."Ledger"."Id", "dbo"."Ledger"."Amount"
                FROM "dbo"."Ledger"
                WHERE EXISTS (SELECT 1 FROM "second" WHERE "second"."Id" = "dbo"."Ledger"."Id"));"#}
            .trim()
        );
        assert_eq!(selection.arguments().len(), 5);
        assert_eq!(selection.arguments()[3], Value::Int64(Some(5)));
    }

    #[test]
    fn existence() {
        let selection = Selection::of::<Account>()
            .inner_join(Account::CUSTOMER_ID, Customer::CUSTOMER_ID)
            .filter(Customer::NAME.equal_to("Acme").unwrap())
            .order_by(Account::CODE);
        assert_eq!(
            exists(&selection),
            indoc! {r#"
                IF EXISTS (
                SELECT 1
                FROM "dbo"."Account"
                INNER JOIN "sales"."Customer" ON "sales"."Customer"."CustomerId" = "dbo"."Account"."CustomerId"
                WHERE "sales"."Customer"."Name" LIKE @0
                ) SELECT 1 ELSE SELECT 0;"#}
            .trim()
        );

        let selection = Selection::of::<Ledger>().page_by_keys("keys").unwrap();
        assert_eq!(
            exists(&selection),
            indoc! {r#"
                WITH "keys" AS (
                SELECT "Id"
                FROM "dbo"."Ledger"
                )
                SELECT CASE WHEN EXISTS (
                SELECT 1
                FROM "dbo"."Ledger"
                WHERE EXISTS (SELECT 1 FROM "keys" WHERE "keys"."Id" = "dbo"."Ledger"."Id")
                ) THEN 1 ELSE 0 END;"#}
            .trim()
        );

        let selection = Selection::of::<Customer>()
            .intersect(Selection::of::<Customer>().filter(Customer::CUSTOMER_ID.equal_to(1).unwrap()));
        assert_eq!(
            exists(&selection),
            indoc! {r#"
                IF EXISTS (
                (SELECT "CustomerId", "Name"
                FROM "sales"."Customer")
                INTERSECT
                (SELECT "CustomerId", "Name"
                FROM "sales"."Customer"
                WHERE "CustomerId" = @0)
                ) SELECT 1 ELSE SELECT 0;"#}
            .trim()
        );
    }
}
