#[cfg(test)]
mod tests {
    use indoc::indoc;
    use mortar::{
        Context, EntityDefinition, Result, Row, RowSource, SqlWriter, StructuredMerge, Value,
    };
    use mortar_tests::{Account, AccountRow, Ledger, init_logs};

    struct Writer;
    impl SqlWriter for Writer {
        fn as_dyn(&self) -> &dyn SqlWriter {
            self
        }
    }

    const WRITER: Writer = Writer {};

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

    #[test]
    fn merge_on_primary_key() {
        let command = StructuredMerge::<Ledger>::new()
            .compile(&WRITER, Parameter)
            .unwrap();
        assert!(!command.returns_rows());
        assert_eq!(
            command.sql(),
            indoc! {r#"
                MERGE "dbo"."Ledger" AS "target"
                USING @0 AS "source"
                ON ("target"."Id" = "source"."Id")
                WHEN MATCHED THEN
                UPDATE SET "target"."Amount" = "source"."Amount"
                WHEN NOT MATCHED BY TARGET THEN
                INSERT ("Amount") VALUES ("source"."Amount");"#}
            .trim()
        );
    }

    #[test]
    fn merge_deleting_unmatched() {
        init_logs();
        let command = StructuredMerge::<Ledger>::new()
            .delete_unmatched_in_source()
            .compile(&WRITER, Parameter)
            .unwrap();
        assert!(
            command
                .sql()
                .ends_with("\nWHEN NOT MATCHED BY SOURCE THEN DELETE;")
        );

        let command = StructuredMerge::<Account, AccountRow>::new()
            .on(Account::CODE, AccountRow::CODE)
            .merge_into([Account::AMOUNT])
            .from([AccountRow::AMOUNT])
            .delete_unmatched_in_source_where([Account::CUSTOMER_ID])
            .compile(&WRITER, Parameter)
            .unwrap();
        assert_eq!(
            command.sql(),
            indoc! {r#"
                MERGE "dbo"."Account" AS "target"
                USING @0 AS "source"
                ON ("target"."Code" = "source"."Code")
                WHEN MATCHED THEN
                UPDATE SET "target"."Amount" = "source"."Amount"
                WHEN NOT MATCHED BY TARGET THEN
                INSERT ("Amount") VALUES ("source"."Amount")
                WHEN NOT MATCHED BY SOURCE AND "target"."CustomerId" IN (SELECT "CustomerId" FROM @0) THEN DELETE;"#}
            .trim()
        );
    }

    #[test]
    fn merge_returning_rows_skips_deleted() {
        let command = StructuredMerge::<Ledger>::new()
            .delete_unmatched_in_source()
            .select_from_inserted()
            .compile(&WRITER, Parameter)
            .unwrap();
        assert!(command.returns_rows());
        assert_eq!(
            command.sql(),
            indoc! {r#"
                DECLARE @inserted TABLE ("Id" BIGINT, "Amount" DECIMAL(19,2), "__merge_action" VARCHAR);
                MERGE "dbo"."Ledger" AS "target"
                USING @0 AS "source"
                ON ("target"."Id" = "source"."Id")
                WHEN MATCHED THEN
                UPDATE SET "target"."Amount" = "source"."Amount"
                WHEN NOT MATCHED BY TARGET THEN
                INSERT ("Amount") VALUES ("source"."Amount")
                WHEN NOT MATCHED BY SOURCE THEN DELETE
                OUTPUT INSERTED."Id", INSERTED."Amount", $action
                INTO @inserted ("Id", "Amount", "__merge_action");
                SELECT "inserted"."Id", "inserted"."Amount"
                FROM @inserted AS "inserted"
                WHERE "inserted"."__merge_action" <> 'DELETE';"#}
            .trim()
        );

        let command = StructuredMerge::<Ledger>::new()
            .selecting([Ledger::ID])
            .compile(&WRITER, Parameter)
            .unwrap();
        assert!(command.sql().starts_with("DECLARE @inserted TABLE (\"Id\" BIGINT);\n"));
        assert!(command.sql().ends_with(
            "OUTPUT INSERTED.\"Id\"\nINTO @inserted (\"Id\");\nSELECT \"inserted\".\"Id\"\nFROM @inserted AS \"inserted\";"
        ));
    }

    #[test]
    fn merge_rejects() {
        let error = StructuredMerge::<Account, AccountRow>::new()
            .plan()
            .unwrap_err();
        assert!(error.to_string().contains("No column of"), "{error:#}");
        assert!(
            StructuredMerge::<Account, AccountRow>::new()
                .on(Account::CODE, AccountRow::CODE)
                .merge_into([Account::AMOUNT, Account::CUSTOMER_ID])
                .from([AccountRow::AMOUNT])
                .plan()
                .is_err()
        );
        let plan = StructuredMerge::<Account, AccountRow>::new()
            .on(Account::CODE, AccountRow::CODE)
            .plan()
            .unwrap();
        assert_eq!(plan.update.len(), 2, "Code is matched, not updated");
        assert_eq!(plan.insert.len(), 3);
        assert!(plan.result.is_none());
    }
}
