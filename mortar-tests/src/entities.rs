use mortar_core::{
    AsValue, AttributeDefinition, Column, Entity, EntityDefinition, EntityLocation, Result, Row,
    RowLabeled, Value,
};
use rust_decimal::Decimal;
use std::sync::LazyLock;

/// Reads an attribute that only some statements return (related columns, aliases).
fn optional<T: AsValue>(row: &RowLabeled, name: &str) -> Result<Option<T>> {
    if row.get_column(name).is_some() {
        row.get(name)
    } else {
        Ok(None)
    }
}

#[derive(Default, Debug, Clone, PartialEq)]
pub struct Customer {
    pub customer_id: Option<i32>,
    pub name: String,
}

impl Customer {
    pub const CUSTOMER_ID: Column<Self> = Column::new(0);
    pub const NAME: Column<Self> = Column::new(1);
}

impl Entity for Customer {
    fn definition() -> &'static EntityDefinition {
        static DEFINITION: LazyLock<EntityDefinition> = LazyLock::new(|| {
            EntityDefinition::builder("Customer", EntityLocation::table("sales", "Customer"))
                .attribute(
                    AttributeDefinition::of::<i32>("CustomerId")
                        .primary_key()
                        .identity(),
                )
                .attribute(AttributeDefinition::of::<String>("Name"))
                .build()
        });
        &DEFINITION
    }

    fn row(&self) -> Row {
        [self.customer_id.as_value(), self.name.clone().as_value()].into()
    }

    fn from_row(row: RowLabeled) -> Result<Self> {
        Ok(Self {
            customer_id: row.get("CustomerId")?,
            name: row.get("Name")?,
        })
    }
}

/// Account of a customer, the customer name being resolved through the join on `CustomerId`.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Account {
    pub id: Option<i32>,
    pub code: String,
    pub amount: Decimal,
    pub customer_id: Option<i32>,
    pub customer_name: Option<String>,
}

impl Account {
    pub const ID: Column<Self> = Column::new(0);
    pub const CODE: Column<Self> = Column::new(1);
    pub const AMOUNT: Column<Self> = Column::new(2);
    pub const CUSTOMER_ID: Column<Self> = Column::new(3);
    pub const CUSTOMER_NAME: Column<Self> = Column::new(4);
}

impl Entity for Account {
    fn definition() -> &'static EntityDefinition {
        static DEFINITION: LazyLock<EntityDefinition> = LazyLock::new(|| {
            EntityDefinition::builder("Account", EntityLocation::table("dbo", "Account"))
                .attribute(AttributeDefinition::of::<i32>("Id").primary_key().identity())
                .attribute(AttributeDefinition::of::<String>("Code"))
                .attribute(AttributeDefinition::new(
                    "Amount",
                    Value::Decimal(None, 19, 4),
                ))
                .attribute(AttributeDefinition::of::<i32>("CustomerId"))
                .attribute(
                    AttributeDefinition::of::<String>("CustomerName")
                        .physical_name("Name")
                        .related("Customer", EntityLocation::table("sales", "Customer")),
                )
                .structured_type("dbo", "AccountTableType")
                .build()
        });
        &DEFINITION
    }

    fn row(&self) -> Row {
        [
            self.id.as_value(),
            self.code.clone().as_value(),
            Value::Decimal(Some(self.amount), 19, 4),
            self.customer_id.as_value(),
            self.customer_name.clone().as_value(),
        ]
        .into()
    }

    fn from_row(row: RowLabeled) -> Result<Self> {
        Ok(Self {
            id: row.get("Id")?,
            code: row.get("Code")?,
            amount: row.get("Amount")?,
            customer_id: row.get("CustomerId")?,
            customer_name: optional(&row, "CustomerName")?,
        })
    }
}

/// Incoming account data, shaped differently from [`Account`] to exercise source matching.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct AccountRow {
    pub code: String,
    pub amount: Decimal,
    pub customer_id: Option<i32>,
    pub batch: i64,
}

impl AccountRow {
    pub const CODE: Column<Self> = Column::new(0);
    pub const AMOUNT: Column<Self> = Column::new(1);
    pub const CUSTOMER_ID: Column<Self> = Column::new(2);
    pub const BATCH: Column<Self> = Column::new(3);
}

impl Entity for AccountRow {
    fn definition() -> &'static EntityDefinition {
        static DEFINITION: LazyLock<EntityDefinition> = LazyLock::new(|| {
            EntityDefinition::builder("AccountRow", EntityLocation::table("dbo", "AccountRow"))
                .attribute(AttributeDefinition::of::<String>("Code"))
                .attribute(AttributeDefinition::new(
                    "Amount",
                    Value::Decimal(None, 19, 4),
                ))
                .attribute(AttributeDefinition::of::<i32>("CustomerId"))
                .attribute(AttributeDefinition::of::<i64>("Batch"))
                .structured_type("dbo", "AccountRowType")
                .build()
        });
        &DEFINITION
    }

    fn row(&self) -> Row {
        [
            self.code.clone().as_value(),
            Value::Decimal(Some(self.amount), 19, 4),
            self.customer_id.as_value(),
            self.batch.as_value(),
        ]
        .into()
    }

    fn from_row(row: RowLabeled) -> Result<Self> {
        Ok(Self {
            code: row.get("Code")?,
            amount: row.get("Amount")?,
            customer_id: row.get("CustomerId")?,
            batch: row.get("Batch")?,
        })
    }
}

/// Ledger entry, both target and source of the bulk commands.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Ledger {
    pub id: Option<i64>,
    pub amount: Decimal,
}

impl Ledger {
    pub const ID: Column<Self> = Column::new(0);
    pub const AMOUNT: Column<Self> = Column::new(1);

    pub fn new(amount: Decimal) -> Self {
        Self { id: None, amount }
    }
}

impl Entity for Ledger {
    fn definition() -> &'static EntityDefinition {
        static DEFINITION: LazyLock<EntityDefinition> = LazyLock::new(|| {
            EntityDefinition::builder("Ledger", EntityLocation::table("dbo", "Ledger"))
                .attribute(AttributeDefinition::of::<i64>("Id").primary_key().identity())
                .attribute(AttributeDefinition::new(
                    "Amount",
                    Value::Decimal(None, 19, 2),
                ))
                .structured_type("dbo", "LedgerTableType")
                .build()
        });
        &DEFINITION
    }

    fn row(&self) -> Row {
        [self.id.as_value(), Value::Decimal(Some(self.amount), 19, 2)].into()
    }

    fn from_row(row: RowLabeled) -> Result<Self> {
        Ok(Self {
            id: row.get("Id")?,
            amount: row.get("Amount")?,
        })
    }
}
