use crate::{JsonSource, TSqlWriter, TableValuedSource};
use mortar_core::{
    Driver, EntityDefinition, Error, Result, Row, RowSource, SqlWriter, Value, writer::Context,
};
use std::str::FromStr;

/// How bulk commands ship their rows to the server.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowSourceKind {
    /// One table-valued parameter, see [`TableValuedSource`].
    #[default]
    TableValued,
    /// One JSON text parameter, see [`JsonSource`].
    Json,
}

impl FromStr for RowSourceKind {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "table_valued" | "table-valued" | "tvp" => Ok(Self::TableValued),
            "json" => Ok(Self::Json),
            _ => Err(Error::msg(format!(
                "Unknown row source `{value}`, expected `table_valued` or `json`"
            ))),
        }
    }
}

/// Row source chosen at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MssqlRowSource {
    TableValued(TableValuedSource),
    Json(JsonSource),
}

impl From<RowSourceKind> for MssqlRowSource {
    fn from(value: RowSourceKind) -> Self {
        match value {
            RowSourceKind::TableValued => Self::TableValued(TableValuedSource),
            RowSourceKind::Json => Self::Json(JsonSource),
        }
    }
}

impl RowSource for MssqlRowSource {
    fn write_source(
        &self,
        writer: &dyn SqlWriter,
        context: &mut Context,
        out: &mut String,
        source: &EntityDefinition,
        parameter: u32,
    ) -> Result<()> {
        match self {
            Self::TableValued(v) => v.write_source(writer, context, out, source, parameter),
            Self::Json(v) => v.write_source(writer, context, out, source, parameter),
        }
    }

    fn bind(&self, source: &EntityDefinition, rows: Vec<Row>) -> Result<Value> {
        match self {
            Self::TableValued(v) => v.bind(source, rows),
            Self::Json(v) => v.bind(source, rows),
        }
    }
}

/// SQL Server configuration: the writer options and the default row source of bulk commands.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MssqlDriver {
    pub writer: TSqlWriter,
    pub row_source: RowSourceKind,
}

impl MssqlDriver {
    pub const fn new() -> Self {
        Self {
            writer: TSqlWriter::new(),
            row_source: RowSourceKind::TableValued,
        }
    }

    pub const fn with_writer(mut self, writer: TSqlWriter) -> Self {
        self.writer = writer;
        self
    }

    pub const fn with_row_source(mut self, row_source: RowSourceKind) -> Self {
        self.row_source = row_source;
        self
    }
}

impl Driver for MssqlDriver {
    type SqlWriter = TSqlWriter;
    type RowSource = MssqlRowSource;

    const NAME: &'static str = "mssql";

    fn sql_writer(&self) -> Self::SqlWriter {
        self.writer
    }

    fn row_source(&self) -> Self::RowSource {
        self.row_source.into()
    }
}
