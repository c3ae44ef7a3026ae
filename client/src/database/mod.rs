//! Database seam
//!
//! Everything the executor and the assertions need from a database goes
//! through the [`Database`] trait, so the same fixture code drives SQLite,
//! PostgreSQL or a mock.

mod postgres;
mod sqlite;

pub use self::postgres::PostgresDatabase;
pub use self::sqlite::SqliteDatabase;

use std::fmt::{Display, Formatter, Result as FmtResult};
use serde::{Deserialize, Serialize};

use dbscenario_core::{ColumnMetadata, ColumnType, DataValue, QualifiedTable, TableMetadata};

use crate::error::DatabaseError;

/// SQL dialect of a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dialect {
    /// SQLite
    Sqlite,

    /// PostgreSQL
    Postgres,
}

impl Display for Dialect {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Dialect::Sqlite => f.write_str("sqlite"),
            Dialect::Postgres => f.write_str("postgres"),
        }
    }
}

impl Dialect {
    /// Quote an identifier, doubling embedded quotes
    pub fn quote_identifier(&self, identifier: &str) -> String {
        format!("\"{}\"", identifier.replace('"', "\"\""))
    }

    /// Quote a possibly schema-qualified table name
    pub fn quote_table(&self, table: &QualifiedTable) -> String {
        match &table.schema {
            Some(schema) => format!(
                "{}.{}",
                self.quote_identifier(schema.as_str()),
                self.quote_identifier(table.table.as_str())
            ),
            None => self.quote_identifier(table.table.as_str()),
        }
    }

    /// Placeholder for the `index`-th (1-based) parameter bound to `value`.
    ///
    /// PostgreSQL parameters travel as text and are cast to the column type on
    /// the server; binary values travel as `bytea`.
    pub fn placeholder(
        &self,
        index: usize,
        value: &DataValue,
        column: Option<&ColumnMetadata>,
    ) -> String {
        match self {
            Dialect::Sqlite => format!("?{}", index),
            Dialect::Postgres => match (value, column) {
                (DataValue::Binary(_), _) => format!("${}::bytea", index),
                (_, Some(column)) if !column.declared_type.is_empty() => format!(
                    "CAST(${}::text AS {})",
                    index,
                    self.quote_identifier(&column.declared_type)
                ),
                _ => format!("${}::text", index),
            },
        }
    }

    /// Expression selecting a column for comparison
    pub fn select_expression(&self, column: &ColumnMetadata) -> String {
        let quoted = self.quote_identifier(column.name.as_str());
        match self {
            Dialect::Postgres if column.column_type != ColumnType::Binary => {
                format!("{}::text", quoted)
            }
            _ => quoted,
        }
    }
}

/// A database fixtures are written to and read from
///
/// Every result row is a list of cells in select-list order.
#[cfg_attr(test, mockall::automock)]
pub trait Database {
    /// SQL dialect of the backend
    fn dialect(&self) -> Dialect;

    /// Metadata of a table, `None` if the table does not exist
    fn table_metadata(
        &mut self,
        table: &QualifiedTable,
    ) -> Result<Option<TableMetadata>, DatabaseError>;

    /// Execute a statement, returning the number of affected rows
    fn execute(&mut self, sql: &str, params: &[DataValue]) -> Result<u64, DatabaseError>;

    /// Run a query
    fn query(&mut self, sql: &str, params: &[DataValue]) -> Result<Vec<Vec<DataValue>>, DatabaseError>;

    /// Remove every row of the tables and reset their identity counters
    fn truncate(&mut self, tables: &[QualifiedTable]) -> Result<(), DatabaseError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbscenario_core::{ColumnName, SchemaName, TableName};
    use rstest::rstest;

    fn column(declared: &str) -> ColumnMetadata {
        ColumnMetadata::new(ColumnName::new("ID").unwrap(), declared)
    }

    #[test]
    fn test_quoting() {
        let table = QualifiedTable::new(
            Some(SchemaName::new("app").unwrap()),
            TableName::new("my\"table").unwrap(),
        );
        assert_eq!(Dialect::Sqlite.quote_table(&table), "\"app\".\"my\"\"table\"");
        assert_eq!(Dialect::Postgres.quote_identifier("NAME"), "\"NAME\"");
    }

    #[rstest]
    #[case(Dialect::Sqlite, DataValue::text("1"), Some("INTEGER"), "?3")]
    #[case(Dialect::Postgres, DataValue::text("1"), Some("int4"), "CAST($3::text AS \"int4\")")]
    #[case(Dialect::Postgres, DataValue::Null, Some("timestamptz"), "CAST($3::text AS \"timestamptz\")")]
    #[case(Dialect::Postgres, DataValue::Binary(vec![1]), Some("bytea"), "$3::bytea")]
    #[case(Dialect::Postgres, DataValue::text("x"), None, "$3::text")]
    fn test_placeholder(
        #[case] dialect: Dialect,
        #[case] value: DataValue,
        #[case] declared: Option<&str>,
        #[case] expected: &str,
    ) {
        let column = declared.map(column);
        assert_eq!(dialect.placeholder(3, &value, column.as_ref()), expected);
    }

    #[test]
    fn test_select_expression() {
        assert_eq!(Dialect::Postgres.select_expression(&column("int4")), "\"ID\"::text");
        assert_eq!(Dialect::Postgres.select_expression(&column("bytea")), "\"ID\"");
        assert_eq!(Dialect::Sqlite.select_expression(&column("INTEGER")), "\"ID\"");
    }
}
