//! Tables and table metadata
//!
//! This module provides the in-memory table loaded from a fixture file, and the
//! column metadata a database reports for a physical table.

use std::collections::HashSet;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use super::names::{ColumnName, QualifiedTable, SchemaName, TableName};
use super::row::{DataValue, Row};

/// Type family of a column, used to normalize values before comparing them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    /// Whole numbers of any width
    Integer,

    /// Exact numerics (numeric, decimal, money)
    Decimal,

    /// Approximate numerics (real, float, double)
    Float,

    /// Boolean
    Boolean,

    /// Character data
    Text,

    /// Calendar date
    Date,

    /// Time of day
    Time,

    /// Date and time
    Timestamp,

    /// Binary data
    Binary,

    /// UUID
    Uuid,

    /// No declared type, or one that is not recognised
    Unknown,
}

impl Default for ColumnType {
    fn default() -> Self {
        ColumnType::Unknown
    }
}

impl ColumnType {
    /// Map a declared SQL type name to its type family
    pub fn from_declared(declared: &str) -> Self {
        let lowered = declared.trim().to_ascii_lowercase();
        let base = lowered.split('(').next().unwrap_or("").trim();

        if base.is_empty() {
            return ColumnType::Unknown;
        }
        if base.starts_with("bool") {
            return ColumnType::Boolean;
        }
        if base == "uuid" || base == "uniqueidentifier" {
            return ColumnType::Uuid;
        }
        if base.contains("timestamp") || base.contains("datetime") {
            return ColumnType::Timestamp;
        }
        if base == "date" {
            return ColumnType::Date;
        }
        if base.starts_with("time") {
            return ColumnType::Time;
        }
        if base == "interval" || base == "point" {
            return ColumnType::Text;
        }
        if base.contains("blob")
            || base.contains("bytea")
            || base.contains("binary")
            || base == "raw"
            || base == "image"
        {
            return ColumnType::Binary;
        }
        if base.starts_with("numeric")
            || base.starts_with("decimal")
            || base == "money"
            || base == "number"
        {
            return ColumnType::Decimal;
        }
        if base.contains("real") || base.contains("float") || base.contains("double") {
            return ColumnType::Float;
        }
        if base.contains("int") || base.contains("serial") {
            return ColumnType::Integer;
        }
        if base.contains("char")
            || base.contains("text")
            || base.contains("clob")
            || base.contains("string")
            || base.starts_with("json")
            || base == "xml"
            || base == "name"
        {
            return ColumnType::Text;
        }
        ColumnType::Unknown
    }

    /// Whether values of this type compare numerically
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Decimal | ColumnType::Float)
    }
}

/// Metadata of a physical column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    /// Name of the column
    pub name: ColumnName,

    /// Type name as declared in the database
    pub declared_type: String,

    /// Type family derived from the declared type
    pub column_type: ColumnType,

    /// Whether the column can be null
    pub nullable: bool,

    /// Position inside the primary key (1-based), if part of it
    pub primary_key: Option<u32>,
}

impl ColumnMetadata {
    /// Create nullable, non-key column metadata
    pub fn new(name: ColumnName, declared_type: impl Into<String>) -> Self {
        let declared_type = declared_type.into();
        ColumnMetadata {
            column_type: ColumnType::from_declared(&declared_type),
            name,
            declared_type,
            nullable: true,
            primary_key: None,
        }
    }

    /// Mark the column as part of the primary key at `position`
    pub fn with_primary_key(mut self, position: u32) -> Self {
        self.primary_key = Some(position);
        self.nullable = false;
        self
    }

    /// Set nullability
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }
}

/// Metadata of a physical table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMetadata {
    /// Table the metadata describes
    pub table: QualifiedTable,

    /// Columns in definition order
    pub columns: Vec<ColumnMetadata>,
}

impl TableMetadata {
    /// Create table metadata
    pub fn new(table: QualifiedTable, columns: Vec<ColumnMetadata>) -> Self {
        TableMetadata { table, columns }
    }

    /// Get a column by name
    pub fn column(&self, name: &ColumnName) -> Option<&ColumnMetadata> {
        self.columns.iter().find(|col| &col.name == name)
    }

    /// Check if the table has a column
    pub fn has_column(&self, name: &ColumnName) -> bool {
        self.column(name).is_some()
    }

    /// Type family of a column, `Unknown` if the column is not known
    pub fn column_type(&self, name: &ColumnName) -> ColumnType {
        self.column(name)
            .map(|col| col.column_type)
            .unwrap_or(ColumnType::Unknown)
    }

    /// Primary key columns in key order
    pub fn primary_key(&self) -> Vec<&ColumnMetadata> {
        let mut keys: Vec<&ColumnMetadata> = self
            .columns
            .iter()
            .filter(|col| col.primary_key.is_some())
            .collect();
        keys.sort_by_key(|col| col.primary_key);
        keys
    }

    /// Primary key column names in key order
    pub fn primary_key_names(&self) -> Vec<ColumnName> {
        self.primary_key().into_iter().map(|col| col.name.clone()).collect()
    }

    /// Whether the table declares a primary key
    pub fn has_primary_key(&self) -> bool {
        self.columns.iter().any(|col| col.primary_key.is_some())
    }
}

/// A table loaded from a fixture file
///
/// Rows keep the order they had in the source file. Every row carries exactly
/// the table's columns, in the table's column order.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TableRecord")]
pub struct Table {
    name: TableName,
    schema: Option<SchemaName>,
    columns: Vec<ColumnName>,
    rows: Vec<Row>,
}

#[derive(Deserialize)]
struct TableRecord {
    name: TableName,
    #[serde(default)]
    schema: Option<SchemaName>,
    columns: Vec<ColumnName>,
    rows: Vec<Row>,
}

impl TryFrom<TableRecord> for Table {
    type Error = CoreError;

    fn try_from(record: TableRecord) -> Result<Self> {
        Ok(Table::new(record.name, record.columns, record.rows)?.with_schema(record.schema))
    }
}

impl Debug for Table {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Table")
            .field("name", &self.qualified().to_string())
            .field("columns", &self.columns)
            .field("row_count", &self.rows.len())
            .finish()
    }
}

impl Table {
    /// Create a table, checking that every row lines up with the columns
    pub fn new(name: TableName, columns: Vec<ColumnName>, rows: Vec<Row>) -> Result<Self> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column) {
                return Err(CoreError::InvalidTable(format!(
                    "column {} appears more than once in table {}",
                    column, name
                )));
            }
        }

        for (index, row) in rows.iter().enumerate() {
            let matches = row.len() == columns.len()
                && row.columns().zip(columns.iter()).all(|(a, b)| a == b);
            if !matches {
                return Err(CoreError::InvalidTable(format!(
                    "row {} of table {} does not match the table columns",
                    index, name
                )));
            }
        }

        Ok(Table {
            name,
            schema: None,
            columns,
            rows,
        })
    }

    /// Create a table from positional values
    pub fn from_values(
        name: TableName,
        columns: Vec<ColumnName>,
        values: Vec<Vec<DataValue>>,
    ) -> Result<Self> {
        let mut rows = Vec::with_capacity(values.len());
        for (index, row_values) in values.into_iter().enumerate() {
            if row_values.len() != columns.len() {
                return Err(CoreError::InvalidTable(format!(
                    "row {} of table {} has {} values for {} columns",
                    index,
                    name,
                    row_values.len(),
                    columns.len()
                )));
            }
            rows.push(Row::new(columns.iter().cloned().zip(row_values).collect()));
        }
        Table::new(name, columns, rows)
    }

    /// Create a table without rows
    pub fn empty(name: TableName, columns: Vec<ColumnName>) -> Result<Self> {
        Table::new(name, columns, Vec::new())
    }

    /// Qualify the table with a schema
    pub fn with_schema(mut self, schema: Option<SchemaName>) -> Self {
        self.schema = schema;
        self
    }

    /// Table name
    pub fn name(&self) -> &TableName {
        &self.name
    }

    /// Schema qualifier
    pub fn schema(&self) -> Option<&SchemaName> {
        self.schema.as_ref()
    }

    /// Schema-qualified name
    pub fn qualified(&self) -> QualifiedTable {
        QualifiedTable::new(self.schema.clone(), self.name.clone())
    }

    /// Columns in order
    pub fn columns(&self) -> &[ColumnName] {
        &self.columns
    }

    /// Check if the table has a column
    pub fn has_column(&self, name: &ColumnName) -> bool {
        self.columns.contains(name)
    }

    /// Rows in source order
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn cols(names: &[&str]) -> Vec<ColumnName> {
        names.iter().map(|n| ColumnName::new(n).unwrap()).collect()
    }

    #[test]
    fn test_deserialize_checks_row_alignment() {
        let table = Table::from_values(
            TableName::new("USERS").unwrap(),
            cols(&["ID", "NAME"]),
            vec![vec![DataValue::text("1"), DataValue::text("Alice")]],
        )
        .unwrap()
        .with_schema(Some(SchemaName::new("app").unwrap()));

        let mut json = serde_json::to_value(&table).unwrap();
        let back: Table = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(back, table);

        json["columns"] = serde_json::json!(["ID", "NAME", "EMAIL"]);
        assert!(serde_json::from_value::<Table>(json).is_err());
    }

    #[rstest]
    #[case("INTEGER", ColumnType::Integer)]
    #[case("bigint", ColumnType::Integer)]
    #[case("serial", ColumnType::Integer)]
    #[case("NUMERIC(10,2)", ColumnType::Decimal)]
    #[case("double precision", ColumnType::Float)]
    #[case("REAL", ColumnType::Float)]
    #[case("boolean", ColumnType::Boolean)]
    #[case("VARCHAR(100)", ColumnType::Text)]
    #[case("character varying", ColumnType::Text)]
    #[case("timestamp without time zone", ColumnType::Timestamp)]
    #[case("DATETIME", ColumnType::Timestamp)]
    #[case("date", ColumnType::Date)]
    #[case("time with time zone", ColumnType::Time)]
    #[case("BLOB", ColumnType::Binary)]
    #[case("bytea", ColumnType::Binary)]
    #[case("uuid", ColumnType::Uuid)]
    #[case("interval", ColumnType::Text)]
    #[case("", ColumnType::Unknown)]
    fn test_column_type_from_declared(#[case] declared: &str, #[case] expected: ColumnType) {
        assert_eq!(ColumnType::from_declared(declared), expected);
    }

    #[test]
    fn test_table_rejects_misaligned_rows() {
        let name = TableName::new("USERS").unwrap();
        let result = Table::from_values(
            name.clone(),
            cols(&["ID", "NAME"]),
            vec![vec![DataValue::text("1")]],
        );
        assert!(result.is_err());

        let row = Row::new(vec![
            (ColumnName::new("NAME").unwrap(), DataValue::text("Alice")),
            (ColumnName::new("ID").unwrap(), DataValue::text("1")),
        ]);
        assert!(Table::new(name, cols(&["ID", "NAME"]), vec![row]).is_err());
    }

    #[test]
    fn test_table_rejects_duplicate_columns() {
        let name = TableName::new("USERS").unwrap();
        assert!(Table::empty(name, cols(&["ID", "ID"])).is_err());
    }

    #[test]
    fn test_table_accessors() {
        let table = Table::from_values(
            TableName::new("USERS").unwrap(),
            cols(&["ID", "NAME"]),
            vec![
                vec![DataValue::text("1"), DataValue::text("Alice")],
                vec![DataValue::text("2"), DataValue::Null],
            ],
        )
        .unwrap()
        .with_schema(Some(SchemaName::new("app").unwrap()));

        assert_eq!(table.row_count(), 2);
        assert!(table.has_column(&ColumnName::new("NAME").unwrap()));
        assert_eq!(table.qualified().to_string(), "app.USERS");
        assert_eq!(table.rows()[1].get_str("NAME"), Some(&DataValue::Null));
    }

    #[test]
    fn test_primary_key_order() {
        let metadata = TableMetadata::new(
            QualifiedTable::unqualified(TableName::new("ITEMS").unwrap()),
            vec![
                ColumnMetadata::new(ColumnName::new("LINE").unwrap(), "INTEGER").with_primary_key(2),
                ColumnMetadata::new(ColumnName::new("ORDER_ID").unwrap(), "INTEGER").with_primary_key(1),
                ColumnMetadata::new(ColumnName::new("SKU").unwrap(), "TEXT"),
            ],
        );

        let keys: Vec<String> = metadata
            .primary_key_names()
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(keys, vec!["ORDER_ID", "LINE"]);
        assert!(metadata.has_primary_key());
        assert_eq!(
            metadata.column_type(&ColumnName::new("SKU").unwrap()),
            ColumnType::Text
        );
        assert_eq!(
            metadata.column_type(&ColumnName::new("MISSING").unwrap()),
            ColumnType::Unknown
        );
    }
}
