//! Error types for the client crate

use std::fmt::Display;
use thiserror::Error;

use dbscenario_core::{AssertionError, ColumnName, CoreError, LoadError, Operation, QualifiedTable};

/// Error raised by a database backend
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// PostgreSQL error
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] postgres::Error),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Value could not be converted
    #[error("Conversion error: {0}")]
    Conversion(String),
}

/// Convert a displayable error to a Conversion error
pub fn to_conversion_error<E: Display>(err: E) -> DatabaseError {
    DatabaseError::Conversion(err.to_string())
}

/// Why an operation failed on a table
#[derive(Error, Debug)]
pub enum ExecutionFailure {
    /// The database rejected a statement
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// The table does not exist in the database
    #[error("table does not exist")]
    TableNotFound,

    /// The operation matches rows by key but the table has none
    #[error("table has no primary key")]
    NoPrimaryKey,

    /// The data set lacks a primary key column
    #[error("data set does not provide primary key column {column}")]
    MissingKeyColumn {
        /// Key column absent from the data set
        column: ColumnName,
    },

    /// UPDATE found no row with the data set row's key
    #[error("no row matches {row}")]
    RowNotFound {
        /// Rendered key of the row
        row: String,
    },
}

/// An operation failed; writes made before the failure are not rolled back
#[derive(Error, Debug)]
#[error("{operation} failed{}: {failure}", on_table(.table))]
pub struct ExecutionError {
    /// Operation being executed
    pub operation: Operation,

    /// Table being written, if the failure concerns one table
    pub table: Option<QualifiedTable>,

    /// Underlying cause
    #[source]
    pub failure: ExecutionFailure,
}

impl ExecutionError {
    /// Failure on one table
    pub fn on(operation: Operation, table: &QualifiedTable, failure: impl Into<ExecutionFailure>) -> Self {
        ExecutionError {
            operation,
            table: Some(table.clone()),
            failure: failure.into(),
        }
    }
}

fn on_table(table: &Option<QualifiedTable>) -> String {
    match table {
        Some(table) => format!(" on table {}", table),
        None => String::new(),
    }
}

/// Client error type
#[derive(Error, Debug)]
pub enum ClientError {
    /// Invalid configuration or request
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Fixture directory could not be resolved or loaded
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Database error outside of an operation
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// Operation failed
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// Expected data does not match the database
    #[error(transparent)]
    Assertion(#[from] AssertionError),

    /// No data source is registered under the name
    #[error("Unknown data source: {0}")]
    UnknownDataSource(String),

    /// A table to read does not exist in the database
    #[error("Table not found: {0}")]
    TableNotFound(QualifiedTable),

    /// Neither the request nor the configuration names a data source
    #[error("No data source given and no default configured")]
    NoDataSource,
}

/// Result type for the client crate
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;
    use dbscenario_core::TableName;

    #[test]
    fn test_execution_error_message() {
        let table = QualifiedTable::unqualified(TableName::new("USERS").unwrap());
        let err = ExecutionError::on(
            Operation::Update,
            &table,
            ExecutionFailure::RowNotFound {
                row: "ID=\"9\"".to_string(),
            },
        );
        assert_eq!(err.to_string(), "UPDATE failed on table USERS: no row matches ID=\"9\"");

        let err = ExecutionError {
            operation: Operation::TruncateTable,
            table: None,
            failure: DatabaseError::Connection("closed".to_string()).into(),
        };
        assert_eq!(err.to_string(), "TRUNCATE_TABLE failed: Connection error: closed");
    }

    #[test]
    fn test_error_conversion() {
        let err: ClientError = LoadError::NoLocation.into();
        assert!(matches!(err, ClientError::Load(LoadError::NoLocation)));

        let err: ClientError = to_conversion_error("bad").into();
        assert!(matches!(err, ClientError::Database(DatabaseError::Conversion(_))));
    }
}
