//! SQL statement builders
//!
//! Statements address tables by their metadata so placeholders can carry the
//! column types the dialect needs. Values are always bound, never inlined.

use dbscenario_core::{ColumnName, DataValue, QualifiedTable, Row, TableMetadata};

use crate::database::Dialect;

/// SQL text with its bound parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// SQL text
    pub sql: String,

    /// Parameters in placeholder order
    pub params: Vec<DataValue>,
}

struct Builder<'a> {
    dialect: Dialect,
    metadata: &'a TableMetadata,
    params: Vec<DataValue>,
}

impl<'a> Builder<'a> {
    fn new(dialect: Dialect, metadata: &'a TableMetadata) -> Self {
        Builder {
            dialect,
            metadata,
            params: Vec::new(),
        }
    }

    fn bind(&mut self, column: &ColumnName, value: &DataValue) -> String {
        self.params.push(value.clone());
        self.dialect
            .placeholder(self.params.len(), value, self.metadata.column(column))
    }

    /// `"A" = ? AND "B" = ?`
    fn conditions(&mut self, row: &Row, columns: &[ColumnName]) -> String {
        columns
            .iter()
            .map(|column| {
                let value = row.get(column).cloned().unwrap_or_default();
                format!(
                    "{} = {}",
                    self.dialect.quote_identifier(column.as_str()),
                    self.bind(column, &value)
                )
            })
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    fn table(&self) -> String {
        self.dialect.quote_table(&self.metadata.table)
    }

    fn finish(self, sql: String) -> Statement {
        Statement {
            sql,
            params: self.params,
        }
    }
}

/// `INSERT INTO t (cols) VALUES (...)`
pub fn insert(dialect: Dialect, metadata: &TableMetadata, row: &Row) -> Statement {
    let mut builder = Builder::new(dialect, metadata);
    let mut columns = Vec::with_capacity(row.len());
    let mut values = Vec::with_capacity(row.len());
    for (column, value) in row.cells() {
        columns.push(dialect.quote_identifier(column.as_str()));
        values.push(builder.bind(column, value));
    }
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        builder.table(),
        columns.join(", "),
        values.join(", ")
    );
    builder.finish(sql)
}

/// `UPDATE t SET non-key columns WHERE key`, `None` when the row only holds key columns
pub fn update(dialect: Dialect, metadata: &TableMetadata, row: &Row, key: &[ColumnName]) -> Option<Statement> {
    let mut builder = Builder::new(dialect, metadata);
    let assignments: Vec<String> = row
        .cells()
        .iter()
        .filter(|(column, _)| !key.contains(column))
        .map(|(column, value)| {
            format!(
                "{} = {}",
                dialect.quote_identifier(column.as_str()),
                builder.bind(column, value)
            )
        })
        .collect();
    if assignments.is_empty() {
        return None;
    }

    let conditions = builder.conditions(row, key);
    let sql = format!(
        "UPDATE {} SET {} WHERE {}",
        builder.table(),
        assignments.join(", "),
        conditions
    );
    Some(builder.finish(sql))
}

/// `DELETE FROM t WHERE key`
pub fn delete_by_key(dialect: Dialect, metadata: &TableMetadata, row: &Row, key: &[ColumnName]) -> Statement {
    let mut builder = Builder::new(dialect, metadata);
    let conditions = builder.conditions(row, key);
    let sql = format!("DELETE FROM {} WHERE {}", builder.table(), conditions);
    builder.finish(sql)
}

/// `SELECT COUNT(*) FROM t WHERE key`
pub fn count_by_key(dialect: Dialect, metadata: &TableMetadata, row: &Row, key: &[ColumnName]) -> Statement {
    let mut builder = Builder::new(dialect, metadata);
    let conditions = builder.conditions(row, key);
    let sql = format!("SELECT COUNT(*) FROM {} WHERE {}", builder.table(), conditions);
    builder.finish(sql)
}

/// `DELETE FROM t`
pub fn delete_all(dialect: Dialect, table: &QualifiedTable) -> Statement {
    Statement {
        sql: format!("DELETE FROM {}", dialect.quote_table(table)),
        params: Vec::new(),
    }
}

/// Every column of a table, ordered by primary key when there is one
pub fn select_all(dialect: Dialect, metadata: &TableMetadata) -> Statement {
    let columns: Vec<String> = metadata
        .columns
        .iter()
        .map(|column| dialect.select_expression(column))
        .collect();
    let mut sql = format!(
        "SELECT {} FROM {}",
        columns.join(", "),
        dialect.quote_table(&metadata.table)
    );

    let key: Vec<String> = metadata
        .primary_key()
        .iter()
        .map(|column| dialect.quote_identifier(column.name.as_str()))
        .collect();
    if !key.is_empty() {
        sql.push_str(" ORDER BY ");
        sql.push_str(&key.join(", "));
    } else if dialect == Dialect::Sqlite {
        sql.push_str(" ORDER BY rowid");
    }

    Statement {
        sql,
        params: Vec::new(),
    }
}
