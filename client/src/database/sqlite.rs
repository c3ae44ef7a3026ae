//! SQLite backend

use std::path::Path;
use log::debug;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params_from_iter, Connection, OptionalExtension};

use dbscenario_core::{ColumnMetadata, ColumnName, DataValue, QualifiedTable, TableMetadata};

use crate::error::{to_conversion_error, DatabaseError};
use super::{Database, Dialect};

/// SQLite database
pub struct SqliteDatabase {
    conn: Connection,
}

impl SqliteDatabase {
    /// Open a database file, enabling foreign key enforcement
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self::from_connection(conn))
    }

    /// Open a private in-memory database, enabling foreign key enforcement
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self::from_connection(conn))
    }

    /// Wrap an existing connection as is
    pub fn from_connection(conn: Connection) -> Self {
        SqliteDatabase { conn }
    }

    /// Underlying connection
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Run several statements, e.g. a schema script
    pub fn execute_batch(&mut self, sql: &str) -> Result<(), DatabaseError> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    fn has_sequence_table(&self, table: &QualifiedTable) -> Result<bool, DatabaseError> {
        let sql = format!(
            "SELECT 1 FROM {}sqlite_master WHERE type = 'table' AND name = 'sqlite_sequence'",
            schema_prefix(table)
        );
        let found = self
            .conn
            .query_row(&sql, [], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }
}

fn schema_prefix(table: &QualifiedTable) -> String {
    match &table.schema {
        Some(schema) => format!("{}.", Dialect::Sqlite.quote_identifier(schema.as_str())),
        None => String::new(),
    }
}

fn to_sqlite(value: &DataValue) -> Value {
    match value {
        DataValue::Null => Value::Null,
        DataValue::Text(text) => Value::Text(text.clone()),
        DataValue::Binary(bytes) => Value::Blob(bytes.clone()),
    }
}

fn from_sqlite(value: ValueRef<'_>) -> DataValue {
    match value {
        ValueRef::Null => DataValue::Null,
        ValueRef::Integer(v) => DataValue::Text(v.to_string()),
        ValueRef::Real(v) => DataValue::Text(v.to_string()),
        ValueRef::Text(v) => DataValue::Text(String::from_utf8_lossy(v).into_owned()),
        ValueRef::Blob(v) => DataValue::Binary(v.to_vec()),
    }
}

impl Database for SqliteDatabase {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn table_metadata(
        &mut self,
        table: &QualifiedTable,
    ) -> Result<Option<TableMetadata>, DatabaseError> {
        let sql = format!(
            "PRAGMA {}table_info({})",
            schema_prefix(table),
            Dialect::Sqlite.quote_identifier(table.table.as_str())
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(5)?,
            ))
        })?;

        let mut columns = Vec::new();
        for row in rows {
            let (name, declared, not_null, key_position) = row?;
            let name = ColumnName::new(&name).map_err(to_conversion_error)?;
            let mut column = ColumnMetadata::new(name, declared.unwrap_or_default());
            if key_position > 0 {
                column = column.with_primary_key(key_position as u32);
            }
            columns.push(column.with_nullable(not_null == 0 && key_position == 0));
        }

        if columns.is_empty() {
            debug!("Table {} not found", table);
            return Ok(None);
        }
        Ok(Some(TableMetadata::new(table.clone(), columns)))
    }

    fn execute(&mut self, sql: &str, params: &[DataValue]) -> Result<u64, DatabaseError> {
        let affected = self
            .conn
            .execute(sql, params_from_iter(params.iter().map(to_sqlite)))?;
        Ok(affected as u64)
    }

    fn query(&mut self, sql: &str, params: &[DataValue]) -> Result<Vec<Vec<DataValue>>, DatabaseError> {
        let mut stmt = self.conn.prepare(sql)?;
        let width = stmt.column_count();
        let mut rows = stmt.query(params_from_iter(params.iter().map(to_sqlite)))?;

        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(width);
            for index in 0..width {
                values.push(from_sqlite(row.get_ref(index)?));
            }
            result.push(values);
        }
        Ok(result)
    }

    fn truncate(&mut self, tables: &[QualifiedTable]) -> Result<(), DatabaseError> {
        for table in tables {
            let quoted = Dialect::Sqlite.quote_table(table);
            self.conn.execute(&format!("DELETE FROM {}", quoted), [])?;
            if self.has_sequence_table(table)? {
                let sql = format!("DELETE FROM {}sqlite_sequence WHERE name = ?1", schema_prefix(table));
                self.conn.execute(&sql, [table.table.as_str()])?;
            }
            debug!("Truncated {}", table);
        }
        Ok(())
    }
}
