//! Operation executor
//!
//! Applies one [`Operation`] with a data set to a database. Tables are written
//! in data set order and cleared in reverse order. The first failure aborts the
//! operation; nothing is rolled back, so callers wanting atomicity wrap the call
//! in their own transaction.

use std::collections::HashMap;
use log::{debug, info, warn};
use serde::Serialize;

use dbscenario_core::{ColumnName, DataSet, DataValue, Operation, QualifiedTable, Row, Table, TableMetadata};

use crate::database::Database;
use crate::error::{ExecutionError, ExecutionFailure};
use crate::statements;

/// Rows affected per table by one operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionSummary {
    /// Operation that was applied
    pub operation: Operation,

    /// Affected rows per table, in the order the tables were processed
    pub affected: Vec<(QualifiedTable, u64)>,
}

impl ExecutionSummary {
    fn new(operation: Operation) -> Self {
        ExecutionSummary {
            operation,
            affected: Vec::new(),
        }
    }

    fn record(&mut self, table: &QualifiedTable, rows: u64) {
        match self.affected.iter_mut().find(|(t, _)| t == table) {
            Some((_, count)) => *count += rows,
            None => self.affected.push((table.clone(), rows)),
        }
    }

    /// Total affected rows
    pub fn total(&self) -> u64 {
        self.affected.iter().map(|(_, rows)| rows).sum()
    }

    /// Affected rows of one table
    pub fn affected_rows(&self, table: &QualifiedTable) -> Option<u64> {
        self.affected
            .iter()
            .find(|(t, _)| t == table)
            .map(|(_, rows)| *rows)
    }
}

/// Applies operations through a [`Database`]
pub struct OperationExecutor<'a> {
    db: &'a mut dyn Database,
    metadata: HashMap<QualifiedTable, TableMetadata>,
}

impl<'a> OperationExecutor<'a> {
    /// Create an executor writing to `db`
    pub fn new(db: &'a mut dyn Database) -> Self {
        OperationExecutor {
            db,
            metadata: HashMap::new(),
        }
    }

    /// Apply `operation` with the rows of `data_set`
    pub fn execute(
        &mut self,
        operation: Operation,
        data_set: &DataSet,
    ) -> Result<ExecutionSummary, ExecutionError> {
        let mut summary = ExecutionSummary::new(operation);
        match operation {
            Operation::None => {}
            Operation::CleanInsert => {
                self.delete_all(operation, data_set, &mut summary)?;
                self.insert_all(operation, data_set, &mut summary)?;
            }
            Operation::Insert => self.insert_all(operation, data_set, &mut summary)?,
            Operation::Update => self.update_all(operation, data_set, &mut summary)?,
            Operation::Refresh => self.refresh_all(operation, data_set, &mut summary)?,
            Operation::Delete => self.delete_rows(operation, data_set, &mut summary)?,
            Operation::DeleteAll => self.delete_all(operation, data_set, &mut summary)?,
            Operation::TruncateTable => self.truncate(operation, data_set)?,
            Operation::TruncateInsert => {
                self.truncate(operation, data_set)?;
                self.insert_all(operation, data_set, &mut summary)?;
            }
        }

        info!(
            "{} on {} tables affected {} rows",
            operation,
            data_set.len(),
            summary.total()
        );
        Ok(summary)
    }

    fn metadata(&mut self, operation: Operation, table: &QualifiedTable) -> Result<TableMetadata, ExecutionError> {
        if let Some(metadata) = self.metadata.get(table) {
            return Ok(metadata.clone());
        }
        let metadata = self
            .db
            .table_metadata(table)
            .map_err(|e| ExecutionError::on(operation, table, e))?
            .ok_or_else(|| ExecutionError::on(operation, table, ExecutionFailure::TableNotFound))?;
        self.metadata.insert(table.clone(), metadata.clone());
        Ok(metadata)
    }

    /// Primary key of a table the data set must fully provide
    fn key(
        &mut self,
        operation: Operation,
        table: &Table,
    ) -> Result<(TableMetadata, Vec<ColumnName>), ExecutionError> {
        let qualified = table.qualified();
        let metadata = self.metadata(operation, &qualified)?;
        let key = metadata.primary_key_names();
        if key.is_empty() {
            return Err(ExecutionError::on(operation, &qualified, ExecutionFailure::NoPrimaryKey));
        }
        if let Some(column) = key.iter().find(|k| !table.has_column(k)) {
            return Err(ExecutionError::on(
                operation,
                &qualified,
                ExecutionFailure::MissingKeyColumn {
                    column: column.clone(),
                },
            ));
        }
        Ok((metadata, key))
    }

    fn run(
        &mut self,
        operation: Operation,
        table: &QualifiedTable,
        statement: statements::Statement,
    ) -> Result<u64, ExecutionError> {
        self.db
            .execute(&statement.sql, &statement.params)
            .map_err(|e| ExecutionError::on(operation, table, e))
    }

    fn exists(
        &mut self,
        operation: Operation,
        metadata: &TableMetadata,
        row: &Row,
        key: &[ColumnName],
    ) -> Result<bool, ExecutionError> {
        let statement = statements::count_by_key(self.db.dialect(), metadata, row, key);
        let rows = self
            .db
            .query(&statement.sql, &statement.params)
            .map_err(|e| ExecutionError::on(operation, &metadata.table, e))?;
        let count = rows
            .first()
            .and_then(|row| row.first())
            .and_then(DataValue::as_text)
            .and_then(|count| count.parse::<u64>().ok())
            .unwrap_or(0);
        Ok(count > 0)
    }

    fn insert_all(
        &mut self,
        operation: Operation,
        data_set: &DataSet,
        summary: &mut ExecutionSummary,
    ) -> Result<(), ExecutionError> {
        for table in data_set.insertion_order() {
            let qualified = table.qualified();
            let metadata = self.metadata(operation, &qualified)?;
            for row in table.rows() {
                let statement = statements::insert(self.db.dialect(), &metadata, row);
                let affected = self.run(operation, &qualified, statement)?;
                summary.record(&qualified, affected);
            }
            debug!("Inserted {} rows into {}", table.row_count(), qualified);
        }
        Ok(())
    }

    fn update_all(
        &mut self,
        operation: Operation,
        data_set: &DataSet,
        summary: &mut ExecutionSummary,
    ) -> Result<(), ExecutionError> {
        for table in data_set.insertion_order() {
            let qualified = table.qualified();
            let (metadata, key) = self.key(operation, table)?;
            for row in table.rows() {
                let affected = match statements::update(self.db.dialect(), &metadata, row, &key) {
                    Some(statement) => self.run(operation, &qualified, statement)?,
                    None => u64::from(self.exists(operation, &metadata, row, &key)?),
                };
                if affected == 0 {
                    return Err(ExecutionError::on(
                        operation,
                        &qualified,
                        ExecutionFailure::RowNotFound {
                            row: render_key(row, &key),
                        },
                    ));
                }
                summary.record(&qualified, affected);
            }
        }
        Ok(())
    }

    fn refresh_all(
        &mut self,
        operation: Operation,
        data_set: &DataSet,
        summary: &mut ExecutionSummary,
    ) -> Result<(), ExecutionError> {
        for table in data_set.insertion_order() {
            let qualified = table.qualified();
            let (metadata, key) = self.key(operation, table)?;
            for row in table.rows() {
                let present = match statements::update(self.db.dialect(), &metadata, row, &key) {
                    Some(statement) => {
                        let affected = self.run(operation, &qualified, statement)?;
                        summary.record(&qualified, affected);
                        affected > 0
                    }
                    None => self.exists(operation, &metadata, row, &key)?,
                };
                if !present {
                    let statement = statements::insert(self.db.dialect(), &metadata, row);
                    let affected = self.run(operation, &qualified, statement)?;
                    summary.record(&qualified, affected);
                }
            }
        }
        Ok(())
    }

    fn delete_rows(
        &mut self,
        operation: Operation,
        data_set: &DataSet,
        summary: &mut ExecutionSummary,
    ) -> Result<(), ExecutionError> {
        for table in data_set.deletion_order() {
            let qualified = table.qualified();
            let (metadata, key) = self.key(operation, table)?;
            for row in table.rows() {
                let statement = statements::delete_by_key(self.db.dialect(), &metadata, row, &key);
                let affected = self.run(operation, &qualified, statement)?;
                if affected == 0 {
                    warn!("DELETE found no row in {} matching {}", qualified, render_key(row, &key));
                }
                summary.record(&qualified, affected);
            }
        }
        Ok(())
    }

    fn delete_all(
        &mut self,
        operation: Operation,
        data_set: &DataSet,
        summary: &mut ExecutionSummary,
    ) -> Result<(), ExecutionError> {
        for table in data_set.deletion_order() {
            let qualified = table.qualified();
            self.metadata(operation, &qualified)?;
            let statement = statements::delete_all(self.db.dialect(), &qualified);
            let affected = self.run(operation, &qualified, statement)?;
            summary.record(&qualified, affected);
            debug!("Deleted {} rows from {}", affected, qualified);
        }
        Ok(())
    }

    fn truncate(&mut self, operation: Operation, data_set: &DataSet) -> Result<(), ExecutionError> {
        let mut tables = Vec::with_capacity(data_set.len());
        for table in data_set.deletion_order() {
            let qualified = table.qualified();
            self.metadata(operation, &qualified)?;
            tables.push(qualified);
        }
        self.db.truncate(&tables).map_err(|e| ExecutionError {
            operation,
            table: None,
            failure: e.into(),
        })
    }
}

fn render_key(row: &Row, key: &[ColumnName]) -> String {
    key.iter()
        .map(|column| {
            let value = row.get(column).cloned().unwrap_or_default();
            format!("{}={}", column, value)
        })
        .collect::<Vec<_>>()
        .join(", ")
}
