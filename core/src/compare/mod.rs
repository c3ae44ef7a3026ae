//! Data set comparison
//!
//! Compares expected tables against actual tables cell by cell. Only the columns
//! an expected table lists are compared, minus the ignored ones. Rows are
//! matched by primary key when the key is known and compared, otherwise by
//! position.

mod handler;
mod normalize;

pub use handler::{
    AssertionError, CollectingHandler, ComparisonResult, FailFast, FailureHandler, Mismatch,
    MismatchKind,
};
pub use normalize::{canonical_number, normalize, values_match, Normalized};

use std::collections::BTreeSet;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{to_identifier_error, Result};
use crate::models::{ColumnName, ColumnType, DataSet, DataValue, Row, Table, TableMetadata, TableName};

/// Columns excluded from comparison
///
/// An entry is either `COLUMN`, ignored in every table, or `TABLE.COLUMN`.
/// A schema in front of the table (`SCHEMA.TABLE.COLUMN`) is accepted and not
/// matched on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreColumns {
    everywhere: BTreeSet<ColumnName>,
    per_table: BTreeSet<(TableName, ColumnName)>,
}

impl IgnoreColumns {
    /// Nothing ignored
    pub fn none() -> Self {
        Self::default()
    }

    /// Parse ignore entries
    pub fn parse<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ignore = Self::default();
        for entry in entries {
            ignore.add(entry.as_ref())?;
        }
        Ok(ignore)
    }

    /// Add one entry
    pub fn add(&mut self, entry: &str) -> Result<()> {
        match entry.trim().rsplit_once('.') {
            Some((table, column)) => {
                let table = table.rsplit('.').next().unwrap_or(table);
                let table = TableName::new(table)
                    .map_err(|_| to_identifier_error(format!("ignore entry '{}'", entry)))?;
                let column = ColumnName::new(column)
                    .map_err(|_| to_identifier_error(format!("ignore entry '{}'", entry)))?;
                self.per_table.insert((table, column));
            }
            None => {
                self.everywhere.insert(ColumnName::new(entry)?);
            }
        }
        Ok(())
    }

    /// Combine with another set of entries
    pub fn merge(mut self, other: &IgnoreColumns) -> Self {
        self.everywhere.extend(other.everywhere.iter().cloned());
        self.per_table.extend(other.per_table.iter().cloned());
        self
    }

    /// Whether `column` of `table` is ignored
    pub fn is_ignored(&self, table: &TableName, column: &ColumnName) -> bool {
        self.everywhere.contains(column)
            || self
                .per_table
                .iter()
                .any(|(t, c)| t == table && c == column)
    }

    /// Whether no entries are present
    pub fn is_empty(&self) -> bool {
        self.everywhere.is_empty() && self.per_table.is_empty()
    }
}

/// Compares expected data against actual data
#[derive(Debug, Clone, Default)]
pub struct ComparisonEngine {
    ignore: IgnoreColumns,
}

impl ComparisonEngine {
    /// Create an engine ignoring the given columns
    pub fn new(ignore: IgnoreColumns) -> Self {
        ComparisonEngine { ignore }
    }

    /// Ignored columns
    pub fn ignore(&self) -> &IgnoreColumns {
        &self.ignore
    }

    /// Columns of `expected` that take part in the comparison
    pub fn compared_columns(&self, expected: &Table) -> Vec<ColumnName> {
        expected
            .columns()
            .iter()
            .filter(|column| !self.ignore.is_ignored(expected.name(), column))
            .cloned()
            .collect()
    }

    /// Compare two data sets table by table.
    ///
    /// Tables present only in `actual` are not reported.
    pub fn compare_datasets(
        &self,
        expected: &DataSet,
        actual: &DataSet,
        handler: &mut dyn FailureHandler,
    ) -> std::result::Result<(), AssertionError> {
        for table in expected.tables() {
            match actual.table(table.name()) {
                Some(actual_table) => self.compare_tables(table, actual_table, None, handler)?,
                None => handler.on_mismatch(Mismatch::missing_table(table.qualified()))?,
            }
        }
        Ok(())
    }

    /// Compare one expected table with its actual counterpart.
    ///
    /// `metadata` supplies column types and the primary key; without it every
    /// column compares as text and rows are matched by position.
    pub fn compare_tables(
        &self,
        expected: &Table,
        actual: &Table,
        metadata: Option<&TableMetadata>,
        handler: &mut dyn FailureHandler,
    ) -> std::result::Result<(), AssertionError> {
        let qualified = expected.qualified();

        let mut columns = Vec::new();
        for column in self.compared_columns(expected) {
            if actual.has_column(&column) {
                columns.push(column);
            } else {
                handler.on_mismatch(Mismatch::missing_column(qualified.clone(), column))?;
            }
        }
        let typed: Vec<(ColumnName, ColumnType)> = columns
            .into_iter()
            .map(|column| {
                let column_type = metadata
                    .map(|m| m.column_type(&column))
                    .unwrap_or(ColumnType::Unknown);
                (column, column_type)
            })
            .collect();

        if expected.row_count() != actual.row_count() {
            handler.on_mismatch(Mismatch::row_count(
                qualified.clone(),
                expected.row_count(),
                actual.row_count(),
            ))?;
        }

        let key = metadata
            .map(|m| m.primary_key_names())
            .filter(|key| !key.is_empty())
            .filter(|key| key.iter().all(|k| typed.iter().any(|(c, _)| c == k)));

        match key {
            Some(key) => {
                debug!("Comparing table {} by primary key {:?}", qualified, key);
                let key_types: Vec<(ColumnName, ColumnType)> = typed
                    .iter()
                    .filter(|(c, _)| key.contains(c))
                    .cloned()
                    .collect();
                for (index, row) in expected.rows().iter().enumerate() {
                    let found = actual
                        .rows()
                        .iter()
                        .find(|candidate| rows_match(row, candidate, &key_types));
                    match found {
                        Some(actual_row) => {
                            compare_row(&qualified, index, row, actual_row, &typed, handler)?
                        }
                        None => handler.on_mismatch(Mismatch::missing_row(
                            qualified.clone(),
                            index,
                            render_key(row, &key_types),
                        ))?,
                    }
                }
            }
            None => {
                debug!("Comparing table {} by position", qualified);
                for (index, (row, actual_row)) in
                    expected.rows().iter().zip(actual.rows()).enumerate()
                {
                    compare_row(&qualified, index, row, actual_row, &typed, handler)?;
                }
            }
        }
        Ok(())
    }
}

fn cell<'a>(row: &'a Row, column: &ColumnName) -> &'a DataValue {
    const NULL: &DataValue = &DataValue::Null;
    row.get(column).unwrap_or(NULL)
}

fn rows_match(expected: &Row, actual: &Row, columns: &[(ColumnName, ColumnType)]) -> bool {
    columns.iter().all(|(column, column_type)| {
        values_match(cell(expected, column), cell(actual, column), *column_type)
    })
}

fn render_key(row: &Row, key: &[(ColumnName, ColumnType)]) -> String {
    key.iter()
        .map(|(column, _)| format!("{}={}", column, cell(row, column)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn compare_row(
    table: &crate::models::QualifiedTable,
    index: usize,
    expected: &Row,
    actual: &Row,
    columns: &[(ColumnName, ColumnType)],
    handler: &mut dyn FailureHandler,
) -> std::result::Result<(), AssertionError> {
    for (column, column_type) in columns {
        let expected_value = cell(expected, column);
        let actual_value = cell(actual, column);
        if !values_match(expected_value, actual_value, *column_type) {
            handler.on_mismatch(Mismatch::value(
                table.clone(),
                index,
                column.clone(),
                expected_value.clone(),
                actual_value.clone(),
            ))?;
        }
    }
    Ok(())
}
