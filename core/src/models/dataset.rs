//! Data sets
//!
//! A data set is the ordered collection of tables one fixture phase works on.

use std::collections::HashSet;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use super::names::{DataSourceName, TableName};
use super::table::Table;

/// Ordered collection of tables, optionally bound to a data source
///
/// Table order is the order rows are written in; operations that clear data walk
/// the tables in exact reverse. A data set is never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "DataSetRecord")]
pub struct DataSet {
    tables: Vec<Table>,
    data_source: Option<DataSourceName>,
}

#[derive(Deserialize)]
struct DataSetRecord {
    tables: Vec<Table>,
    #[serde(default)]
    data_source: Option<DataSourceName>,
}

impl TryFrom<DataSetRecord> for DataSet {
    type Error = CoreError;

    fn try_from(record: DataSetRecord) -> Result<Self> {
        Ok(DataSet::new(record.tables)?.with_data_source(record.data_source))
    }
}

impl DataSet {
    /// Create a data set, rejecting duplicate table names
    pub fn new(tables: Vec<Table>) -> Result<Self> {
        let mut seen = HashSet::new();
        for table in &tables {
            if !seen.insert(table.qualified()) {
                return Err(CoreError::InvalidDataSet(format!(
                    "table {} appears more than once",
                    table.qualified()
                )));
            }
        }
        Ok(DataSet {
            tables,
            data_source: None,
        })
    }

    /// Bind the data set to a data source
    pub fn with_data_source(mut self, data_source: Option<DataSourceName>) -> Self {
        self.data_source = data_source;
        self
    }

    /// Data source the data set is bound to
    pub fn data_source(&self) -> Option<&DataSourceName> {
        self.data_source.as_ref()
    }

    /// Tables in insertion order
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Get a table by its unqualified name
    pub fn table(&self, name: &TableName) -> Option<&Table> {
        self.tables.iter().find(|t| t.name() == name)
    }

    /// Table names in insertion order
    pub fn table_names(&self) -> Vec<&TableName> {
        self.tables.iter().map(|t| t.name()).collect()
    }

    /// Tables in insertion order (parents before children)
    pub fn insertion_order(&self) -> impl DoubleEndedIterator<Item = &Table> {
        self.tables.iter()
    }

    /// Tables in deletion order (children before parents)
    pub fn deletion_order(&self) -> impl DoubleEndedIterator<Item = &Table> {
        self.tables.iter().rev()
    }

    /// Number of tables
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether the data set has no tables
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Total number of rows across all tables
    pub fn row_count(&self) -> usize {
        self.tables.iter().map(Table::row_count).sum()
    }
}
