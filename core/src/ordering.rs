//! Table ordering
//!
//! Tables are written parents first and cleared children first. The order comes
//! from an optional ordering file in the fixture directory, one table name per
//! line; tables the file does not mention follow alphabetically.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::Path;
use log::debug;

use crate::error::LoadError;
use crate::models::TableName;

/// Default name of the ordering file
pub const DEFAULT_ORDERING_FILE: &str = "table-ordering.txt";

/// Resolved insertion order of a fixture directory's tables
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableOrder {
    tables: Vec<TableName>,
}

impl TableOrder {
    /// Wrap an insertion order
    pub fn new(tables: Vec<TableName>) -> Self {
        TableOrder { tables }
    }

    /// Tables in insertion order
    pub fn insertion(&self) -> &[TableName] {
        &self.tables
    }

    /// Tables in deletion order, the exact reverse of insertion order
    pub fn deletion(&self) -> Vec<TableName> {
        self.tables.iter().rev().cloned().collect()
    }

    /// Order with insertion and deletion swapped
    pub fn reverse(&self) -> TableOrder {
        TableOrder::new(self.deletion())
    }

    /// Position of a table in insertion order
    pub fn position(&self, table: &TableName) -> Option<usize> {
        self.tables.iter().position(|t| t == table)
    }

    /// Number of tables
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether no tables are ordered
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Resolves table order for a fixture directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableOrdering {
    file_name: String,
}

impl Default for TableOrdering {
    fn default() -> Self {
        TableOrdering {
            file_name: DEFAULT_ORDERING_FILE.to_string(),
        }
    }
}

impl TableOrdering {
    /// Use `file_name` as the ordering file
    pub fn new(file_name: impl Into<String>) -> Self {
        TableOrdering {
            file_name: file_name.into(),
        }
    }

    /// Name of the ordering file
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Order the tables available in `dir`.
    ///
    /// A missing ordering file is not an error; it only means alphabetical order.
    pub fn resolve(&self, dir: &Path, available: &[TableName]) -> Result<TableOrder, LoadError> {
        let path = dir.join(&self.file_name);
        let explicit = match fs::read_to_string(&path) {
            Ok(content) => Some(parse_ordering(&content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(LoadError::io(path, e)),
        };

        let order = match explicit {
            Some(listed) => {
                debug!("Using table ordering from {}", path.display());
                order_tables(&listed, available)
            }
            None => order_tables(&[], available),
        };
        Ok(order)
    }
}

/// Parse ordering file content: trimmed names, blank lines skipped
pub fn parse_ordering(content: &str) -> Vec<TableName> {
    let mut names: Vec<TableName> = Vec::new();
    for line in content.lines() {
        let Ok(name) = TableName::new(line) else {
            continue;
        };
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// Listed tables first in listed order, the rest alphabetically
pub fn order_tables(listed: &[TableName], available: &[TableName]) -> TableOrder {
    let mut remaining: BTreeSet<&TableName> = available.iter().collect();
    let mut tables = Vec::with_capacity(available.len());

    for name in listed {
        if remaining.remove(name) {
            tables.push(name.clone());
        } else if !tables.contains(name) {
            debug!("Ordering file lists table {} which has no fixture file", name);
        }
    }
    tables.extend(remaining.into_iter().cloned());

    TableOrder::new(tables)
}
