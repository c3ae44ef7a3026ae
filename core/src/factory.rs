//! Data set factory
//!
//! Turns a fixture directory into an ordered [`DataSet`]: every loadable file
//! becomes one table named after its file stem, rows are filtered by scenario,
//! binary cells are decoded and the tables are ordered for insertion.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use log::{debug, info};

use crate::error::LoadError;
use crate::models::{
    ColumnName, DataSet, DataValue, Row, ScenarioMarker, ScenarioName, SchemaName, Table,
    TableName,
};
use crate::ordering::TableOrdering;
use crate::reader::{RawTable, ReaderRegistry};
use crate::scenario::ScenarioFilter;

/// Default prefix marking base64-encoded binary cells
pub const DEFAULT_BINARY_PREFIX: &str = "base64:";

/// Builds data sets from fixture directories
#[derive(Debug, Clone)]
pub struct DataSetFactory {
    readers: ReaderRegistry,
    marker: ScenarioMarker,
    ordering: TableOrdering,
    binary_prefix: String,
}

impl Default for DataSetFactory {
    fn default() -> Self {
        DataSetFactory::new(ReaderRegistry::with_defaults())
    }
}

impl DataSetFactory {
    /// Create a factory with the given readers and default settings
    pub fn new(readers: ReaderRegistry) -> Self {
        DataSetFactory {
            readers,
            marker: ScenarioMarker::default(),
            ordering: TableOrdering::default(),
            binary_prefix: DEFAULT_BINARY_PREFIX.to_string(),
        }
    }

    /// Use a different scenario marker column
    pub fn with_marker(mut self, marker: ScenarioMarker) -> Self {
        self.marker = marker;
        self
    }

    /// Use a different ordering file resolver
    pub fn with_ordering(mut self, ordering: TableOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    /// Use a different binary prefix; an empty prefix disables decoding
    pub fn with_binary_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.binary_prefix = prefix.into();
        self
    }

    /// Registered readers
    pub fn readers(&self) -> &ReaderRegistry {
        &self.readers
    }

    /// Scenario marker column header
    pub fn marker(&self) -> &ScenarioMarker {
        &self.marker
    }

    /// Table ordering resolver
    pub fn ordering(&self) -> &TableOrdering {
        &self.ordering
    }

    /// Loadable files in `dir`, sorted by file name
    pub fn loadable_files(&self, dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
        let entries = fs::read_dir(dir).map_err(|e| LoadError::io(dir, e))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| LoadError::io(dir, e))?;
            let path = entry.path();
            if path.is_file() && self.readers.is_loadable(&path) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Load the fixture directory `dir` for the requested scenarios.
    ///
    /// Tables are qualified with `schema` when one is given.
    pub fn load(
        &self,
        dir: &Path,
        scenarios: &[ScenarioName],
        schema: Option<&SchemaName>,
    ) -> Result<DataSet, LoadError> {
        let filter = ScenarioFilter::new(self.marker.clone(), scenarios.to_vec()).map_err(|e| {
            LoadError::InvalidData {
                path: dir.to_path_buf(),
                reason: e.to_string(),
            }
        })?;

        let files = self.loadable_files(dir)?;
        if files.is_empty() {
            return Err(LoadError::NoLoadableFiles {
                path: dir.to_path_buf(),
            });
        }

        let mut tables: HashMap<TableName, Table> = HashMap::with_capacity(files.len());
        for path in &files {
            let table = self.load_file(path, &filter)?.with_schema(schema.cloned());
            let name = table.name().clone();
            if tables.contains_key(&name) {
                return Err(LoadError::DuplicateTable {
                    path: dir.to_path_buf(),
                    table: name.to_string(),
                });
            }
            tables.insert(name, table);
        }

        let available: Vec<TableName> = tables.keys().cloned().collect();
        let order = self.ordering.resolve(dir, &available)?;

        let ordered: Vec<Table> = order
            .insertion()
            .iter()
            .filter_map(|name| tables.remove(name))
            .collect();

        let data_set = DataSet::new(ordered).map_err(|e| LoadError::InvalidData {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        })?;

        info!(
            "Loaded {} tables with {} rows from {}",
            data_set.len(),
            data_set.row_count(),
            dir.display()
        );
        Ok(data_set)
    }

    /// Read, filter and convert one file
    fn load_file(&self, path: &Path, filter: &ScenarioFilter) -> Result<Table, LoadError> {
        let name = table_name(path)?;
        let reader = self
            .readers
            .reader_for(path)
            .ok_or_else(|| LoadError::InvalidData {
                path: path.to_path_buf(),
                reason: "no reader registered for this file".to_string(),
            })?;

        let raw = reader.read(path).map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let table = self.build_table(path, name, filter.filter(raw))?;

        debug!(
            "Loaded table {} with {} rows from {}",
            table.name(),
            table.row_count(),
            path.display()
        );
        Ok(table)
    }

    fn build_table(&self, path: &Path, name: TableName, raw: RawTable) -> Result<Table, LoadError> {
        let invalid = |reason: String| LoadError::InvalidData {
            path: path.to_path_buf(),
            reason,
        };

        let columns = raw
            .columns
            .iter()
            .map(ColumnName::new)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| invalid(e.to_string()))?;

        let mut rows = Vec::with_capacity(raw.rows.len());
        for (index, values) in raw.rows.into_iter().enumerate() {
            let mut cells = Vec::with_capacity(columns.len());
            for (column, value) in columns.iter().zip(values) {
                let value = self.decode(value).map_err(|reason| {
                    invalid(format!("row {} column {}: {}", index + 1, column, reason))
                })?;
                cells.push((column.clone(), value));
            }
            rows.push(Row::new(cells));
        }

        Table::new(name, columns, rows).map_err(|e| invalid(e.to_string()))
    }

    fn decode(&self, value: DataValue) -> Result<DataValue, String> {
        if self.binary_prefix.is_empty() {
            Ok(value)
        } else {
            value.decode_binary(&self.binary_prefix)
        }
    }
}

/// Table name derived from a file stem
fn table_name(path: &Path) -> Result<TableName, LoadError> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    TableName::new(stem).map_err(|e| LoadError::InvalidData {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
