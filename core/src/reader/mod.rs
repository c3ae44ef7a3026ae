//! Fixture file readers
//!
//! A reader turns one file into a [`RawTable`]: ordered headers plus rows of
//! cells. Readers are registered by file extension so the data set factory and
//! the scenario filter never see file formats.

mod csv;
mod json;

pub use self::csv::CsvReader;
pub use self::json::JsonReader;

use std::collections::HashMap;
use std::fmt::Debug;
use std::io;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::models::DataValue;

/// Error produced by a reader
#[derive(Error, Debug)]
pub enum ReadError {
    /// File could not be read
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// File is structurally invalid
    #[error("line {line}: {reason}")]
    Malformed {
        /// 1-based line the problem was found on
        line: usize,
        /// What was wrong
        reason: String,
    },

    /// JSON could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// JSON parsed but does not describe a table
    #[error("unexpected JSON layout: {0}")]
    Layout(String),
}

/// Table content as read from a file, before scenario filtering
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawTable {
    /// Column headers in file order
    pub columns: Vec<String>,

    /// Rows of cells; every row has one cell per column
    pub rows: Vec<Vec<DataValue>>,
}

impl RawTable {
    /// Create a raw table
    pub fn new(columns: Vec<String>, rows: Vec<Vec<DataValue>>) -> Self {
        RawTable { columns, rows }
    }

    /// Position of a column header
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// Reads one fixture file into a raw table
pub trait TableReader: Send + Sync + Debug {
    /// Read the file at `path`
    fn read(&self, path: &Path) -> Result<RawTable, ReadError>;
}

/// Readers keyed by lower-case file extension
#[derive(Debug, Clone, Default)]
pub struct ReaderRegistry {
    readers: HashMap<String, Arc<dyn TableReader>>,
}

impl ReaderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the CSV and JSON readers
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("csv", Arc::new(CsvReader::default()));
        registry.register("json", Arc::new(JsonReader));
        registry
    }

    /// Registry with the default readers, using `delimiter` for CSV
    pub fn with_csv_delimiter(delimiter: u8) -> Self {
        let mut registry = Self::with_defaults();
        registry.register("csv", Arc::new(CsvReader::new(delimiter)));
        registry
    }

    /// Register a reader for an extension, replacing any previous one
    pub fn register(&mut self, extension: &str, reader: Arc<dyn TableReader>) {
        self.readers
            .insert(extension.trim_start_matches('.').to_ascii_lowercase(), reader);
    }

    /// Reader responsible for a path, if any
    pub fn reader_for(&self, path: &Path) -> Option<&Arc<dyn TableReader>> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        self.readers.get(&extension)
    }

    /// Whether a path has a registered reader
    pub fn is_loadable(&self, path: &Path) -> bool {
        self.reader_for(path).is_some()
    }

    /// Registered extensions, sorted
    pub fn extensions(&self) -> Vec<&str> {
        let mut extensions: Vec<&str> = self.readers.keys().map(String::as_str).collect();
        extensions.sort_unstable();
        extensions
    }
}
