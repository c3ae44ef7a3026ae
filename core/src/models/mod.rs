//! Data models for fixtures
//!
//! This module provides the identifiers, cell values, rows, tables and data sets
//! fixture phases work with, plus the write operation enumeration.

mod names;
mod row;
mod table;
mod dataset;
mod operation;

pub use names::{
    ColumnName, DataSourceName, QualifiedTable, ScenarioMarker, ScenarioName, SchemaName,
    TableName, DEFAULT_SCENARIO_MARKER,
};
pub use row::{DataValue, Row};
pub use table::{ColumnMetadata, ColumnType, Table, TableMetadata};
pub use dataset::DataSet;
pub use operation::Operation;
