//! # Database Scenario Core
//!
//! Core data structures and algorithms for scenario-aware database fixtures.
//! This crate turns fixture directories into ordered data sets, selects the
//! rows of the requested scenarios and compares expected data with actual data.
//! It never talks to a database; that lives in the client crate.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod compare;
pub mod config;
pub mod error;
pub mod factory;
pub mod models;
pub mod ordering;
pub mod reader;
pub mod request;
pub mod resolver;
pub mod scenario;

/// Re-export common types for ease of use
pub use compare::{
    AssertionError, CollectingHandler, ComparisonEngine, ComparisonResult, FailFast,
    FailureHandler, IgnoreColumns, Mismatch, MismatchKind,
};
pub use config::FixtureConfig;
pub use error::{CoreError, LoadError, Result};
pub use factory::DataSetFactory;
pub use models::{
    ColumnMetadata, ColumnName, ColumnType, DataSet, DataSourceName, DataValue, Operation,
    QualifiedTable, Row, ScenarioMarker, ScenarioName, SchemaName, Table, TableMetadata,
    TableName,
};
pub use ordering::{TableOrder, TableOrdering};
pub use reader::{RawTable, ReaderRegistry, TableReader};
pub use request::FixtureRequest;
pub use resolver::{ConventionPath, DirectoryResolver, TestIdentity};
pub use scenario::ScenarioFilter;

/// Version of the core crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
