//! Database side of dbscenario
//!
//! This crate writes data sets to live databases and reads them back for
//! comparison. Backends sit behind the [`Database`] trait; SQLite and
//! PostgreSQL are provided.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod assertion;
pub mod database;
pub mod error;
pub mod executor;
pub mod fixture;
pub mod registry;
pub mod snapshot;
pub mod statements;

pub use assertion::DatabaseAssertion;
pub use database::{Database, Dialect, PostgresDatabase, SqliteDatabase};
pub use error::{ClientError, DatabaseError, ExecutionError, ExecutionFailure, Result};
pub use executor::{ExecutionSummary, OperationExecutor};
pub use fixture::Fixture;
pub use registry::{DataSourceRegistry, SharedDatabase};
pub use snapshot::{snapshot, snapshot_table};
