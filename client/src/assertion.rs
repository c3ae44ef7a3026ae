//! Assertions of expected data against a live database

use log::{debug, info};

use dbscenario_core::{
    CollectingHandler, ComparisonEngine, ComparisonResult, DataSet, FailureHandler, IgnoreColumns,
    Mismatch, Table,
};

use crate::database::Database;
use crate::error::Result;
use crate::snapshot::snapshot_table;

/// Compares expected tables with what the database holds
#[derive(Debug, Clone, Default)]
pub struct DatabaseAssertion {
    engine: ComparisonEngine,
}

impl DatabaseAssertion {
    /// Create an assertion ignoring the given columns
    pub fn new(ignore: IgnoreColumns) -> Self {
        DatabaseAssertion {
            engine: ComparisonEngine::new(ignore),
        }
    }

    /// Comparison engine in use
    pub fn engine(&self) -> &ComparisonEngine {
        &self.engine
    }

    /// Compare every table of `expected` with the database.
    ///
    /// Mismatches go to `handler`; an `Err(ClientError::Assertion)` is returned
    /// as soon as the handler gives up.
    pub fn assert_dataset(
        &self,
        db: &mut dyn Database,
        expected: &DataSet,
        handler: &mut dyn FailureHandler,
    ) -> Result<()> {
        for table in expected.tables() {
            self.assert_table(db, table, handler)?;
        }
        info!("Compared {} expected tables", expected.len());
        Ok(())
    }

    /// Compare one expected table with the database
    pub fn assert_table(
        &self,
        db: &mut dyn Database,
        expected: &Table,
        handler: &mut dyn FailureHandler,
    ) -> Result<()> {
        let qualified = expected.qualified();
        let Some(metadata) = db.table_metadata(&qualified)? else {
            handler.on_mismatch(Mismatch::missing_table(qualified))?;
            return Ok(());
        };

        let actual = snapshot_table(db, &metadata)?;
        debug!(
            "Comparing {} expected rows with {} actual rows in {}",
            expected.row_count(),
            actual.row_count(),
            qualified
        );
        self.engine
            .compare_tables(expected, &actual, Some(&metadata), handler)?;
        Ok(())
    }

    /// Compare every table and collect all mismatches
    pub fn collect(&self, db: &mut dyn Database, expected: &DataSet) -> Result<ComparisonResult> {
        let mut handler = CollectingHandler::new();
        self.assert_dataset(db, expected, &mut handler)?;
        Ok(handler.finish())
    }
}
