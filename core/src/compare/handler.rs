//! Mismatch reporting
//!
//! The comparison engine never decides whether a difference is fatal. Every
//! mismatch goes to a [`FailureHandler`], which either stops the comparison by
//! returning an error or records the mismatch and lets it continue.

use std::fmt::{Display, Formatter, Result as FmtResult};
use serde::Serialize;
use thiserror::Error;

use crate::models::{ColumnName, DataValue, QualifiedTable};

/// Kind of difference found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MismatchKind {
    /// Expected table does not exist on the actual side
    MissingTable,

    /// Expected column does not exist on the actual side
    MissingColumn,

    /// Tables hold a different number of rows
    RowCount,

    /// No actual row carries the expected row's primary key
    MissingRow,

    /// A cell differs
    Value,
}

impl Display for MismatchKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            MismatchKind::MissingTable => "missing table",
            MismatchKind::MissingColumn => "missing column",
            MismatchKind::RowCount => "row count",
            MismatchKind::MissingRow => "missing row",
            MismatchKind::Value => "value",
        };
        f.write_str(name)
    }
}

/// One difference between expected and actual data
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mismatch {
    /// Kind of difference
    pub kind: MismatchKind,

    /// Table the difference was found in
    pub table: QualifiedTable,

    /// Index of the expected row, when the difference concerns a row
    pub row: Option<usize>,

    /// Column, when the difference concerns a column or cell
    pub column: Option<ColumnName>,

    /// Expected value (or count)
    pub expected: DataValue,

    /// Actual value (or count)
    pub actual: DataValue,

    /// Human readable description
    pub message: String,
}

impl Mismatch {
    /// Expected table has no counterpart
    pub fn missing_table(table: QualifiedTable) -> Self {
        Mismatch {
            kind: MismatchKind::MissingTable,
            message: format!("table {} is missing", table),
            expected: DataValue::text(table.to_string()),
            actual: DataValue::Null,
            table,
            row: None,
            column: None,
        }
    }

    /// Expected column has no counterpart
    pub fn missing_column(table: QualifiedTable, column: ColumnName) -> Self {
        Mismatch {
            kind: MismatchKind::MissingColumn,
            message: format!("table {} has no column {}", table, column),
            expected: DataValue::text(column.as_str()),
            actual: DataValue::Null,
            table,
            row: None,
            column: Some(column),
        }
    }

    /// Row counts differ
    pub fn row_count(table: QualifiedTable, expected: usize, actual: usize) -> Self {
        Mismatch {
            kind: MismatchKind::RowCount,
            message: format!(
                "table {} expected {} rows but found {}",
                table, expected, actual
            ),
            expected: DataValue::text(expected.to_string()),
            actual: DataValue::text(actual.to_string()),
            table,
            row: None,
            column: None,
        }
    }

    /// No actual row carries the expected key
    pub fn missing_row(table: QualifiedTable, row: usize, key: String) -> Self {
        Mismatch {
            kind: MismatchKind::MissingRow,
            message: format!("table {} row {}: no row with key {}", table, row, key),
            expected: DataValue::Text(key),
            actual: DataValue::Null,
            table,
            row: Some(row),
            column: None,
        }
    }

    /// A cell differs
    pub fn value(
        table: QualifiedTable,
        row: usize,
        column: ColumnName,
        expected: DataValue,
        actual: DataValue,
    ) -> Self {
        Mismatch {
            kind: MismatchKind::Value,
            message: format!(
                "table {} row {} column {}: expected {} but was {}",
                table, row, column, expected, actual
            ),
            table,
            row: Some(row),
            column: Some(column),
            expected,
            actual,
        }
    }
}

impl Display for Mismatch {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.message)
    }
}

/// Comparison failed with one or more mismatches
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{}", render(.mismatches))]
pub struct AssertionError {
    /// Every mismatch reported before the comparison stopped
    pub mismatches: Vec<Mismatch>,
}

impl AssertionError {
    /// Create an assertion error
    pub fn new(mismatches: Vec<Mismatch>) -> Self {
        AssertionError { mismatches }
    }
}

fn render(mismatches: &[Mismatch]) -> String {
    let mut out = format!("{} mismatch(es) found", mismatches.len());
    for mismatch in mismatches {
        out.push_str("\n  - ");
        out.push_str(&mismatch.message);
    }
    out
}

/// Receives every mismatch the comparison engine finds
pub trait FailureHandler {
    /// Handle one mismatch; an error stops the comparison
    fn on_mismatch(&mut self, mismatch: Mismatch) -> Result<(), AssertionError>;
}

impl<F> FailureHandler for F
where
    F: FnMut(Mismatch) -> Result<(), AssertionError>,
{
    fn on_mismatch(&mut self, mismatch: Mismatch) -> Result<(), AssertionError> {
        self(mismatch)
    }
}

/// Stops at the first mismatch
#[derive(Debug, Clone, Copy, Default)]
pub struct FailFast;

impl FailureHandler for FailFast {
    fn on_mismatch(&mut self, mismatch: Mismatch) -> Result<(), AssertionError> {
        Err(AssertionError::new(vec![mismatch]))
    }
}

/// Outcome of a comparison that ran to completion
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComparisonResult {
    mismatches: Vec<Mismatch>,
}

impl ComparisonResult {
    /// Whether no mismatch was found
    pub fn is_success(&self) -> bool {
        self.mismatches.is_empty()
    }

    /// Mismatches in the order they were found
    pub fn mismatches(&self) -> &[Mismatch] {
        &self.mismatches
    }

    /// Record a mismatch
    pub fn push(&mut self, mismatch: Mismatch) {
        self.mismatches.push(mismatch);
    }

    /// Turn the outcome into one aggregated failure
    pub fn into_result(self) -> Result<(), AssertionError> {
        if self.mismatches.is_empty() {
            Ok(())
        } else {
            Err(AssertionError::new(self.mismatches))
        }
    }
}

/// Records every mismatch and lets the comparison continue
#[derive(Debug, Clone, Default)]
pub struct CollectingHandler {
    result: ComparisonResult,
}

impl CollectingHandler {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Mismatches collected so far
    pub fn mismatches(&self) -> &[Mismatch] {
        self.result.mismatches()
    }

    /// Finish collecting
    pub fn finish(self) -> ComparisonResult {
        self.result
    }
}

impl FailureHandler for CollectingHandler {
    fn on_mismatch(&mut self, mismatch: Mismatch) -> Result<(), AssertionError> {
        self.result.push(mismatch);
        Ok(())
    }
}
