//! Write operations
//!
//! This module provides the enumeration of write semantics a data set can be
//! applied with.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// How a data set is written to the database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    /// Delete every row of every table, then insert the data set
    CleanInsert,

    /// Insert every row; fails on existing keys
    Insert,

    /// Update rows by primary key; fails on missing keys
    Update,

    /// Update rows that exist, insert the others
    Refresh,

    /// Delete the data set's rows by primary key
    Delete,

    /// Delete every row of every table
    DeleteAll,

    /// Truncate every table, resetting identity counters
    TruncateTable,

    /// Truncate every table, then insert the data set
    TruncateInsert,

    /// Leave the database untouched
    None,
}

impl Default for Operation {
    fn default() -> Self {
        Operation::CleanInsert
    }
}

impl Operation {
    /// Every operation, in declaration order
    pub const ALL: [Operation; 9] = [
        Operation::CleanInsert,
        Operation::Insert,
        Operation::Update,
        Operation::Refresh,
        Operation::Delete,
        Operation::DeleteAll,
        Operation::TruncateTable,
        Operation::TruncateInsert,
        Operation::None,
    ];

    /// Canonical upper-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::CleanInsert => "CLEAN_INSERT",
            Operation::Insert => "INSERT",
            Operation::Update => "UPDATE",
            Operation::Refresh => "REFRESH",
            Operation::Delete => "DELETE",
            Operation::DeleteAll => "DELETE_ALL",
            Operation::TruncateTable => "TRUNCATE_TABLE",
            Operation::TruncateInsert => "TRUNCATE_INSERT",
            Operation::None => "NONE",
        }
    }

    /// Whether the operation writes to the database at all
    pub fn mutates(&self) -> bool {
        !matches!(self, Operation::None)
    }

    /// Whether the operation needs primary keys to address rows
    pub fn requires_primary_key(&self) -> bool {
        matches!(self, Operation::Update | Operation::Refresh | Operation::Delete)
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = CoreError;

    /// Accepts `CLEAN_INSERT`, `clean_insert` and `clean-insert` spellings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        Operation::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == normalized)
            .ok_or_else(|| CoreError::InvalidRequest(format!("unknown operation '{}'", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("CLEAN_INSERT", Operation::CleanInsert)]
    #[case("clean-insert", Operation::CleanInsert)]
    #[case(" truncate_insert ", Operation::TruncateInsert)]
    #[case("delete-all", Operation::DeleteAll)]
    #[case("none", Operation::None)]
    fn test_parse(#[case] input: &str, #[case] expected: Operation) {
        assert_eq!(input.parse::<Operation>().unwrap(), expected);
    }

    #[test]
    fn test_parse_unknown() {
        assert!("upsert".parse::<Operation>().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for op in Operation::ALL {
            assert_eq!(op.to_string().parse::<Operation>().unwrap(), op);
        }
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&Operation::TruncateTable).unwrap();
        assert_eq!(json, "\"TRUNCATE_TABLE\"");
        let op: Operation = serde_json::from_str("\"DELETE_ALL\"").unwrap();
        assert_eq!(op, Operation::DeleteAll);
    }

    #[test]
    fn test_classification() {
        assert!(!Operation::None.mutates());
        assert!(Operation::Update.requires_primary_key());
        assert!(!Operation::Insert.requires_primary_key());
    }
}
