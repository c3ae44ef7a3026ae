//! Identifier newtypes
//!
//! Table, column, scenario, marker, data-source and schema names all wrap text,
//! but they are distinct types so one can never be passed where another is
//! expected. Every identifier is trimmed at construction and must not be blank.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident, $what:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier, trimming surrounding whitespace
            pub fn new(value: impl AsRef<str>) -> Result<Self> {
                let trimmed = value.as_ref().trim();
                if trimmed.is_empty() {
                    return Err(CoreError::InvalidIdentifier(
                        concat!($what, " must not be blank").to_string(),
                    ));
                }
                Ok(Self(trimmed.to_string()))
            }

            /// Borrow the identifier text
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
                self.0.fmt(f)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = CoreError;

            fn try_from(value: String) -> Result<Self> {
                Self::new(value)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = CoreError;

            fn try_from(value: &str) -> Result<Self> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> String {
                value.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

identifier!(
    /// Name of a database table, derived from a fixture file name
    TableName,
    "table name"
);

identifier!(
    /// Name of a column inside a table
    ColumnName,
    "column name"
);

identifier!(
    /// Name of a scenario selecting rows inside a shared fixture file
    ScenarioName,
    "scenario name"
);

identifier!(
    /// Header of the column that tags rows with a scenario name
    ScenarioMarker,
    "scenario marker"
);

identifier!(
    /// Logical name a database connection is registered under
    DataSourceName,
    "data source name"
);

identifier!(
    /// Database schema qualifying table names
    SchemaName,
    "schema name"
);

/// Default header of the scenario marker column
pub const DEFAULT_SCENARIO_MARKER: &str = "[Scenario]";

impl Default for ScenarioMarker {
    fn default() -> Self {
        ScenarioMarker(DEFAULT_SCENARIO_MARKER.to_string())
    }
}

/// A table name with an optional schema qualifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedTable {
    /// Schema the table lives in, if not the connection default
    pub schema: Option<SchemaName>,

    /// Unqualified table name
    pub table: TableName,
}

impl QualifiedTable {
    /// Create a qualified table name
    pub fn new(schema: Option<SchemaName>, table: TableName) -> Self {
        QualifiedTable { schema, table }
    }

    /// Unqualified table name
    pub fn unqualified(table: TableName) -> Self {
        QualifiedTable { schema: None, table }
    }
}

impl Display for QualifiedTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.table),
            None => write!(f, "{}", self.table),
        }
    }
}
