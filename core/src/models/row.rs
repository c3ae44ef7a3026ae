//! Cell values and rows
//!
//! This module provides the cell value wrapper that keeps NULL, empty string and
//! present content apart, and the row type built from those cells.

use std::fmt::{Debug, Display, Formatter, Result as FmtResult};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use super::names::ColumnName;

/// Value of a single cell
///
/// An empty cell in a fixture file is `Null`; an explicitly quoted empty literal
/// is `Text("")`. The two never compare equal.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataValue {
    /// Absent value
    Null,

    /// Textual content, possibly empty
    Text(String),

    /// Binary content
    Binary(Vec<u8>),
}

impl Debug for DataValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            DataValue::Null => write!(f, "Null"),
            DataValue::Text(v) => {
                if v.chars().count() > 40 {
                    let head: String = v.chars().take(40).collect();
                    write!(f, "Text({:?}...)", head)
                } else {
                    write!(f, "Text({:?})", v)
                }
            }
            DataValue::Binary(v) => {
                if v.len() > 16 {
                    write!(f, "Binary({} bytes)", v.len())
                } else {
                    write!(f, "Binary(0x{})", hex::encode(v))
                }
            }
        }
    }
}

impl Display for DataValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            DataValue::Null => write!(f, "NULL"),
            DataValue::Text(v) => write!(f, "{:?}", v),
            DataValue::Binary(v) => write!(f, "0x{}", hex::encode(v)),
        }
    }
}

impl Default for DataValue {
    fn default() -> Self {
        DataValue::Null
    }
}

impl From<&str> for DataValue {
    fn from(value: &str) -> Self {
        DataValue::Text(value.to_string())
    }
}

impl From<String> for DataValue {
    fn from(value: String) -> Self {
        DataValue::Text(value)
    }
}

impl From<Option<String>> for DataValue {
    fn from(value: Option<String>) -> Self {
        value.map(DataValue::Text).unwrap_or(DataValue::Null)
    }
}

impl From<Vec<u8>> for DataValue {
    fn from(value: Vec<u8>) -> Self {
        DataValue::Binary(value)
    }
}

impl DataValue {
    /// Create a text value
    pub fn text(value: impl Into<String>) -> Self {
        DataValue::Text(value.into())
    }

    /// Whether the value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, DataValue::Null)
    }

    /// Whether the value is a present but empty string
    pub fn is_empty_string(&self) -> bool {
        matches!(self, DataValue::Text(v) if v.is_empty())
    }

    /// NULL or whitespace-only text
    pub fn is_blank(&self) -> bool {
        match self {
            DataValue::Null => true,
            DataValue::Text(v) => v.trim().is_empty(),
            DataValue::Binary(_) => false,
        }
    }

    /// Text content, if this is a text value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            DataValue::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Raw bytes of the value: binary content or UTF-8 text
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            DataValue::Null => None,
            DataValue::Text(v) => Some(v.as_bytes()),
            DataValue::Binary(v) => Some(v),
        }
    }

    /// Turn text carrying `prefix` into binary content decoded from base64.
    ///
    /// Values without the prefix are returned unchanged.
    pub fn decode_binary(self, prefix: &str) -> Result<Self, String> {
        match self {
            DataValue::Text(v) if !prefix.is_empty() && v.starts_with(prefix) => {
                let encoded = v[prefix.len()..].trim();
                BASE64
                    .decode(encoded)
                    .map(DataValue::Binary)
                    .map_err(|e| format!("invalid base64 after '{}': {}", prefix, e))
            }
            other => Ok(other),
        }
    }

    /// Render binary content as prefixed base64 text, the inverse of [`decode_binary`](Self::decode_binary)
    pub fn encode_binary(&self, prefix: &str) -> Self {
        match self {
            DataValue::Binary(v) => DataValue::Text(format!("{}{}", prefix, BASE64.encode(v))),
            other => other.clone(),
        }
    }
}

/// A row: ordered column/value pairs
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    cells: Vec<(ColumnName, DataValue)>,
}

impl Debug for Row {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_map()
            .entries(self.cells.iter().map(|(c, v)| (c.as_str(), v)))
            .finish()
    }
}

impl Display for Row {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let rendered: Vec<String> = self
            .cells
            .iter()
            .map(|(column, value)| format!("{}={}", column, value))
            .collect();
        write!(f, "{{{}}}", rendered.join(", "))
    }
}

impl Row {
    /// Create a row from ordered cells
    pub fn new(cells: Vec<(ColumnName, DataValue)>) -> Self {
        Row { cells }
    }

    /// Get a value by column name
    pub fn get(&self, column: &ColumnName) -> Option<&DataValue> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Get a value by column name given as text
    pub fn get_str(&self, column: &str) -> Option<&DataValue> {
        self.cells
            .iter()
            .find(|(name, _)| name.as_str() == column)
            .map(|(_, value)| value)
    }

    /// Column names in order
    pub fn columns(&self) -> impl Iterator<Item = &ColumnName> {
        self.cells.iter().map(|(name, _)| name)
    }

    /// Values in column order
    pub fn values(&self) -> impl Iterator<Item = &DataValue> {
        self.cells.iter().map(|(_, value)| value)
    }

    /// Column/value pairs in order
    pub fn cells(&self) -> &[(ColumnName, DataValue)] {
        &self.cells
    }

    /// Number of cells
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the row has no cells
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str) -> ColumnName {
        ColumnName::new(name).unwrap()
    }

    #[test]
    fn test_null_empty_and_content_are_distinct() {
        let null = DataValue::Null;
        let empty = DataValue::text("");
        let content = DataValue::text("0");

        assert_ne!(null, empty);
        assert_ne!(empty, content);
        assert_ne!(null, content);

        assert!(null.is_null());
        assert!(empty.is_empty_string());
        assert!(!content.is_empty_string());
    }

    #[test]
    fn test_blank_values() {
        assert!(DataValue::Null.is_blank());
        assert!(DataValue::text("").is_blank());
        assert!(DataValue::text("  ").is_blank());
        assert!(!DataValue::text("a").is_blank());
        assert!(!DataValue::Binary(vec![]).is_blank());
    }

    #[test]
    fn test_binary_prefix_decoding() {
        let value = DataValue::text("base64:AQID").decode_binary("base64:").unwrap();
        assert_eq!(value, DataValue::Binary(vec![1, 2, 3]));

        // Encoding goes back to the same literal
        assert_eq!(value.encode_binary("base64:"), DataValue::text("base64:AQID"));

        // Plain text is untouched
        let plain = DataValue::text("AQID").decode_binary("base64:").unwrap();
        assert_eq!(plain, DataValue::text("AQID"));

        assert!(DataValue::text("base64:***").decode_binary("base64:").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(DataValue::Null.to_string(), "NULL");
        assert_eq!(DataValue::text("").to_string(), "\"\"");
        assert_eq!(DataValue::text("Alice").to_string(), "\"Alice\"");
        assert_eq!(DataValue::Binary(vec![0xab, 0x01]).to_string(), "0xab01");
    }

    #[test]
    fn test_row_lookup_keeps_order() {
        let row = Row::new(vec![
            (col("ID"), DataValue::text("1")),
            (col("NAME"), DataValue::text("Alice")),
            (col("EMAIL"), DataValue::Null),
        ]);

        assert_eq!(row.get(&col("NAME")), Some(&DataValue::text("Alice")));
        assert_eq!(row.get_str("EMAIL"), Some(&DataValue::Null));
        assert_eq!(row.get_str("name"), None);

        let columns: Vec<&str> = row.columns().map(|c| c.as_str()).collect();
        assert_eq!(columns, vec!["ID", "NAME", "EMAIL"]);
        assert_eq!(row.to_string(), "{ID=\"1\", NAME=\"Alice\", EMAIL=NULL}");
    }
}
