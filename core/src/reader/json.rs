//! JSON reader
//!
//! A JSON fixture file holds an array of objects, one object per row. The
//! column set is the union of keys in first-seen order; a missing key is NULL.

use std::fs;
use std::path::Path;
use serde_json::Value;

use crate::models::DataValue;
use super::{RawTable, ReadError, TableReader};

/// Reader for JSON array-of-objects files
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReader;

impl JsonReader {
    /// Parse JSON text into a raw table
    pub fn parse(&self, content: &str) -> Result<RawTable, ReadError> {
        let document: Value = serde_json::from_str(content)?;
        let records = match document {
            Value::Array(records) => records,
            other => {
                return Err(ReadError::Layout(format!(
                    "expected an array of row objects, found {}",
                    json_kind(&other)
                )))
            }
        };

        let mut columns: Vec<String> = Vec::new();
        let mut objects = Vec::with_capacity(records.len());
        for (index, record) in records.into_iter().enumerate() {
            match record {
                Value::Object(map) => {
                    for key in map.keys() {
                        if !columns.iter().any(|c| c == key) {
                            columns.push(key.clone());
                        }
                    }
                    objects.push(map);
                }
                other => {
                    return Err(ReadError::Layout(format!(
                        "row {} is {} instead of an object",
                        index,
                        json_kind(&other)
                    )))
                }
            }
        }

        let rows = objects
            .into_iter()
            .map(|mut map| {
                columns
                    .iter()
                    .map(|column| map.remove(column).map(cell_value).unwrap_or(DataValue::Null))
                    .collect()
            })
            .collect();

        Ok(RawTable::new(columns, rows))
    }
}

impl TableReader for JsonReader {
    fn read(&self, path: &Path) -> Result<RawTable, ReadError> {
        let content = fs::read_to_string(path)?;
        self.parse(&content)
    }
}

fn cell_value(value: Value) -> DataValue {
    match value {
        Value::Null => DataValue::Null,
        Value::String(s) => DataValue::Text(s),
        Value::Bool(b) => DataValue::Text(b.to_string()),
        Value::Number(n) => DataValue::Text(n.to_string()),
        nested => DataValue::Text(nested.to_string()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
