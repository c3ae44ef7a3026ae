//! CSV reader
//!
//! The first record holds the column headers. The reader keeps track of whether
//! each field was quoted: an unquoted empty field is NULL while `""` is an
//! empty string. Blank lines are skipped, except in a single-column file
//! where an empty line is a row holding NULL.

use std::fs;
use std::path::Path;

use crate::models::DataValue;
use super::{RawTable, ReadError, TableReader};

/// Reader for delimiter-separated files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvReader {
    delimiter: u8,
}

impl Default for CsvReader {
    fn default() -> Self {
        CsvReader { delimiter: b',' }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    FieldStart,
    Unquoted,
    Quoted,
    QuoteInQuoted,
}

#[derive(Debug, Default)]
struct Field {
    text: String,
    quoted: bool,
}

impl Field {
    fn into_value(self) -> DataValue {
        if !self.quoted && self.text.is_empty() {
            DataValue::Null
        } else {
            DataValue::Text(self.text)
        }
    }

    fn is_blank_line(record: &[Field]) -> bool {
        record.len() == 1 && !record[0].quoted && record[0].text.is_empty()
    }
}

/// A record and the line it started on
type Record = (usize, Vec<Field>);

impl CsvReader {
    /// Create a reader splitting fields on `delimiter`
    pub fn new(delimiter: u8) -> Self {
        CsvReader { delimiter }
    }

    /// Parse CSV text into a raw table
    pub fn parse(&self, content: &str) -> Result<RawTable, ReadError> {
        let mut records = self.tokenize(content)?;
        while records.last().map_or(false, |(_, record)| Field::is_blank_line(record)) {
            records.pop();
        }
        let mut records = records
            .into_iter()
            .skip_while(|(_, record)| Field::is_blank_line(record));

        let (_, header) = records.next().ok_or_else(|| ReadError::Malformed {
            line: 1,
            reason: "missing header row".to_string(),
        })?;

        let mut columns = Vec::with_capacity(header.len());
        for (index, field) in header.into_iter().enumerate() {
            let name = field.text.trim().to_string();
            if name.is_empty() {
                return Err(ReadError::Malformed {
                    line: 1,
                    reason: format!("header {} is blank", index + 1),
                });
            }
            columns.push(name);
        }

        let mut rows = Vec::new();
        for (line, record) in records {
            if columns.len() > 1 && Field::is_blank_line(&record) {
                continue;
            }
            if record.len() > columns.len() {
                return Err(ReadError::Malformed {
                    line,
                    reason: format!(
                        "record has {} fields but the header has {}",
                        record.len(),
                        columns.len()
                    ),
                });
            }
            let mut row: Vec<DataValue> = record.into_iter().map(Field::into_value).collect();
            row.resize(columns.len(), DataValue::Null);
            rows.push(row);
        }

        Ok(RawTable::new(columns, rows))
    }

    fn tokenize(&self, content: &str) -> Result<Vec<Record>, ReadError> {
        let delimiter = self.delimiter as char;
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);

        let mut records: Vec<Record> = Vec::new();
        let mut record: Vec<Field> = Vec::new();
        let mut field = Field::default();
        let mut state = State::FieldStart;
        let mut line = 1;
        let mut record_line = 1;

        let mut chars = content.chars().peekable();
        while let Some(c) = chars.next() {
            let newline = c == '\n' || c == '\r';
            let crlf = c == '\r' && chars.peek() == Some(&'\n');
            if crlf {
                chars.next();
            }

            match state {
                State::Quoted => {
                    if c == '"' {
                        state = State::QuoteInQuoted;
                    } else if newline {
                        line += 1;
                        field.text.push(c);
                        if crlf {
                            field.text.push('\n');
                        }
                    } else {
                        field.text.push(c);
                    }
                    continue;
                }
                State::QuoteInQuoted if c == '"' => {
                    field.text.push('"');
                    state = State::Quoted;
                    continue;
                }
                State::QuoteInQuoted if c != delimiter && !newline => {
                    return Err(ReadError::Malformed {
                        line,
                        reason: format!("unexpected '{}' after closing quote", c),
                    });
                }
                State::FieldStart if c == '"' => {
                    field.quoted = true;
                    state = State::Quoted;
                    continue;
                }
                _ => {}
            }

            if c == delimiter {
                record.push(std::mem::take(&mut field));
                state = State::FieldStart;
            } else if newline {
                record.push(std::mem::take(&mut field));
                records.push((record_line, std::mem::take(&mut record)));
                line += 1;
                record_line = line;
                state = State::FieldStart;
            } else {
                field.text.push(c);
                state = State::Unquoted;
            }
        }

        if state == State::Quoted {
            return Err(ReadError::Malformed {
                line: record_line,
                reason: "unterminated quoted field".to_string(),
            });
        }

        let pending = !record.is_empty() || field.quoted || !field.text.is_empty();
        if pending {
            record.push(field);
            records.push((record_line, record));
        }

        Ok(records)
    }
}

impl TableReader for CsvReader {
    fn read(&self, path: &Path) -> Result<RawTable, ReadError> {
        let content = fs::read_to_string(path)?;
        self.parse(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> DataValue {
        DataValue::text(s)
    }

    #[test]
    fn test_empty_cell_is_null_and_quoted_empty_is_empty_string() {
        let raw = CsvReader::default()
            .parse("ID,NAME,NOTE\n1,,\"\"\n")
            .unwrap();

        assert_eq!(raw.columns, vec!["ID", "NAME", "NOTE"]);
        assert_eq!(raw.rows, vec![vec![text("1"), DataValue::Null, text("")]]);
    }

    #[test]
    fn test_quoted_fields() {
        let raw = CsvReader::default()
            .parse("ID,NAME\n1,\"Smith, John\"\n2,\"say \"\"hi\"\"\"\n3,\"two\nlines\"\n")
            .unwrap();

        assert_eq!(raw.rows.len(), 3);
        assert_eq!(raw.rows[0][1], text("Smith, John"));
        assert_eq!(raw.rows[1][1], text("say \"hi\""));
        assert_eq!(raw.rows[2][1], text("two\nlines"));
    }

    #[test]
    fn test_crlf_bom_and_blank_lines() {
        let raw = CsvReader::default()
            .parse("\u{feff}ID,NAME\r\n1,Alice\r\n\r\n2,Bob")
            .unwrap();

        assert_eq!(raw.columns, vec!["ID", "NAME"]);
        assert_eq!(
            raw.rows,
            vec![vec![text("1"), text("Alice")], vec![text("2"), text("Bob")]]
        );
    }

    #[test]
    fn test_line_breaks_in_quoted_fields_are_kept_verbatim() {
        let raw = CsvReader::default()
            .parse("ID,NOTE\r\n1,\"a\r\nb\"\r\n2,\"c\rd\"\r\n")
            .unwrap();
        assert_eq!(raw.rows[0][1], text("a\r\nb"));
        assert_eq!(raw.rows[1][1], text("c\rd"));
    }

    #[test]
    fn test_empty_line_in_single_column_file_is_null_row() {
        let raw = CsvReader::default().parse("NOTE\nx\n\ny\n\n").unwrap();
        assert_eq!(
            raw.rows,
            vec![vec![text("x")], vec![DataValue::Null], vec![text("y")]]
        );
    }

    #[test]
    fn test_short_rows_are_padded_with_null() {
        let raw = CsvReader::default().parse("ID,NAME,EMAIL\n1,Alice\n").unwrap();
        assert_eq!(raw.rows[0], vec![text("1"), text("Alice"), DataValue::Null]);
    }

    #[test]
    fn test_long_rows_are_rejected_with_line_number() {
        let err = CsvReader::default()
            .parse("ID,NAME\n1,Alice\n2,Bob,extra\n")
            .unwrap_err();
        match err {
            ReadError::Malformed { line, .. } => assert_eq!(line, 3),
            other => panic!("Expected Malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_unterminated_quote() {
        let err = CsvReader::default().parse("ID,NAME\n1,\"Alice\n").unwrap_err();
        assert!(matches!(err, ReadError::Malformed { .. }));
    }

    #[test]
    fn test_text_after_closing_quote() {
        let err = CsvReader::default().parse("ID\n\"a\"b\n").unwrap_err();
        assert!(matches!(err, ReadError::Malformed { line: 2, .. }));
    }

    #[test]
    fn test_missing_header() {
        assert!(CsvReader::default().parse("").is_err());
        assert!(CsvReader::default().parse("ID,,NAME\n").is_err());
    }

    #[test]
    fn test_custom_delimiter() {
        let raw = CsvReader::new(b';').parse("ID;NAME\n1;A,B\n").unwrap();
        assert_eq!(raw.rows[0], vec![text("1"), text("A,B")]);
    }

    #[test]
    fn test_header_only_file() {
        let raw = CsvReader::default().parse("ID,NAME\n").unwrap();
        assert_eq!(raw.columns.len(), 2);
        assert!(raw.rows.is_empty());
    }

    #[test]
    fn test_read_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("USERS.csv");
        std::fs::write(&path, "ID,NAME\n1,Alice\n").unwrap();

        let raw = CsvReader::default().read(&path).unwrap();
        assert_eq!(raw.rows.len(), 1);

        let missing = CsvReader::default().read(&dir.path().join("NOPE.csv"));
        assert!(matches!(missing, Err(ReadError::Io(_))));
    }
}
