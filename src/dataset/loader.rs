//! Loader for delimited `training_data.csv` board tables.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::layout::ROW_WIDTH;

#[derive(Debug, Error)]
pub enum DatasetLoadError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("line {line}: expected {expected} columns, found {found}")]
    ColumnCount {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("line {line}, column {column}: invalid number {value:?}")]
    InvalidNumber {
        line: usize,
        column: usize,
        value: String,
    },
    #[error("dataset has no rows")]
    Empty,
}

/// How the first non-blank line of the file is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderMode {
    /// Skip the first line when it does not parse as numbers.
    #[default]
    Auto,
    Present,
    Absent,
}

impl HeaderMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "present" | "yes" | "true" => Some(Self::Present),
            "absent" | "no" | "false" => Some(Self::Absent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    pub delimiter: char,
    pub header: HeaderMode,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: '\t',
            header: HeaderMode::Auto,
        }
    }
}

/// Dense row-major table of `ROW_WIDTH` values per row.
#[derive(Debug, Clone, PartialEq)]
pub struct DataTable {
    values: Vec<f32>,
}

impl DataTable {
    /// Build a table from already-parsed rows. Every row must be `ROW_WIDTH` long.
    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self, DatasetLoadError> {
        let mut values = Vec::with_capacity(rows.len() * ROW_WIDTH);
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != ROW_WIDTH {
                return Err(DatasetLoadError::ColumnCount {
                    line: idx + 1,
                    expected: ROW_WIDTH,
                    found: row.len(),
                });
            }
            values.extend_from_slice(row);
        }
        if values.is_empty() {
            return Err(DatasetLoadError::Empty);
        }
        Ok(Self { values })
    }

    pub fn len(&self) -> usize {
        self.values.len() / ROW_WIDTH
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn row(&self, index: usize) -> &[f32] {
        let start = index * ROW_WIDTH;
        &self.values[start..start + ROW_WIDTH]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.values.chunks_exact(ROW_WIDTH)
    }
}

/// Read and parse a delimited board table from disk.
pub fn load_table(path: &Path, options: &LoadOptions) -> Result<DataTable, DatasetLoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| DatasetLoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let table = parse_table(&text, options)?;
    tracing::info!("Loaded {} rows from {}", table.len(), path.display());
    Ok(table)
}

/// Parse delimited text into a table. Empty fields read as `0`.
pub fn parse_table(text: &str, options: &LoadOptions) -> Result<DataTable, DatasetLoadError> {
    let mut values = Vec::new();
    let mut first = true;
    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        let fields = split_fields(line, options.delimiter);
        if std::mem::take(&mut first) && skip_as_header(&fields, options.header) {
            tracing::debug!("Skipping header line {line_no}");
            continue;
        }
        if fields.len() != ROW_WIDTH {
            return Err(DatasetLoadError::ColumnCount {
                line: line_no,
                expected: ROW_WIDTH,
                found: fields.len(),
            });
        }
        for (column, field) in fields.iter().enumerate() {
            values.push(parse_field(field).ok_or_else(|| DatasetLoadError::InvalidNumber {
                line: line_no,
                column,
                value: field.to_string(),
            })?);
        }
    }
    if values.is_empty() {
        return Err(DatasetLoadError::Empty);
    }
    Ok(DataTable { values })
}

/// Split on the delimiter, dropping empty fields past the row width left by a trailing delimiter.
fn split_fields(line: &str, delimiter: char) -> Vec<&str> {
    let mut fields: Vec<&str> = line.split(delimiter).collect();
    while fields.len() > ROW_WIDTH && fields.last().is_some_and(|f| f.trim().is_empty()) {
        fields.pop();
    }
    fields
}

fn skip_as_header(fields: &[&str], mode: HeaderMode) -> bool {
    match mode {
        HeaderMode::Present => true,
        HeaderMode::Absent => false,
        HeaderMode::Auto => fields.iter().any(|field| parse_field(field).is_none()),
    }
}

fn parse_field(field: &str) -> Option<f32> {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    trimmed.parse::<f32>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numeric_line(seed: usize, delimiter: char) -> String {
        (0..ROW_WIDTH)
            .map(|col| ((seed + col) % 4).to_string())
            .collect::<Vec<_>>()
            .join(&delimiter.to_string())
    }

    #[test]
    fn parses_tab_rows_and_skips_blank_trailer() {
        let text = format!("{}\n{}\n", numeric_line(0, '\t'), numeric_line(1, '\t'));
        let table = parse_table(&text, &LoadOptions::default()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.row(0)[1], 1.0);
        assert_eq!(table.row(1)[0], 1.0);
    }

    #[test]
    fn empty_fields_read_as_zero() {
        let mut fields = vec!["2".to_string(); ROW_WIDTH];
        fields[5] = String::new();
        fields[70] = " ".to_string();
        let table = parse_table(&fields.join("\t"), &LoadOptions::default()).unwrap();
        assert_eq!(table.row(0)[5], 0.0);
        assert_eq!(table.row(0)[70], 0.0);
        assert_eq!(table.row(0)[4], 2.0);
    }

    #[test]
    fn auto_header_skips_text_first_line() {
        let text = format!(
            "Level(1), Voltorb Numbers(20), Board State(25)\r\n{}\r\n",
            numeric_line(0, '\t')
        );
        let table = parse_table(&text, &LoadOptions::default()).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn absent_header_treats_text_as_error() {
        let text = format!("level\n{}\n", numeric_line(0, '\t'));
        let options = LoadOptions {
            header: HeaderMode::Absent,
            ..LoadOptions::default()
        };
        let err = parse_table(&text, &options).unwrap_err();
        assert!(matches!(err, DatasetLoadError::ColumnCount { line: 1, .. }));
    }

    #[test]
    fn trailing_delimiter_is_tolerated() {
        let text = format!("{},", numeric_line(2, ','));
        let options = LoadOptions {
            delimiter: ',',
            header: HeaderMode::Absent,
        };
        assert_eq!(parse_table(&text, &options).unwrap().len(), 1);
    }

    #[test]
    fn short_row_reports_line_and_count() {
        let text = format!("{}\n1\t2\t3\n", numeric_line(0, '\t'));
        let err = parse_table(&text, &LoadOptions::default()).unwrap_err();
        match err {
            DatasetLoadError::ColumnCount {
                line,
                expected,
                found,
            } => {
                assert_eq!(line, 2);
                assert_eq!(expected, ROW_WIDTH);
                assert_eq!(found, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bad_number_after_first_line_is_an_error() {
        let mut fields = vec!["1".to_string(); ROW_WIDTH];
        fields[9] = "x".to_string();
        let text = format!("{}\n{}\n", numeric_line(0, '\t'), fields.join("\t"));
        let err = parse_table(&text, &LoadOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            DatasetLoadError::InvalidNumber { line: 2, column: 9, .. }
        ));
    }

    #[test]
    fn header_only_file_is_empty() {
        let err = parse_table("a\tb\n\n", &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, DatasetLoadError::Empty));
    }

    #[test]
    fn load_table_reports_missing_path() {
        let err = load_table(Path::new("/nonexistent/training_data.csv"), &LoadOptions::default())
            .unwrap_err();
        assert!(matches!(err, DatasetLoadError::Read { .. }));
    }
}
