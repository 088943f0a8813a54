//! CSV file source

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use log::debug;

use crate::model::{Column, ColumnType, Dataset, Value};

use super::{finish_schema, DataSource};

/// Source for delimited text files with a header row
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
    delimiter: u8,
    column_types: IndexMap<String, ColumnType>,
}

impl CsvSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            delimiter: b',',
            column_types: IndexMap::new(),
        }
    }

    /// Set the field delimiter; must be an ASCII character
    pub fn with_delimiter(mut self, delimiter: char) -> Result<Self> {
        if !delimiter.is_ascii() {
            bail!("Delimiter must be a single ASCII character, got '{}'", delimiter);
        }
        self.delimiter = delimiter as u8;
        Ok(self)
    }

    /// Declare column types instead of inferring them
    pub fn with_column_types(mut self, column_types: IndexMap<String, ColumnType>) -> Self {
        self.column_types = column_types;
        self
    }
}

impl DataSource for CsvSource {
    fn load(&self) -> Result<Dataset> {
        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open file: {}", self.path.display()))?;
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(self.delimiter)
            .from_reader(BufReader::new(file));

        let headers = csv_reader
            .headers()
            .context("Failed to read CSV headers")?
            .clone();

        let columns: Vec<Column> = headers
            .iter()
            .enumerate()
            .map(|(i, name)| Column::new(name.to_string(), i))
            .collect();

        // Declared string columns keep their text verbatim
        let verbatim: Vec<bool> = columns
            .iter()
            .map(|c| self.column_types.get(&c.name) == Some(&ColumnType::String))
            .collect();

        let mut dataset = Dataset::new(columns);

        for (index, result) in csv_reader.records().enumerate() {
            let record =
                result.with_context(|| format!("Failed to read CSV record {}", index + 1))?;
            // Quoted fields may span lines, so take the record's own start line
            let line = record
                .position()
                .map_or(index + 2, |p| p.line() as usize);

            let cells: Vec<Value> = record
                .iter()
                .enumerate()
                .map(|(i, s)| {
                    if verbatim.get(i).copied().unwrap_or(false) {
                        Value::String(s.to_string())
                    } else {
                        parse_cell_value(s)
                    }
                })
                .collect();

            dataset.add_row(cells, line);
        }

        finish_schema(&mut dataset, &self.column_types);
        debug!(
            "Loaded {} rows x {} columns from {}",
            dataset.row_count(),
            dataset.column_count(),
            self.path.display()
        );

        Ok(dataset)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Parse a string value into a Value with type inference.
///
/// Only the empty field becomes null here; null markers are the normalizer's job.
fn parse_cell_value(s: &str) -> Value {
    let trimmed = s.trim();

    if s.is_empty() {
        return Value::Null;
    }

    if trimmed.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }

    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::Int(i);
    }

    if let Ok(f) = trimmed.parse::<f64>() {
        if f.is_finite() {
            return Value::Float(f);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Value::Date(date);
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return Value::DateTime(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f") {
        return Value::DateTime(dt);
    }

    Value::String(s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_cell_value() {
        assert_eq!(parse_cell_value(""), Value::Null);
        assert_eq!(parse_cell_value("null"), Value::from("null"));
        assert_eq!(parse_cell_value("true"), Value::Bool(true));
        assert_eq!(parse_cell_value("42"), Value::Int(42));
        assert_eq!(parse_cell_value("3.14"), Value::Float(3.14));
        assert_eq!(parse_cell_value("NaN"), Value::from("NaN"));
        assert_eq!(
            parse_cell_value("2024-02-29"),
            Value::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
        );
        assert_eq!(parse_cell_value(" hello "), Value::from(" hello "));
    }

    #[test]
    fn test_load_with_declared_types() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "id,zip,amount").unwrap();
        writeln!(file, "1,00501,10").unwrap();
        writeln!(file, "2,10001,12.5").unwrap();
        file.flush().unwrap();

        let mut types = IndexMap::new();
        types.insert("zip".to_string(), ColumnType::String);
        let ds = CsvSource::new(file.path()).with_column_types(types).load().unwrap();

        assert_eq!(ds.row_count(), 2);
        assert_eq!(ds.rows[0].source_line, 2);
        assert_eq!(ds.value(&ds.rows[0], "zip"), Some(&Value::from("00501")));
        assert_eq!(ds.column("amount").map(|c| c.column_type), Some(ColumnType::Float));
        assert_eq!(ds.column("id").map(|c| c.column_type), Some(ColumnType::Int));
    }

    #[test]
    fn test_multiline_field_keeps_line_numbers() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        write!(file, "id,note\n1,\"first\nsecond\"\n2,plain\n").unwrap();
        file.flush().unwrap();

        let ds = CsvSource::new(file.path()).load().unwrap();
        assert_eq!(ds.rows[0].source_line, 2);
        assert_eq!(ds.rows[1].source_line, 4);
        assert_eq!(ds.value(&ds.rows[0], "note"), Some(&Value::from("first\nsecond")));
    }

    #[test]
    fn test_delimiter_must_be_ascii() {
        assert!(CsvSource::new("a.csv").with_delimiter(';').is_ok());
        let err = CsvSource::new("a.csv").with_delimiter('§').unwrap_err();
        assert!(err.to_string().contains("single ASCII character"));
    }
}
