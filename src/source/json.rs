//! JSON array and JSON lines source

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use log::debug;
use serde_json::Value as JsonValue;

use crate::model::{ColumnType, Dataset, Value};

use super::{finish_schema, DataSource};

/// Source for files holding an array of objects, or one object per line
#[derive(Debug, Clone)]
pub struct JsonSource {
    path: PathBuf,
    lines: bool,
    column_types: IndexMap<String, ColumnType>,
}

impl JsonSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lines: false,
            column_types: IndexMap::new(),
        }
    }

    /// Read one JSON object per line instead of a single document
    pub fn with_lines(mut self, lines: bool) -> Self {
        self.lines = lines;
        self
    }

    pub fn with_column_types(mut self, column_types: IndexMap<String, ColumnType>) -> Self {
        self.column_types = column_types;
        self
    }

    fn read_document(&self, reader: BufReader<File>) -> Result<Vec<(usize, JsonValue)>> {
        let value: JsonValue =
            serde_json::from_reader(reader).context("Failed to parse JSON file")?;

        // Handle both arrays and single objects
        let array = match value {
            JsonValue::Array(arr) => arr,
            JsonValue::Object(_) => vec![value],
            _ => bail!("JSON must be an array or object"),
        };

        Ok(array.into_iter().enumerate().map(|(i, v)| (i + 1, v)).collect())
    }

    fn read_lines(&self, reader: BufReader<File>) -> Result<Vec<(usize, JsonValue)>> {
        let mut items = Vec::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("Failed to read line {}", i + 1))?;
            if line.trim().is_empty() {
                continue;
            }
            let value: JsonValue = serde_json::from_str(&line)
                .with_context(|| format!("Invalid JSON on line {}", i + 1))?;
            items.push((i + 1, value));
        }
        Ok(items)
    }
}

impl DataSource for JsonSource {
    fn load(&self) -> Result<Dataset> {
        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open JSON file: {}", self.path.display()))?;
        let reader = BufReader::new(file);

        let items = if self.lines {
            self.read_lines(reader)?
        } else {
            self.read_document(reader)?
        };

        if items.is_empty() {
            bail!("JSON input has no records: {}", self.path.display());
        }

        let mut lines = Vec::with_capacity(items.len());
        let mut records = Vec::with_capacity(items.len());
        for (line, item) in items {
            let record: IndexMap<String, Value> = match item {
                JsonValue::Object(obj) => obj
                    .iter()
                    .map(|(k, v)| (k.clone(), json_value_to_cell(v)))
                    .collect(),
                other => bail!("Record {} is not a JSON object: {}", line, other),
            };
            lines.push(line);
            records.push(record);
        }

        let mut dataset = Dataset::from_records(records);
        for (row, line) in dataset.rows.iter_mut().zip(lines) {
            row.source_line = line;
        }
        finish_schema(&mut dataset, &self.column_types);

        debug!(
            "Loaded {} records x {} columns from {}",
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

fn json_value_to_cell(value: &JsonValue) -> Value {
    match value {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::String(n.to_string())
            }
        }
        JsonValue::String(s) => {
            if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                return Value::Date(date);
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
                return Value::DateTime(dt);
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
                return Value::DateTime(dt);
            }
            Value::String(s.clone())
        }
        // Nested structures compare as their compact JSON text
        JsonValue::Array(_) | JsonValue::Object(_) => Value::String(value.to_string()),
    }
}
