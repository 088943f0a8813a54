//! Dataset and Row data structures

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use super::schema::{Column, ColumnType};
use super::value::Value;

/// Which of the two compared datasets something belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Source,
    Target,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Source => write!(f, "source"),
            Side::Target => write!(f, "target"),
        }
    }
}

/// A row in a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Cell values in column order
    pub cells: Vec<Value>,
    /// Original line/row number in the source (1-indexed)
    pub source_line: usize,
}

impl Row {
    /// Create a new row
    pub fn new(cells: Vec<Value>, source_line: usize) -> Self {
        Self { cells, source_line }
    }

    /// Get a cell value by column index, `None` when the row has no such cell
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.cells.get(index)
    }
}

/// An ordered collection of rows sharing one schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Column definitions
    pub columns: Vec<Column>,
    /// All rows in order
    pub rows: Vec<Row>,
}

impl Dataset {
    /// Create a new empty dataset with column definitions
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a dataset from column names and positional rows, inferring column types.
    ///
    /// Rows are numbered from 1 in the order given.
    pub fn from_rows<S: AsRef<str>>(names: &[S], rows: Vec<Vec<Value>>) -> Self {
        let columns = names
            .iter()
            .enumerate()
            .map(|(i, name)| Column::new(name.as_ref(), i))
            .collect();
        let mut dataset = Self::new(columns);
        for (i, cells) in rows.into_iter().enumerate() {
            dataset.add_row(cells, i + 1);
        }
        dataset.infer_column_types();
        dataset
    }

    /// Build a dataset from name → value records.
    ///
    /// The schema is the ordered union of all record keys; a record lacking a
    /// key gets a null cell for that column.
    pub fn from_records(records: Vec<IndexMap<String, Value>>) -> Self {
        let mut names: IndexSet<String> = IndexSet::new();
        for record in &records {
            for key in record.keys() {
                names.insert(key.clone());
            }
        }

        let columns = names
            .iter()
            .enumerate()
            .map(|(i, name)| Column::new(name.clone(), i))
            .collect();
        let mut dataset = Self::new(columns);

        for (i, mut record) in records.into_iter().enumerate() {
            let cells = names
                .iter()
                .map(|name| record.shift_remove(name).unwrap_or(Value::Null))
                .collect();
            dataset.add_row(cells, i + 1);
        }

        dataset.infer_column_types();
        dataset
    }

    /// Add a row to the dataset
    pub fn add_row(&mut self, cells: Vec<Value>, source_line: usize) {
        self.rows.push(Row::new(cells, source_line));
    }

    /// Infer the type of every column from its values.
    ///
    /// Columns that already carry a declared type other than `Null` keep it.
    pub fn infer_column_types(&mut self) {
        for col_idx in 0..self.column_count() {
            if self.columns[col_idx].column_type != ColumnType::Null {
                continue;
            }

            let inferred = self
                .rows
                .iter()
                .filter_map(|row| row.get(col_idx))
                .fold(ColumnType::Null, |acc, cell| acc.widen(cell.column_type()));

            self.columns[col_idx].column_type = inferred;
        }
    }

    /// Override the declared type of a column
    pub fn set_column_type(&mut self, name: &str, column_type: ColumnType) -> bool {
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(col) => {
                col.column_type = column_type;
                true
            }
            None => false,
        }
    }

    /// Rename a column in place
    pub fn rename_column(&mut self, index: usize, name: impl Into<String>) {
        if let Some(col) = self.columns.get_mut(index) {
            col.name = name.into();
        }
    }

    /// Get column index by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Get column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column names in schema order
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Look up a cell of a row by column name
    pub fn value<'a>(&self, row: &'a Row, column: &str) -> Option<&'a Value> {
        self.column_index(column).and_then(|i| row.get(i))
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}
