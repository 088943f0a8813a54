//! Data sources that load tabular files into datasets

mod csv;
mod json;

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::{ColumnType, Dataset};

pub use self::csv::CsvSource;
pub use self::json::JsonSource;

/// Something that can produce a dataset
pub trait DataSource: Send + Sync {
    /// Load the full dataset into memory
    fn load(&self) -> Result<Dataset>;

    /// Human-readable origin, used in reports
    fn describe(&self) -> String;
}

/// Supported file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Csv,
    Json,
    Jsonl,
}

impl SourceFormat {
    /// Guess the format from a file extension
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "csv" | "tsv" | "txt" => Some(SourceFormat::Csv),
            "json" => Some(SourceFormat::Json),
            "jsonl" | "ndjson" => Some(SourceFormat::Jsonl),
            _ => None,
        }
    }
}

/// Declarative description of a file source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub path: PathBuf,
    /// Overrides detection by extension
    #[serde(default)]
    pub format: Option<SourceFormat>,
    /// CSV field delimiter; `.tsv` files default to tab
    #[serde(default)]
    pub delimiter: Option<char>,
    /// Declared column types; other columns are inferred
    #[serde(default)]
    pub column_types: IndexMap<String, ColumnType>,
}

impl SourceSpec {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            format: None,
            delimiter: None,
            column_types: IndexMap::new(),
        }
    }
}

/// Factory for creating data sources from specs
pub struct SourceFactory;

impl SourceFactory {
    /// Create a data source from its description
    pub fn create(spec: &SourceSpec) -> Result<Box<dyn DataSource>> {
        let format = match spec.format.or_else(|| SourceFormat::from_extension(&spec.path)) {
            Some(format) => format,
            None => bail!(
                "Unsupported file format: {}",
                spec.path
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("unknown")
            ),
        };

        Ok(match format {
            SourceFormat::Csv => {
                let is_tsv = spec
                    .path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("tsv"));
                let delimiter = spec.delimiter.unwrap_or(if is_tsv { '\t' } else { ',' });
                Box::new(
                    CsvSource::new(&spec.path)
                        .with_delimiter(delimiter)?
                        .with_column_types(spec.column_types.clone()),
                )
            }
            SourceFormat::Json => Box::new(
                JsonSource::new(&spec.path).with_column_types(spec.column_types.clone()),
            ),
            SourceFormat::Jsonl => Box::new(
                JsonSource::new(&spec.path)
                    .with_lines(true)
                    .with_column_types(spec.column_types.clone()),
            ),
        })
    }

    /// Load a file, picking the source by extension
    pub fn load(path: &Path) -> Result<Dataset> {
        Self::create(&SourceSpec::new(path))?.load()
    }
}

/// Apply declared column types and infer the rest
pub(crate) fn finish_schema(dataset: &mut Dataset, column_types: &IndexMap<String, ColumnType>) {
    for (name, column_type) in column_types {
        if !dataset.set_column_type(name, *column_type) {
            log::warn!("Declared type for unknown column '{}' ignored", name);
        }
    }
    dataset.infer_column_types();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(SourceFormat::from_extension(Path::new("a.CSV")), Some(SourceFormat::Csv));
        assert_eq!(SourceFormat::from_extension(Path::new("a.ndjson")), Some(SourceFormat::Jsonl));
        assert_eq!(SourceFormat::from_extension(Path::new("a.xlsx")), None);
    }

    #[test]
    fn test_unsupported_format() {
        let err = SourceFactory::create(&SourceSpec::new("data.parquet")).err().unwrap();
        assert!(err.to_string().contains("Unsupported file format: parquet"));
    }

    #[test]
    fn test_non_ascii_delimiter_rejected() {
        let mut spec = SourceSpec::new("data.csv");
        spec.delimiter = Some('§');
        let err = SourceFactory::create(&spec).err().unwrap();
        assert!(err.to_string().contains("Delimiter must be a single ASCII character"));
    }
}
