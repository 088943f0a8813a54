//! Error types for comparison runs

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{ColumnType, KeyTuple, Side};

pub type Result<T> = std::result::Result<T, CompareError>;

/// Fatal errors raised by `compare`; no result is produced
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompareError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error(
        "Duplicate primary key ({}) in {side} dataset at lines {first_line} and {duplicate_line}",
        .key.describe(.key_columns)
    )]
    DuplicateKey {
        side: Side,
        key: KeyTuple,
        key_columns: Vec<String>,
        first_line: usize,
        duplicate_line: usize,
    },

    #[error("Null primary key in {side} dataset at line {line}")]
    NullKey { side: Side, line: usize },
}

/// Invalid configuration, detected before any row is processed
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("primary key must name at least one column")]
    EmptyPrimaryKey,

    #[error("primary key lists column '{0}' more than once")]
    DuplicateKeyColumn(String),

    #[error("primary key column '{column}' is missing from the {side} dataset")]
    KeyColumnMissing { column: String, side: Side },

    #[error("primary key column '{0}' is also in the ignore set")]
    KeyColumnIgnored(String),

    #[error("policy references column '{0}' which exists in neither dataset")]
    UnknownPolicyColumn(String),

    #[error("{kind} tolerance for {scope} must be a non-negative number, got {value}")]
    InvalidTolerance {
        scope: String,
        kind: &'static str,
        value: f64,
    },

    #[error("decimal places for {scope} must be at most {max}, got {value}")]
    InvalidDecimalPlaces { scope: String, value: u32, max: u32 },

    #[error("no comparable columns remain after removing key and ignored columns")]
    NoComparableColumns,
}

/// A cell value that could not be coerced to its column's type
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("cannot coerce '{value}' to {column_type}: {reason}")]
pub struct NormalizationError {
    pub column_type: ColumnType,
    pub value: String,
    pub reason: String,
}

impl NormalizationError {
    pub fn new(column_type: ColumnType, value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            column_type,
            value: value.into(),
            reason: reason.into(),
        }
    }
}
