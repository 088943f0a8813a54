//! Configuration handling for comparisons

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::ColumnType;

/// Output format for comparison reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Terminal,
    Json,
    Html,
    /// Binary workbook; written to a file, never to a terminal
    Xlsx,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "terminal" => Ok(OutputFormat::Terminal),
            "json" => Ok(OutputFormat::Json),
            "html" => Ok(OutputFormat::Html),
            "xlsx" | "excel" => Ok(OutputFormat::Xlsx),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// How null-like representations relate to each other
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullHandling {
    /// Null, empty strings, NaN and null markers are all the same absent value
    #[default]
    Unified,
    /// Only explicit nulls and missing cells are absent
    Distinct,
}

/// Precision at which temporal values are compared
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemporalPrecision {
    Day,
    Minute,
    Second,
    #[default]
    Full,
}

/// What to do with a value that cannot be coerced to its column type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoercionFallback {
    /// Record the cell as unnormalizable
    #[default]
    Error,
    /// Compare the raw value as text
    CompareRaw,
}

fn default_null_markers() -> Vec<String> {
    ["null", "none", "n/a", "nan"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Most decimal places a float can be rounded to; f64 keeps ~15 significant digits
pub const MAX_DECIMAL_PLACES: u32 = 15;

/// Normalization and equality rules for one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnPolicy {
    /// Ignore leading/trailing whitespace in string values
    pub ignore_whitespace: bool,
    /// Collapse runs of internal whitespace to one space
    pub collapse_whitespace: bool,
    /// Ignore case when comparing string values
    pub ignore_case: bool,
    /// Maximum absolute difference for numeric equality
    pub absolute_tolerance: Option<f64>,
    /// Maximum relative difference for numeric equality
    pub relative_tolerance: Option<f64>,
    /// Round floats to this many decimal places before comparing, at most
    /// [`MAX_DECIMAL_PLACES`]
    pub decimal_places: Option<u32>,
    /// Truncation applied to dates and timestamps
    pub temporal_precision: TemporalPrecision,
    pub null_handling: NullHandling,
    /// Strings treated as null (case-insensitive) under unified null handling
    pub null_markers: Vec<String>,
    /// Treat an absent value as the type's default (0, "", false)
    pub absent_equals_default: bool,
    pub on_coercion_failure: CoercionFallback,
}

impl Default for ColumnPolicy {
    fn default() -> Self {
        Self {
            ignore_whitespace: false,
            collapse_whitespace: false,
            ignore_case: false,
            absolute_tolerance: None,
            relative_tolerance: None,
            decimal_places: None,
            temporal_precision: TemporalPrecision::default(),
            null_handling: NullHandling::default(),
            null_markers: default_null_markers(),
            absent_equals_default: false,
            on_coercion_failure: CoercionFallback::default(),
        }
    }
}

impl ColumnPolicy {
    /// Create the default (exact) policy
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable whitespace-insensitive comparison
    pub fn with_ignore_whitespace(mut self, ignore: bool) -> Self {
        self.ignore_whitespace = ignore;
        self
    }

    /// Collapse internal whitespace runs
    pub fn with_collapse_whitespace(mut self, collapse: bool) -> Self {
        self.collapse_whitespace = collapse;
        self
    }

    /// Enable case-insensitive comparison
    pub fn with_ignore_case(mut self, ignore: bool) -> Self {
        self.ignore_case = ignore;
        self
    }

    /// Set absolute numeric tolerance
    pub fn with_absolute_tolerance(mut self, tolerance: f64) -> Self {
        self.absolute_tolerance = Some(tolerance);
        self
    }

    /// Set relative numeric tolerance
    pub fn with_relative_tolerance(mut self, tolerance: f64) -> Self {
        self.relative_tolerance = Some(tolerance);
        self
    }

    /// Round floats before comparing
    pub fn with_decimal_places(mut self, places: u32) -> Self {
        self.decimal_places = Some(places);
        self
    }

    /// Set temporal precision
    pub fn with_temporal_precision(mut self, precision: TemporalPrecision) -> Self {
        self.temporal_precision = precision;
        self
    }

    /// Set null handling
    pub fn with_null_handling(mut self, handling: NullHandling) -> Self {
        self.null_handling = handling;
        self
    }

    /// Replace the null markers
    pub fn with_null_markers(mut self, markers: Vec<String>) -> Self {
        self.null_markers = markers;
        self
    }

    /// Treat absent values as the type default
    pub fn with_absent_equals_default(mut self, enabled: bool) -> Self {
        self.absent_equals_default = enabled;
        self
    }

    /// Set the coercion fallback
    pub fn with_coercion_fallback(mut self, fallback: CoercionFallback) -> Self {
        self.on_coercion_failure = fallback;
        self
    }
}

/// How much row detail a result keeps
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultDetail {
    /// Keep every classified row
    #[default]
    Full,
    /// Keep only counts and column statistics
    SummaryOnly,
}

/// Default matched-pair count above which cell comparison runs in parallel
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 10_000;

fn default_parallel_threshold() -> Option<usize> {
    Some(DEFAULT_PARALLEL_THRESHOLD)
}

/// Configuration for one comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    /// Columns to use as primary key for row matching
    pub primary_key: Vec<String>,
    /// Columns to ignore in comparison
    pub ignore_columns: Vec<String>,
    /// Policy for columns without a column or type policy
    pub default_policy: ColumnPolicy,
    /// Per-type default policies
    pub type_policies: IndexMap<ColumnType, ColumnPolicy>,
    /// Per-column policies
    pub column_policies: IndexMap<String, ColumnPolicy>,
    /// Row detail kept in the result
    pub detail: ResultDetail,
    /// Matched-pair count from which comparison is parallelized; `None` disables
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: Option<usize>,
    /// Fail on any null primary-key cell instead of treating null as a key value
    pub reject_null_keys: bool,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            primary_key: Vec::new(),
            ignore_columns: Vec::new(),
            default_policy: ColumnPolicy::default(),
            type_policies: IndexMap::new(),
            column_policies: IndexMap::new(),
            detail: ResultDetail::default(),
            parallel_threshold: default_parallel_threshold(),
            reject_null_keys: false,
        }
    }
}

impl CompareConfig {
    /// Create a new config keyed by the given columns
    pub fn new<S: Into<String>>(primary_key: impl IntoIterator<Item = S>) -> Self {
        Self {
            primary_key: primary_key.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Parse a config from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse comparison config")
    }

    /// Set columns to ignore
    pub fn with_ignore_columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.ignore_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Set the fallback policy
    pub fn with_default_policy(mut self, policy: ColumnPolicy) -> Self {
        self.default_policy = policy;
        self
    }

    /// Set the default policy for every column of a type
    pub fn with_type_policy(mut self, column_type: ColumnType, policy: ColumnPolicy) -> Self {
        self.type_policies.insert(column_type, policy);
        self
    }

    /// Set the policy of a single column
    pub fn with_column_policy(mut self, column: impl Into<String>, policy: ColumnPolicy) -> Self {
        self.column_policies.insert(column.into(), policy);
        self
    }

    /// Set result detail
    pub fn with_detail(mut self, detail: ResultDetail) -> Self {
        self.detail = detail;
        self
    }

    /// Set the parallel threshold
    pub fn with_parallel_threshold(mut self, threshold: Option<usize>) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// Reject null primary-key cells
    pub fn with_reject_null_keys(mut self, reject: bool) -> Self {
        self.reject_null_keys = reject;
        self
    }

    /// Check whether a column is excluded from comparison
    pub fn is_ignored(&self, column: &str) -> bool {
        self.ignore_columns.iter().any(|c| c == column)
    }

    /// Resolve the policy of a column: column policy, then type policy, then default
    pub fn policy_for(&self, column: &str, column_type: ColumnType) -> &ColumnPolicy {
        self.column_policies
            .get(column)
            .or_else(|| self.type_policies.get(&column_type))
            .unwrap_or(&self.default_policy)
    }
}
