//! tabcompare - Key-aligned comparison of tabular datasets
//!
//! Aligns a source and a target dataset on a primary key, normalizes cell
//! values for tolerant comparison and reports added, removed and changed rows
//! together with per-column mismatch statistics.

pub mod config;
pub mod diff;
pub mod error;
pub mod model;
pub mod normalize;
pub mod output;
pub mod session;
pub mod source;

pub use config::{ColumnPolicy, CompareConfig};
pub use diff::{compare, ComparisonEngine, ComparisonResult};
pub use error::{CompareError, ConfigurationError, NormalizationError};
pub use model::{Dataset, Value};
