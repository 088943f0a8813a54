//! Data model for tabular data representation

mod canonical;
mod dataset;
mod key;
mod schema;
mod value;

pub use canonical::Canonical;
pub use dataset::{Dataset, Row, Side};
pub use key::KeyTuple;
pub use schema::{Column, ColumnType};
pub use value::Value;
