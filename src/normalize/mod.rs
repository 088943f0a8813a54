//! Value and header normalization

mod header;
mod value;

pub use header::{generalize_column_name, HeaderNormalizer};
pub use value::{normalize, Normalizer};
