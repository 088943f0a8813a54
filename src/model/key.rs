//! Composite primary-key tuples

use serde::{Deserialize, Serialize};

use super::canonical::Canonical;

/// Normalized values of the primary-key columns of one row
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyTuple(pub Vec<Canonical>);

impl KeyTuple {
    /// Create a key tuple from its component values
    pub fn new(values: Vec<Canonical>) -> Self {
        Self(values)
    }

    /// The component values in key-column order
    pub fn values(&self) -> &[Canonical] {
        &self.0
    }

    /// Render as `col=value` pairs for diagnostics
    pub fn describe(&self, key_columns: &[String]) -> String {
        key_columns
            .iter()
            .zip(&self.0)
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::fmt::Display for KeyTuple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<_> = self.0.iter().map(|v| v.display().into_owned()).collect();
        write!(f, "{}", parts.join("|"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_describe() {
        let key = KeyTuple::new(vec![Canonical::Int(7), Canonical::Text("EU".into())]);
        assert_eq!(key.to_string(), "7|EU");
        assert_eq!(
            key.describe(&["id".to_string(), "region".to_string()]),
            "id=7, region=EU"
        );
    }
}
