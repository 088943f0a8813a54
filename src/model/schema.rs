//! Column metadata and type information

use serde::{Deserialize, Serialize};

/// Declared or inferred type of a column
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ColumnType {
    #[default]
    Null,
    Bool,
    Int,
    Float,
    String,
    Date,
    DateTime,
    Mixed,
}

impl ColumnType {
    /// Widen the type to accommodate another type
    pub fn widen(self, other: ColumnType) -> ColumnType {
        if self == other {
            return self;
        }

        match (self, other) {
            (ColumnType::Null, t) | (t, ColumnType::Null) => t,
            (ColumnType::Int, ColumnType::Float) | (ColumnType::Float, ColumnType::Int) => {
                ColumnType::Float
            }
            (ColumnType::Date, ColumnType::DateTime) | (ColumnType::DateTime, ColumnType::Date) => {
                ColumnType::DateTime
            }
            _ => ColumnType::Mixed,
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnType::Null => write!(f, "null"),
            ColumnType::Bool => write!(f, "bool"),
            ColumnType::Int => write!(f, "int"),
            ColumnType::Float => write!(f, "float"),
            ColumnType::String => write!(f, "string"),
            ColumnType::Date => write!(f, "date"),
            ColumnType::DateTime => write!(f, "datetime"),
            ColumnType::Mixed => write!(f, "mixed"),
        }
    }
}

impl std::str::FromStr for ColumnType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "null" => Ok(ColumnType::Null),
            "bool" | "boolean" => Ok(ColumnType::Bool),
            "int" | "integer" => Ok(ColumnType::Int),
            "float" | "double" | "decimal" => Ok(ColumnType::Float),
            "string" | "text" => Ok(ColumnType::String),
            "date" => Ok(ColumnType::Date),
            "datetime" | "timestamp" => Ok(ColumnType::DateTime),
            "mixed" | "any" => Ok(ColumnType::Mixed),
            _ => Err(format!("Unknown column type: {}", s)),
        }
    }
}

impl TryFrom<String> for ColumnType {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ColumnType> for String {
    fn from(t: ColumnType) -> Self {
        t.to_string()
    }
}

/// Column metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name (from header)
    pub name: String,
    /// Column index (0-based position)
    pub index: usize,
    /// Declared or inferred type
    pub column_type: ColumnType,
}

impl Column {
    /// Create a new untyped column
    pub fn new(name: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            index,
            column_type: ColumnType::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widen() {
        assert_eq!(ColumnType::Null.widen(ColumnType::Int), ColumnType::Int);
        assert_eq!(ColumnType::Int.widen(ColumnType::Float), ColumnType::Float);
        assert_eq!(ColumnType::Date.widen(ColumnType::DateTime), ColumnType::DateTime);
        assert_eq!(ColumnType::String.widen(ColumnType::Int), ColumnType::Mixed);
    }

    #[test]
    fn test_parse_type_aliases() {
        assert_eq!("integer".parse::<ColumnType>(), Ok(ColumnType::Int));
        assert_eq!("Timestamp".parse::<ColumnType>(), Ok(ColumnType::DateTime));
        assert!("blob".parse::<ColumnType>().is_err());
    }
}
