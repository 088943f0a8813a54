//! Schema comparison logic

use serde::{Deserialize, Serialize};

use crate::model::{ColumnType, Dataset, Side};

/// Kinds of structural difference between the two schemas
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaMismatchKind {
    /// Column exists only in the given dataset
    OnlyIn { side: Side, index: usize },
    /// Column exists on both sides with different types
    TypeChanged {
        source_type: ColumnType,
        target_type: ColumnType,
    },
}

/// A structural difference for one column, recorded once per comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaMismatch {
    pub column: String,
    #[serde(flatten)]
    pub kind: SchemaMismatchKind,
}

impl SchemaMismatch {
    /// True when the column is missing from one side entirely
    pub fn is_missing_column(&self) -> bool {
        matches!(self.kind, SchemaMismatchKind::OnlyIn { .. })
    }
}

impl std::fmt::Display for SchemaMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            SchemaMismatchKind::OnlyIn {
                side: Side::Source,
                index,
            } => write!(f, "- {} (only in source, position {})", self.column, index),
            SchemaMismatchKind::OnlyIn {
                side: Side::Target,
                index,
            } => write!(f, "+ {} (only in target, position {})", self.column, index),
            SchemaMismatchKind::TypeChanged {
                source_type,
                target_type,
            } => write!(f, "~ {} (type {} → {})", self.column, source_type, target_type),
        }
    }
}

/// Schema comparison engine
pub struct SchemaDiff;

impl SchemaDiff {
    /// Compare the schemas of two datasets, skipping excluded (ignored) columns
    pub fn compare(source: &Dataset, target: &Dataset, excluded: &[String]) -> Vec<SchemaMismatch> {
        let mut mismatches = Vec::new();
        let is_excluded = |name: &str| excluded.iter().any(|e| e == name);

        // Columns only in source
        for col in &source.columns {
            if !is_excluded(&col.name) && target.column(&col.name).is_none() {
                mismatches.push(SchemaMismatch {
                    column: col.name.clone(),
                    kind: SchemaMismatchKind::OnlyIn {
                        side: Side::Source,
                        index: col.index,
                    },
                });
            }
        }

        // Columns only in target
        for col in &target.columns {
            if !is_excluded(&col.name) && source.column(&col.name).is_none() {
                mismatches.push(SchemaMismatch {
                    column: col.name.clone(),
                    kind: SchemaMismatchKind::OnlyIn {
                        side: Side::Target,
                        index: col.index,
                    },
                });
            }
        }

        // Type changes; an all-null column has no type to disagree with
        for src_col in &source.columns {
            if is_excluded(&src_col.name) {
                continue;
            }
            if let Some(tgt_col) = target.column(&src_col.name) {
                let (a, b) = (src_col.column_type, tgt_col.column_type);
                if a != b && a != ColumnType::Null && b != ColumnType::Null {
                    mismatches.push(SchemaMismatch {
                        column: src_col.name.clone(),
                        kind: SchemaMismatchKind::TypeChanged {
                            source_type: a,
                            target_type: b,
                        },
                    });
                }
            }
        }

        mismatches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Value;

    #[test]
    fn test_missing_and_type_changes() {
        let source = Dataset::from_rows(
            &["id", "legacy", "amount"],
            vec![vec![Value::Int(1), Value::from("x"), Value::Int(5)]],
        );
        let target = Dataset::from_rows(
            &["id", "amount", "note", "skip"],
            vec![vec![Value::Int(1), Value::Float(5.5), Value::from("n"), Value::Null]],
        );

        let mismatches = SchemaDiff::compare(&source, &target, &["skip".to_string()]);
        assert_eq!(mismatches.len(), 3);
        assert_eq!(mismatches[0].column, "legacy");
        assert!(mismatches[0].is_missing_column());
        assert_eq!(
            mismatches[1].kind,
            SchemaMismatchKind::OnlyIn { side: Side::Target, index: 2 }
        );
        assert_eq!(
            mismatches[2].kind,
            SchemaMismatchKind::TypeChanged {
                source_type: ColumnType::Int,
                target_type: ColumnType::Float
            }
        );
    }
}
