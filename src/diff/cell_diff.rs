//! Cell-level comparison logic

use serde::{Deserialize, Serialize};

use crate::config::ColumnPolicy;
use crate::model::{Canonical, Row, Value};

use super::plan::ColumnPlan;

/// Denominator floor for relative tolerance
const RELATIVE_EPSILON: f64 = 1e-12;

/// Why a cell was reported
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CellDiffKind {
    /// Both values normalized and differ
    Value,
    /// At least one value could not be coerced to the column type
    Unnormalizable {
        #[serde(skip_serializing_if = "Option::is_none")]
        source_error: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        target_error: Option<String>,
    },
}

/// A differing cell of a changed row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellDiff {
    /// Column name
    pub column: String,
    /// Position among the compared columns
    pub column_index: usize,
    #[serde(flatten)]
    pub kind: CellDiffKind,
    /// Normalized source value, absent if normalization failed
    pub source: Option<Canonical>,
    /// Normalized target value, absent if normalization failed
    pub target: Option<Canonical>,
    /// Raw source value, `None` when the row has no such cell
    pub source_raw: Option<Value>,
    /// Raw target value, `None` when the row has no such cell
    pub target_raw: Option<Value>,
}

impl CellDiff {
    pub fn is_unnormalizable(&self) -> bool {
        matches!(self.kind, CellDiffKind::Unnormalizable { .. })
    }
}

/// Compares the cells of matched rows column by column
pub struct CellComparator<'p> {
    columns: &'p [ColumnPlan],
}

impl<'p> CellComparator<'p> {
    /// Create a comparator over the resolved comparable columns
    pub fn new(columns: &'p [ColumnPlan]) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[ColumnPlan] {
        self.columns
    }

    /// Compare two rows, returning the differing cells (empty when unchanged)
    pub fn compare_row(&self, source: &Row, target: &Row) -> Vec<CellDiff> {
        let mut diffs = Vec::new();

        for (column_index, col) in self.columns.iter().enumerate() {
            let source_raw = source.get(col.source_index);
            let target_raw = target.get(col.target_index);

            match (
                col.normalizer.normalize(source_raw),
                col.normalizer.normalize(target_raw),
            ) {
                (Ok(a), Ok(b)) => {
                    if !values_equal(&a, &b, col.policy()) {
                        diffs.push(CellDiff {
                            column: col.name.clone(),
                            column_index,
                            kind: CellDiffKind::Value,
                            source: Some(a),
                            target: Some(b),
                            source_raw: source_raw.cloned(),
                            target_raw: target_raw.cloned(),
                        });
                    }
                }
                (source_norm, target_norm) => {
                    diffs.push(CellDiff {
                        column: col.name.clone(),
                        column_index,
                        kind: CellDiffKind::Unnormalizable {
                            source_error: source_norm.as_ref().err().map(|e| e.to_string()),
                            target_error: target_norm.as_ref().err().map(|e| e.to_string()),
                        },
                        source: source_norm.ok(),
                        target: target_norm.ok(),
                        source_raw: source_raw.cloned(),
                        target_raw: target_raw.cloned(),
                    });
                }
            }
        }

        diffs
    }
}

/// Equality of two canonical values under a column policy
pub fn values_equal(a: &Canonical, b: &Canonical, policy: &ColumnPolicy) -> bool {
    match (a.is_absent(), b.is_absent()) {
        (true, true) => return true,
        (true, false) => {
            return policy.absent_equals_default
                && default_like(b).is_some_and(|d| present_equal(&d, b, policy))
        }
        (false, true) => {
            return policy.absent_equals_default
                && default_like(a).is_some_and(|d| present_equal(a, &d, policy))
        }
        (false, false) => {}
    }
    present_equal(a, b, policy)
}

fn present_equal(a: &Canonical, b: &Canonical, policy: &ColumnPolicy) -> bool {
    match (a, b) {
        (Canonical::Int(x), Canonical::Int(y)) => integers_equal(*x, *y, policy),
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => numbers_equal(x, y, policy),
            _ => a == b,
        },
    }
}

/// The type default standing in for an absent value next to `present`
fn default_like(present: &Canonical) -> Option<Canonical> {
    match present {
        Canonical::Int(_) => Some(Canonical::Int(0)),
        Canonical::Float(_) => Some(Canonical::Float(0.0)),
        Canonical::Text(_) => Some(Canonical::Text(String::new())),
        Canonical::Bool(_) => Some(Canonical::Bool(false)),
        _ => None,
    }
}

/// Tolerance-bounded numeric equality; exact when no tolerance is set
pub fn numbers_equal(a: f64, b: f64, policy: &ColumnPolicy) -> bool {
    if a.is_nan() || b.is_nan() {
        return a.is_nan() && b.is_nan();
    }
    if a == b {
        return true;
    }

    let delta = (a - b).abs();
    if policy.absolute_tolerance.is_some_and(|tol| delta <= tol) {
        return true;
    }
    let scale = a.abs().max(b.abs()).max(RELATIVE_EPSILON);
    policy.relative_tolerance.is_some_and(|tol| delta / scale <= tol)
}

/// Tolerance-bounded integer equality, exact at any magnitude
pub fn integers_equal(a: i64, b: i64, policy: &ColumnPolicy) -> bool {
    let delta = a.abs_diff(b);
    if delta == 0 {
        return true;
    }

    // delta is integral, so comparing against the floored tolerance is exact
    if policy
        .absolute_tolerance
        .is_some_and(|tol| delta <= tol.floor() as u64)
    {
        return true;
    }
    let scale = a.unsigned_abs().max(b.unsigned_abs()) as f64;
    policy
        .relative_tolerance
        .is_some_and(|tol| delta as f64 / scale <= tol)
}

/// Calculate percentage change for numeric values
pub fn percentage_change(old: &Canonical, new: &Canonical) -> Option<f64> {
    let old_num = old.as_f64()?;
    let new_num = new.as_f64()?;

    if old_num == 0.0 {
        if new_num == 0.0 {
            Some(0.0)
        } else {
            None // Infinite change
        }
    } else {
        Some((new_num - old_num) / old_num * 100.0)
    }
}
