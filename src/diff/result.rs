//! Comparison result data model

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::ResultDetail;
use crate::model::{KeyTuple, Row};

use super::cell_diff::CellDiff;
use super::schema_diff::SchemaMismatch;

/// A row present on one side only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowRecord {
    pub key: KeyTuple,
    /// Position of the row in its own dataset
    pub index: usize,
    pub row: Row,
}

/// A matched row with at least one differing cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangedRow {
    pub key: KeyTuple,
    pub source_index: usize,
    pub source: Row,
    pub target: Row,
    pub diffs: Vec<CellDiff>,
}

/// A matched row with no differing cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnchangedRow {
    pub key: KeyTuple,
    pub source_index: usize,
    pub target_index: usize,
}

/// Outcome tag of a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowStatus {
    /// Key exists only in the target
    Added,
    /// Key exists only in the source
    Removed,
    /// Key in both, at least one differing column
    Changed,
    /// Key in both, no differing column
    Unchanged,
}

impl std::fmt::Display for RowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowStatus::Added => write!(f, "added"),
            RowStatus::Removed => write!(f, "removed"),
            RowStatus::Changed => write!(f, "changed"),
            RowStatus::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// A classified row, borrowed from a result
#[derive(Debug, Clone, Copy)]
pub enum RowClassification<'a> {
    Added(&'a RowRecord),
    Removed(&'a RowRecord),
    Changed(&'a ChangedRow),
    Unchanged(&'a UnchangedRow),
}

impl<'a> RowClassification<'a> {
    pub fn status(&self) -> RowStatus {
        match self {
            RowClassification::Added(_) => RowStatus::Added,
            RowClassification::Removed(_) => RowStatus::Removed,
            RowClassification::Changed(_) => RowStatus::Changed,
            RowClassification::Unchanged(_) => RowStatus::Unchanged,
        }
    }

    pub fn key(&self) -> &'a KeyTuple {
        match self {
            RowClassification::Added(r) | RowClassification::Removed(r) => &r.key,
            RowClassification::Changed(r) => &r.key,
            RowClassification::Unchanged(r) => &r.key,
        }
    }
}

/// Scalar counts of a comparison
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    pub source_rows: usize,
    pub target_rows: usize,
    pub added: usize,
    pub removed: usize,
    pub changed: usize,
    pub unchanged: usize,
    /// Matched pairs whose cells were compared
    pub compared: usize,
    pub cells_changed: usize,
    pub normalization_failures: usize,
}

impl ComparisonSummary {
    /// Check if there are any row-level differences
    pub fn has_differences(&self) -> bool {
        self.added > 0 || self.removed > 0 || self.changed > 0
    }
}

/// Changed/unchanged rows and counters for a run of matched pairs.
///
/// Partials over consecutive slices merge in slice order.
#[derive(Debug, Default)]
pub(crate) struct PairOutcome {
    pub changed: Vec<ChangedRow>,
    pub unchanged: Vec<UnchangedRow>,
    pub column_counts: Vec<usize>,
    pub changed_count: usize,
    pub unchanged_count: usize,
    pub cells_changed: usize,
    pub normalization_failures: usize,
}

impl PairOutcome {
    pub fn new(column_count: usize) -> Self {
        Self {
            column_counts: vec![0; column_count],
            ..Default::default()
        }
    }

    pub fn merge(&mut self, other: PairOutcome) {
        self.changed.extend(other.changed);
        self.unchanged.extend(other.unchanged);
        for (total, count) in self.column_counts.iter_mut().zip(other.column_counts) {
            *total += count;
        }
        self.changed_count += other.changed_count;
        self.unchanged_count += other.unchanged_count;
        self.cells_changed += other.cells_changed;
        self.normalization_failures += other.normalization_failures;
    }
}

/// Immutable result of one comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    key_columns: Vec<String>,
    compared_columns: Vec<String>,
    source_columns: Vec<String>,
    target_columns: Vec<String>,
    detail: ResultDetail,
    added: Vec<RowRecord>,
    removed: Vec<RowRecord>,
    changed: Vec<ChangedRow>,
    unchanged: Vec<UnchangedRow>,
    column_mismatches: IndexMap<String, usize>,
    schema_mismatches: Vec<SchemaMismatch>,
    summary: ComparisonSummary,
}

/// Parts the engine assembles a result from
pub(crate) struct ResultParts {
    pub key_columns: Vec<String>,
    pub compared_columns: Vec<String>,
    pub source_columns: Vec<String>,
    pub target_columns: Vec<String>,
    pub detail: ResultDetail,
    pub added: Vec<RowRecord>,
    pub removed: Vec<RowRecord>,
    pub added_count: usize,
    pub removed_count: usize,
    pub pairs: PairOutcome,
    pub schema_mismatches: Vec<SchemaMismatch>,
    pub source_rows: usize,
    pub target_rows: usize,
}

impl ComparisonResult {
    pub(crate) fn from_parts(parts: ResultParts) -> Self {
        let column_mismatches = parts
            .compared_columns
            .iter()
            .cloned()
            .zip(parts.pairs.column_counts.iter().copied())
            .collect();

        let summary = ComparisonSummary {
            source_rows: parts.source_rows,
            target_rows: parts.target_rows,
            added: parts.added_count,
            removed: parts.removed_count,
            changed: parts.pairs.changed_count,
            unchanged: parts.pairs.unchanged_count,
            compared: parts.pairs.changed_count + parts.pairs.unchanged_count,
            cells_changed: parts.pairs.cells_changed,
            normalization_failures: parts.pairs.normalization_failures,
        };

        Self {
            key_columns: parts.key_columns,
            compared_columns: parts.compared_columns,
            source_columns: parts.source_columns,
            target_columns: parts.target_columns,
            detail: parts.detail,
            added: parts.added,
            removed: parts.removed,
            changed: parts.pairs.changed,
            unchanged: parts.pairs.unchanged,
            column_mismatches,
            schema_mismatches: parts.schema_mismatches,
            summary,
        }
    }

    /// Primary-key column names
    pub fn key_columns(&self) -> &[String] {
        &self.key_columns
    }

    /// Columns whose cells were compared
    pub fn compared_columns(&self) -> &[String] {
        &self.compared_columns
    }

    /// Source schema, for rendering removed rows
    pub fn source_columns(&self) -> &[String] {
        &self.source_columns
    }

    /// Target schema, for rendering added rows
    pub fn target_columns(&self) -> &[String] {
        &self.target_columns
    }

    pub fn detail(&self) -> ResultDetail {
        self.detail
    }

    /// Rows only in the target, in target order
    pub fn added(&self) -> &[RowRecord] {
        &self.added
    }

    /// Rows only in the source, in source order
    pub fn removed(&self) -> &[RowRecord] {
        &self.removed
    }

    /// Changed rows with their cell diffs, in source order
    pub fn changed(&self) -> &[ChangedRow] {
        &self.changed
    }

    /// Unchanged rows in source order; empty in summary-only mode
    pub fn unchanged(&self) -> &[UnchangedRow] {
        &self.unchanged
    }

    pub fn unchanged_count(&self) -> usize {
        self.summary.unchanged
    }

    /// Mismatch count per compared column, in column order
    pub fn column_mismatches(&self) -> &IndexMap<String, usize> {
        &self.column_mismatches
    }

    pub fn mismatch_count(&self, column: &str) -> usize {
        self.column_mismatches.get(column).copied().unwrap_or(0)
    }

    pub fn schema_mismatches(&self) -> &[SchemaMismatch] {
        &self.schema_mismatches
    }

    pub fn summary(&self) -> &ComparisonSummary {
        &self.summary
    }

    /// Check if there are any row or schema differences
    pub fn has_differences(&self) -> bool {
        self.summary.has_differences()
            || self.schema_mismatches.iter().any(SchemaMismatch::is_missing_column)
    }

    /// Every retained row: source-side rows in source order, then added rows in target order
    pub fn classifications(&self) -> impl Iterator<Item = RowClassification<'_>> {
        let mut source_side: Vec<(usize, RowClassification<'_>)> = self
            .removed
            .iter()
            .map(|r| (r.index, RowClassification::Removed(r)))
            .chain(
                self.changed
                    .iter()
                    .map(|r| (r.source_index, RowClassification::Changed(r))),
            )
            .chain(
                self.unchanged
                    .iter()
                    .map(|r| (r.source_index, RowClassification::Unchanged(r))),
            )
            .collect();
        source_side.sort_by_key(|(index, _)| *index);

        source_side
            .into_iter()
            .map(|(_, c)| c)
            .chain(self.added.iter().map(RowClassification::Added))
    }
}
