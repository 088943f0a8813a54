//! Comparison engine for keyed datasets

pub mod cell_diff;
mod plan;
mod result;
mod row_diff;
mod schema_diff;

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::config::{CompareConfig, ResultDetail};
use crate::error::Result;
use crate::model::Dataset;

pub use cell_diff::{CellComparator, CellDiff, CellDiffKind};
pub use plan::{ColumnPlan, ComparisonPlan};
pub use result::{
    ChangedRow, ComparisonResult, ComparisonSummary, RowClassification, RowRecord, RowStatus,
    UnchangedRow,
};
pub use row_diff::{KeyBuilder, KeyedRow, MatchOutput, MatchedPair, RowMatcher};
pub use schema_diff::{SchemaDiff, SchemaMismatch, SchemaMismatchKind};

use result::{PairOutcome, ResultParts};

/// Matched pairs per parallel work unit
const PARALLEL_CHUNK_SIZE: usize = 1024;

/// Main comparison engine
pub struct ComparisonEngine {
    config: CompareConfig,
}

impl ComparisonEngine {
    /// Create a new engine with configuration
    pub fn new(config: CompareConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompareConfig {
        &self.config
    }

    /// Compare a source dataset with a target dataset.
    ///
    /// Configuration problems and duplicate keys abort before any result is
    /// built; cells that fail normalization are recorded in the result.
    pub fn compare(&self, source: &Dataset, target: &Dataset) -> Result<ComparisonResult> {
        let plan = ComparisonPlan::resolve(source, target, &self.config)?;
        let key_columns = plan.key_names();

        info!(
            "Comparing {} source rows with {} target rows on key [{}]",
            source.row_count(),
            target.row_count(),
            key_columns.join(", ")
        );
        for mismatch in &plan.schema_mismatches {
            warn!("Schema mismatch: {}", mismatch);
        }

        let matcher = RowMatcher::new(&plan.key_columns, self.config.reject_null_keys);
        let matches = matcher.match_rows(source, target)?;

        let comparator = CellComparator::new(&plan.compared_columns);
        let pairs = self.compare_pairs(&comparator, &matches.matched);

        if pairs.normalization_failures > 0 {
            warn!(
                "{} cells could not be normalized to their column type",
                pairs.normalization_failures
            );
        }

        let keep_rows = self.config.detail == ResultDetail::Full;
        let to_records = |rows: Vec<KeyedRow<'_>>| -> Vec<RowRecord> {
            if !keep_rows {
                return Vec::new();
            }
            rows.into_iter()
                .map(|r| RowRecord {
                    key: r.key,
                    index: r.index,
                    row: r.row.clone(),
                })
                .collect()
        };

        let removed_count = matches.source_only.len();
        let added_count = matches.target_only.len();

        let result = ComparisonResult::from_parts(ResultParts {
            key_columns,
            compared_columns: plan.compared_names(),
            source_columns: source.column_names(),
            target_columns: target.column_names(),
            detail: self.config.detail,
            removed: to_records(matches.source_only),
            added: to_records(matches.target_only),
            added_count,
            removed_count,
            pairs,
            schema_mismatches: plan.schema_mismatches,
            source_rows: source.row_count(),
            target_rows: target.row_count(),
        });

        let summary = result.summary();
        info!(
            "Comparison finished: +{} added, -{} removed, ~{} changed, {} unchanged",
            summary.added, summary.removed, summary.changed, summary.unchanged
        );

        Ok(result)
    }

    /// Compare every matched pair, in parallel above the configured threshold
    fn compare_pairs(&self, comparator: &CellComparator<'_>, pairs: &[MatchedPair<'_>]) -> PairOutcome {
        let column_count = comparator.columns().len();
        let detail = self.config.detail;

        let parallel = self
            .config
            .parallel_threshold
            .is_some_and(|threshold| pairs.len() >= threshold);

        if !parallel {
            return compare_chunk(comparator, pairs, detail, column_count);
        }

        debug!(
            "Comparing {} matched pairs in parallel chunks of {}",
            pairs.len(),
            PARALLEL_CHUNK_SIZE
        );

        // collect() keeps chunk order, so merged rows stay in source order
        let partials: Vec<PairOutcome> = pairs
            .par_chunks(PARALLEL_CHUNK_SIZE)
            .map(|chunk| compare_chunk(comparator, chunk, detail, column_count))
            .collect();

        partials
            .into_iter()
            .fold(PairOutcome::new(column_count), |mut acc, partial| {
                acc.merge(partial);
                acc
            })
    }
}

fn compare_chunk(
    comparator: &CellComparator<'_>,
    pairs: &[MatchedPair<'_>],
    detail: ResultDetail,
    column_count: usize,
) -> PairOutcome {
    let mut outcome = PairOutcome::new(column_count);
    let keep_rows = detail == ResultDetail::Full;

    for pair in pairs {
        let diffs = comparator.compare_row(pair.source, pair.target);

        if diffs.is_empty() {
            outcome.unchanged_count += 1;
            if keep_rows {
                outcome.unchanged.push(UnchangedRow {
                    key: pair.key.clone(),
                    source_index: pair.source_index,
                    target_index: pair.target_index,
                });
            }
            continue;
        }

        outcome.changed_count += 1;
        outcome.cells_changed += diffs.len();
        for diff in &diffs {
            outcome.column_counts[diff.column_index] += 1;
            if diff.is_unnormalizable() {
                outcome.normalization_failures += 1;
            }
        }

        if keep_rows {
            outcome.changed.push(ChangedRow {
                key: pair.key.clone(),
                source_index: pair.source_index,
                source: pair.source.clone(),
                target: pair.target.clone(),
                diffs,
            });
        }
    }

    outcome
}

/// Convenience function to run a comparison
pub fn compare(source: &Dataset, target: &Dataset, config: &CompareConfig) -> Result<ComparisonResult> {
    ComparisonEngine::new(config.clone()).compare(source, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColumnPolicy;
    use crate::error::CompareError;
    use crate::model::{Canonical, Value};

    fn people(rows: Vec<(i64, &str, i64)>) -> Dataset {
        Dataset::from_rows(
            &["id", "name", "age"],
            rows.into_iter()
                .map(|(id, name, age)| vec![Value::Int(id), Value::from(name), Value::Int(age)])
                .collect(),
        )
    }

    #[test]
    fn test_added_removed_changed() {
        let source = people(vec![(1, "Alice", 30), (2, "Bob", 25)]);
        let target = people(vec![(1, "Alice", 31), (3, "Carl", 40)]);

        let result = compare(&source, &target, &CompareConfig::new(["id"])).unwrap();

        let summary = result.summary();
        assert_eq!((summary.added, summary.removed, summary.changed, summary.unchanged), (1, 1, 1, 0));
        assert_eq!(result.removed()[0].key.to_string(), "2");
        assert_eq!(result.added()[0].key.to_string(), "3");

        let changed = &result.changed()[0];
        assert_eq!(changed.key.to_string(), "1");
        assert_eq!(changed.diffs.len(), 1);
        assert_eq!(changed.diffs[0].column, "age");
        assert_eq!(changed.diffs[0].source, Some(Canonical::Int(30)));
        assert_eq!(changed.diffs[0].target, Some(Canonical::Int(31)));
        assert_eq!(result.mismatch_count("age"), 1);
        assert_eq!(result.mismatch_count("name"), 0);
    }

    #[test]
    fn test_classifications_order() {
        let source = people(vec![(1, "A", 1), (2, "B", 2), (3, "C", 3)]);
        let target = people(vec![(9, "Z", 9), (3, "C", 4), (1, "A", 1)]);

        let result = compare(&source, &target, &CompareConfig::new(["id"])).unwrap();
        let order: Vec<_> = result
            .classifications()
            .map(|c| format!("{}:{}", c.status(), c.key()))
            .collect();
        assert_eq!(order, vec!["unchanged:1", "removed:2", "changed:3", "added:9"]);
    }

    #[test]
    fn test_summary_only_keeps_counts() {
        let source = people(vec![(1, "Alice", 30), (2, "Bob", 25)]);
        let target = people(vec![(1, "Alice", 31), (3, "Carl", 40)]);
        let config = CompareConfig::new(["id"]).with_detail(ResultDetail::SummaryOnly);

        let result = compare(&source, &target, &config).unwrap();
        assert!(result.added().is_empty());
        assert!(result.changed().is_empty());
        assert_eq!(result.summary().changed, 1);
        assert_eq!(result.summary().added, 1);
        assert_eq!(result.mismatch_count("age"), 1);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let rows: Vec<_> = (0..5000).map(|i| (i, "n", i % 7)).collect();
        let changed: Vec<_> = (0..5000).map(|i| (i, "n", if i % 3 == 0 { i % 7 + 1 } else { i % 7 })).collect();
        let source = people(rows);
        let target = people(changed);

        let sequential = CompareConfig::new(["id"]).with_parallel_threshold(None);
        let parallel = CompareConfig::new(["id"]).with_parallel_threshold(Some(1));

        let a = compare(&source, &target, &sequential).unwrap();
        let b = compare(&source, &target, &parallel).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.summary().changed, 1667);
    }

    #[test]
    fn test_configuration_error_aborts() {
        let source = people(vec![(1, "Alice", 30)]);
        let config = CompareConfig::new(["id"]).with_column_policy("missing", ColumnPolicy::new());
        let err = compare(&source, &source, &config).unwrap_err();
        assert!(matches!(err, CompareError::Configuration(_)));
    }
}
