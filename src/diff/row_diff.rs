//! Row matching algorithm

use std::collections::hash_map::Entry;

use log::debug;
use rustc_hash::FxHashMap;

use crate::error::{CompareError, Result};
use crate::model::{Canonical, Dataset, KeyTuple, Row, Side};

use super::plan::ColumnPlan;

/// A row together with its key and its position in its dataset
#[derive(Debug, Clone)]
pub struct KeyedRow<'a> {
    pub key: KeyTuple,
    pub index: usize,
    pub row: &'a Row,
}

/// A source row and a target row sharing one key
#[derive(Debug, Clone)]
pub struct MatchedPair<'a> {
    pub key: KeyTuple,
    pub source_index: usize,
    pub target_index: usize,
    pub source: &'a Row,
    pub target: &'a Row,
}

/// Rows partitioned by key alignment
#[derive(Debug, Default)]
pub struct MatchOutput<'a> {
    /// In source order
    pub matched: Vec<MatchedPair<'a>>,
    /// In source order
    pub source_only: Vec<KeyedRow<'a>>,
    /// In target order
    pub target_only: Vec<KeyedRow<'a>>,
}

/// Builds normalized key tuples for rows of either side
pub struct KeyBuilder<'p> {
    columns: &'p [ColumnPlan],
}

impl<'p> KeyBuilder<'p> {
    pub fn new(columns: &'p [ColumnPlan]) -> Self {
        Self { columns }
    }

    /// Build the key of a row. A key cell that cannot be coerced keys on its raw text.
    pub fn build_key(&self, row: &Row, side: Side) -> KeyTuple {
        KeyTuple::new(
            self.columns
                .iter()
                .map(|col| {
                    let raw = row.get(col.index(side));
                    col.normalizer.normalize(raw).unwrap_or_else(|_| {
                        raw.map(|v| Canonical::Text(v.display().into_owned()))
                            .unwrap_or(Canonical::Absent)
                    })
                })
                .collect(),
        )
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

/// Row matcher using hash-based lookup
pub struct RowMatcher<'p> {
    keys: KeyBuilder<'p>,
    reject_null_keys: bool,
}

impl<'p> RowMatcher<'p> {
    /// Create a new row matcher over the resolved key columns
    pub fn new(key_columns: &'p [ColumnPlan], reject_null_keys: bool) -> Self {
        Self {
            keys: KeyBuilder::new(key_columns),
            reject_null_keys,
        }
    }

    fn key_for(&self, row: &Row, side: Side) -> Result<KeyTuple> {
        let key = self.keys.build_key(row, side);
        if self.reject_null_keys && key.values().iter().any(Canonical::is_absent) {
            return Err(CompareError::NullKey {
                side,
                line: row.source_line,
            });
        }
        Ok(key)
    }

    fn duplicate(&self, side: Side, key: KeyTuple, first: &Row, duplicate: &Row) -> CompareError {
        CompareError::DuplicateKey {
            side,
            key,
            key_columns: self.keys.column_names(),
            first_line: first.source_line,
            duplicate_line: duplicate.source_line,
        }
    }

    /// Partition rows into matched pairs, source-only and target-only rows.
    ///
    /// The target is indexed in one pass, then the source is scanned once.
    /// A key repeated within either dataset fails with `DuplicateKey`.
    pub fn match_rows<'a>(&self, source: &'a Dataset, target: &'a Dataset) -> Result<MatchOutput<'a>> {
        let target_keys = target
            .rows
            .iter()
            .map(|row| self.key_for(row, Side::Target))
            .collect::<Result<Vec<_>>>()?;

        let mut index: FxHashMap<&KeyTuple, usize> = FxHashMap::default();
        index.reserve(target_keys.len());
        for (i, key) in target_keys.iter().enumerate() {
            match index.entry(key) {
                Entry::Occupied(e) => {
                    let first = &target.rows[*e.get()];
                    return Err(self.duplicate(Side::Target, key.clone(), first, &target.rows[i]));
                }
                Entry::Vacant(e) => {
                    e.insert(i);
                }
            }
        }
        debug!("Indexed {} target rows", index.len());

        // Source row that consumed each target row
        let mut consumed_by: Vec<Option<usize>> = vec![None; target.rows.len()];
        let mut unmatched_seen: FxHashMap<KeyTuple, usize> = FxHashMap::default();
        let mut output = MatchOutput::default();

        for (source_index, row) in source.rows.iter().enumerate() {
            let key = self.key_for(row, Side::Source)?;

            match index.get(&key) {
                Some(&target_index) => {
                    if let Some(first) = consumed_by[target_index] {
                        return Err(self.duplicate(Side::Source, key, &source.rows[first], row));
                    }
                    consumed_by[target_index] = Some(source_index);
                    output.matched.push(MatchedPair {
                        key,
                        source_index,
                        target_index,
                        source: row,
                        target: &target.rows[target_index],
                    });
                }
                None => {
                    if let Some(&first) = unmatched_seen.get(&key) {
                        return Err(self.duplicate(Side::Source, key, &source.rows[first], row));
                    }
                    unmatched_seen.insert(key.clone(), source_index);
                    output.source_only.push(KeyedRow {
                        key,
                        index: source_index,
                        row,
                    });
                }
            }
        }
        drop(index);

        output.target_only = target_keys
            .into_iter()
            .enumerate()
            .filter(|(i, _)| consumed_by[*i].is_none())
            .map(|(i, key)| KeyedRow {
                key,
                index: i,
                row: &target.rows[i],
            })
            .collect();

        debug!(
            "Matched {} rows, {} source-only, {} target-only",
            output.matched.len(),
            output.source_only.len(),
            output.target_only.len()
        );

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ColumnPolicy, CompareConfig};
    use crate::diff::plan::ComparisonPlan;
    use crate::model::Value;

    fn dataset(rows: Vec<(i64, &str)>) -> Dataset {
        Dataset::from_rows(
            &["id", "name"],
            rows.into_iter()
                .map(|(id, name)| vec![Value::Int(id), Value::from(name)])
                .collect(),
        )
    }

    fn plan(source: &Dataset, target: &Dataset, config: &CompareConfig) -> ComparisonPlan {
        ComparisonPlan::resolve(source, target, config).unwrap()
    }

    #[test]
    fn test_partition_preserves_order() {
        let source = dataset(vec![(3, "c"), (1, "a"), (5, "e"), (2, "b")]);
        let target = dataset(vec![(4, "d"), (2, "b"), (6, "f"), (1, "a")]);
        let plan = plan(&source, &target, &CompareConfig::new(["id"]));
        let out = RowMatcher::new(&plan.key_columns, false)
            .match_rows(&source, &target)
            .unwrap();

        let matched: Vec<_> = out.matched.iter().map(|p| p.key.to_string()).collect();
        let source_only: Vec<_> = out.source_only.iter().map(|r| r.key.to_string()).collect();
        let target_only: Vec<_> = out.target_only.iter().map(|r| r.key.to_string()).collect();
        assert_eq!(matched, vec!["1", "2"]);
        assert_eq!(source_only, vec!["3", "5"]);
        assert_eq!(target_only, vec!["4", "6"]);
        assert_eq!(out.matched[0].target_index, 3);
    }

    #[test]
    fn test_duplicate_in_source() {
        let source = dataset(vec![(1, "a"), (1, "b"), (2, "c")]);
        let target = dataset(vec![(1, "a"), (2, "c")]);
        let plan = plan(&source, &target, &CompareConfig::new(["id"]));
        let err = RowMatcher::new(&plan.key_columns, false)
            .match_rows(&source, &target)
            .unwrap_err();
        assert!(matches!(
            err,
            CompareError::DuplicateKey { side: Side::Source, first_line: 1, duplicate_line: 2, .. }
        ));
    }

    #[test]
    fn test_duplicate_unmatched_source_key() {
        let source = dataset(vec![(7, "a"), (7, "b")]);
        let target = dataset(vec![(1, "a")]);
        let plan = plan(&source, &target, &CompareConfig::new(["id"]));
        let err = RowMatcher::new(&plan.key_columns, false)
            .match_rows(&source, &target)
            .unwrap_err();
        assert!(matches!(err, CompareError::DuplicateKey { side: Side::Source, .. }));
    }

    #[test]
    fn test_duplicate_in_target() {
        let source = dataset(vec![(1, "a")]);
        let target = dataset(vec![(2, "a"), (2, "b")]);
        let plan = plan(&source, &target, &CompareConfig::new(["id"]));
        let err = RowMatcher::new(&plan.key_columns, false)
            .match_rows(&source, &target)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Duplicate primary key (id=2) in target dataset at lines 1 and 2"
        );
    }

    #[test]
    fn test_key_normalization_is_tolerant() {
        let source = Dataset::from_rows(&["code", "v"], vec![vec![Value::from(" ab "), Value::Int(1)]]);
        let target = Dataset::from_rows(&["code", "v"], vec![vec![Value::from("AB"), Value::Int(1)]]);
        let config = CompareConfig::new(["code"]).with_column_policy(
            "code",
            ColumnPolicy::new().with_ignore_whitespace(true).with_ignore_case(true),
        );
        let plan = plan(&source, &target, &config);
        let out = RowMatcher::new(&plan.key_columns, false)
            .match_rows(&source, &target)
            .unwrap();
        assert_eq!(out.matched.len(), 1);
    }

    #[test]
    fn test_null_keys_collapse() {
        let source = Dataset::from_rows(
            &["id", "v"],
            vec![vec![Value::Null, Value::Int(1)], vec![Value::from(""), Value::Int(2)]],
        );
        let target = Dataset::from_rows(&["id", "v"], vec![vec![Value::Int(1), Value::Int(1)]]);
        let plan = plan(&source, &target, &CompareConfig::new(["id"]));
        let err = RowMatcher::new(&plan.key_columns, false)
            .match_rows(&source, &target)
            .unwrap_err();
        assert!(matches!(err, CompareError::DuplicateKey { .. }));

        let err = RowMatcher::new(&plan.key_columns, true)
            .match_rows(&source, &target)
            .unwrap_err();
        assert_eq!(err, CompareError::NullKey { side: Side::Source, line: 1 });
    }
}
