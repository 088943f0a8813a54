use tabcompare::config::{ColumnPolicy, CompareConfig};
use tabcompare::diff::{compare, CellDiffKind, RowStatus};
use tabcompare::model::{Canonical, ColumnType, Dataset, Value};
use tabcompare::{CompareError, ConfigurationError};

fn dataset(names: &[&str], rows: Vec<Vec<Value>>) -> Dataset {
    Dataset::from_rows(names, rows)
}

fn keyed(ids: &[i64]) -> Dataset {
    dataset(
        &["id", "value"],
        ids.iter()
            .map(|id| vec![Value::Int(*id), Value::from(format!("v{}", id))])
            .collect(),
    )
}

fn key_strings(records: &[tabcompare::diff::RowRecord]) -> Vec<String> {
    records.iter().map(|r| r.key.to_string()).collect()
}

#[test]
fn added_and_removed_follow_key_set_difference() {
    let a = keyed(&[1, 2, 3, 4, 5]);
    let b = keyed(&[4, 5, 6, 7]);

    let result = compare(&a, &b, &CompareConfig::new(["id"])).unwrap();

    assert_eq!(result.summary().added, 2);
    assert_eq!(result.summary().removed, 3);
    assert_eq!(key_strings(result.added()), vec!["6", "7"]);
    assert_eq!(key_strings(result.removed()), vec!["1", "2", "3"]);
    assert_eq!(result.summary().unchanged, 2);
}

#[test]
fn comparing_a_dataset_with_itself_is_clean() {
    let a = keyed(&[10, 20, 30]);

    let result = compare(&a, &a, &CompareConfig::new(["id"])).unwrap();
    let summary = result.summary();

    assert_eq!((summary.added, summary.removed, summary.changed), (0, 0, 0));
    assert_eq!(summary.unchanged, a.row_count());
    assert!(!result.has_differences());
}

#[test]
fn swapping_sides_swaps_added_and_removed() {
    let a = keyed(&[1, 2, 3]);
    let b = keyed(&[2, 3, 4, 5]);
    let config = CompareConfig::new(["id"]);

    let forward = compare(&a, &b, &config).unwrap();
    let backward = compare(&b, &a, &config).unwrap();

    assert_eq!(key_strings(forward.added()), key_strings(backward.removed()));
    assert_eq!(key_strings(forward.removed()), key_strings(backward.added()));
}

#[test]
fn absolute_tolerance_on_a_column() {
    let source = dataset(
        &["id", "amount"],
        vec![
            vec![Value::Int(1), Value::Float(1.000)],
            vec![Value::Int(2), Value::Float(1.000)],
        ],
    );
    let target = dataset(
        &["id", "amount"],
        vec![
            vec![Value::Int(1), Value::Float(1.005)],
            vec![Value::Int(2), Value::Float(1.02)],
        ],
    );
    let config = CompareConfig::new(["id"])
        .with_column_policy("amount", ColumnPolicy::new().with_absolute_tolerance(0.01));

    let result = compare(&source, &target, &config).unwrap();

    assert_eq!(result.summary().unchanged, 1);
    assert_eq!(result.summary().changed, 1);
    assert_eq!(result.changed()[0].key.to_string(), "2");
}

#[test]
fn relative_tolerance_on_a_type() {
    let source = dataset(
        &["id", "total"],
        vec![vec![Value::Int(1), Value::Float(1000.0)]],
    );
    let target = dataset(
        &["id", "total"],
        vec![vec![Value::Int(1), Value::Float(1004.5)]],
    );
    let config = CompareConfig::new(["id"])
        .with_type_policy(ColumnType::Float, ColumnPolicy::new().with_relative_tolerance(0.005));

    let result = compare(&source, &target, &config).unwrap();
    assert_eq!(result.summary().unchanged, 1);
}

#[test]
fn duplicate_key_is_an_error() {
    let source = keyed(&[1, 2, 1]);
    let target = keyed(&[1, 2]);

    let err = compare(&source, &target, &CompareConfig::new(["id"])).unwrap_err();

    match err {
        CompareError::DuplicateKey {
            first_line,
            duplicate_line,
            ..
        } => {
            assert_eq!(first_line, 1);
            assert_eq!(duplicate_line, 3);
        }
        other => panic!("expected duplicate key error, got {:?}", other),
    }
}

#[test]
fn people_scenario() {
    let names = ["id", "name", "age"];
    let source = dataset(
        &names,
        vec![
            vec![Value::Int(1), Value::from("Alice"), Value::Int(30)],
            vec![Value::Int(2), Value::from("Bob"), Value::Int(25)],
        ],
    );
    let target = dataset(
        &names,
        vec![
            vec![Value::Int(1), Value::from("Alice"), Value::Int(31)],
            vec![Value::Int(3), Value::from("Carl"), Value::Int(40)],
        ],
    );

    let result = compare(&source, &target, &CompareConfig::new(["id"])).unwrap();

    assert_eq!(key_strings(result.removed()), vec!["2"]);
    assert_eq!(key_strings(result.added()), vec!["3"]);
    assert_eq!(result.summary().unchanged, 0);

    let changed = result.changed();
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0].key.to_string(), "1");
    assert_eq!(changed[0].diffs.len(), 1);
    assert_eq!(changed[0].diffs[0].column, "age");
    assert_eq!(changed[0].diffs[0].source, Some(Canonical::Int(30)));
    assert_eq!(changed[0].diffs[0].target, Some(Canonical::Int(31)));

    let statuses: Vec<RowStatus> = result.classifications().map(|c| c.status()).collect();
    assert_eq!(
        statuses,
        vec![RowStatus::Changed, RowStatus::Removed, RowStatus::Added]
    );
}

#[test]
fn ignored_column_changes_leave_row_unchanged() {
    let names = ["id", "status", "updated_at"];
    let source = dataset(
        &names,
        vec![vec![Value::Int(1), Value::from("open"), Value::from("2024-01-01T10:00:00")]],
    );
    let target = dataset(
        &names,
        vec![vec![Value::Int(1), Value::from("open"), Value::from("2024-03-05T08:30:00")]],
    );
    let config = CompareConfig::new(["id"]).with_ignore_columns(["updated_at"]);

    let result = compare(&source, &target, &config).unwrap();

    assert_eq!(result.summary().unchanged, 1);
    assert_eq!(result.summary().changed, 0);
    assert_eq!(result.compared_columns(), ["status"]);
}

#[test]
fn composite_keys_match_on_every_component() {
    let names = ["region", "id", "qty"];
    let source = dataset(
        &names,
        vec![
            vec![Value::from("EU"), Value::Int(1), Value::Int(5)],
            vec![Value::from("US"), Value::Int(1), Value::Int(7)],
        ],
    );
    let target = dataset(
        &names,
        vec![
            vec![Value::from("US"), Value::Int(1), Value::Int(8)],
            vec![Value::from("EU"), Value::Int(1), Value::Int(5)],
        ],
    );

    let result = compare(&source, &target, &CompareConfig::new(["region", "id"])).unwrap();

    assert_eq!(result.summary().unchanged, 1);
    assert_eq!(result.summary().changed, 1);
    assert_eq!(
        result.changed()[0].key.describe(result.key_columns()),
        "region=US, id=1"
    );
}

#[test]
fn string_ids_match_integer_ids_after_normalization() {
    let mut source = dataset(&["id", "v"], vec![vec![Value::from("042"), Value::from("x")]]);
    let target = dataset(&["id", "v"], vec![vec![Value::Int(42), Value::from("x")]]);

    let result = compare(&source, &target, &CompareConfig::new(["id"])).unwrap();
    assert_eq!(result.summary().added, 1);
    assert_eq!(result.summary().removed, 1);

    source.set_column_type("id", ColumnType::Int);
    let result = compare(&source, &target, &CompareConfig::new(["id"])).unwrap();
    assert_eq!(result.summary().unchanged, 1);
}

#[test]
fn text_folding_policies() {
    let source = dataset(&["id", "name"], vec![vec![Value::Int(1), Value::from("  Alice  Smith ")]]);
    let target = dataset(&["id", "name"], vec![vec![Value::Int(1), Value::from("alice smith")]]);

    let strict = compare(&source, &target, &CompareConfig::new(["id"])).unwrap();
    assert_eq!(strict.summary().changed, 1);

    let relaxed = CompareConfig::new(["id"]).with_default_policy(
        ColumnPolicy::new()
            .with_collapse_whitespace(true)
            .with_ignore_case(true),
    );
    let result = compare(&source, &target, &relaxed).unwrap();
    assert_eq!(result.summary().unchanged, 1);
}

#[test]
fn null_markers_are_absent_values() {
    let source = dataset(
        &["id", "note"],
        vec![
            vec![Value::Int(1), Value::from("N/A")],
            vec![Value::Int(2), Value::Null],
        ],
    );
    let target = dataset(
        &["id", "note"],
        vec![
            vec![Value::Int(1), Value::Null],
            vec![Value::Int(2), Value::from("")],
        ],
    );

    let result = compare(&source, &target, &CompareConfig::new(["id"])).unwrap();
    assert_eq!(result.summary().unchanged, 2);
}

#[test]
fn unnormalizable_cells_are_recorded_not_fatal() {
    let source = dataset(
        &["id", "price"],
        vec![
            vec![Value::Int(1), Value::Float(9.5)],
            vec![Value::Int(2), Value::Float(3.0)],
        ],
    );
    let mut target = dataset(
        &["id", "price"],
        vec![
            vec![Value::Int(1), Value::from("nine fifty")],
            vec![Value::Int(2), Value::from("3.00")],
        ],
    );
    target.set_column_type("price", ColumnType::Float);

    let result = compare(&source, &target, &CompareConfig::new(["id"])).unwrap();

    assert_eq!(result.summary().changed, 1);
    assert_eq!(result.summary().unchanged, 1);
    assert_eq!(result.summary().normalization_failures, 1);

    let diff = &result.changed()[0].diffs[0];
    assert!(matches!(diff.kind, CellDiffKind::Unnormalizable { .. }));
    assert_eq!(diff.source_raw, Some(Value::Float(9.5)));
    assert_eq!(diff.target_raw, Some(Value::from("nine fifty")));
}

#[test]
fn columns_missing_on_one_side_are_schema_mismatches() {
    let source = dataset(
        &["id", "name", "legacy"],
        vec![vec![Value::Int(1), Value::from("a"), Value::Int(0)]],
    );
    let target = dataset(
        &["id", "name", "added"],
        vec![vec![Value::Int(1), Value::from("a"), Value::Int(1)]],
    );

    let result = compare(&source, &target, &CompareConfig::new(["id"])).unwrap();

    assert_eq!(result.compared_columns(), ["name"]);
    assert_eq!(result.schema_mismatches().len(), 2);
    assert_eq!(result.summary().unchanged, 1);
    assert!(result.has_differences());
}

#[test]
fn configuration_errors_abort() {
    let a = keyed(&[1]);

    let cases = vec![
        (CompareConfig::new(Vec::<String>::new()), ConfigurationError::EmptyPrimaryKey),
        (
            CompareConfig::new(["id"]).with_ignore_columns(["id"]),
            ConfigurationError::KeyColumnIgnored("id".to_string()),
        ),
        (
            CompareConfig::new(["id"]).with_ignore_columns(["value"]),
            ConfigurationError::NoComparableColumns,
        ),
        (
            CompareConfig::new(["id"]).with_column_policy("ghost", ColumnPolicy::new()),
            ConfigurationError::UnknownPolicyColumn("ghost".to_string()),
        ),
    ];

    for (config, expected) in cases {
        let err = compare(&a, &a, &config).unwrap_err();
        assert_eq!(err, CompareError::Configuration(expected));
    }
}

#[test]
fn integers_beyond_float_precision_still_differ() {
    let source = dataset(&["id", "n"], vec![vec![Value::Int(1), Value::Int(9_007_199_254_740_993)]]);
    let target = dataset(&["id", "n"], vec![vec![Value::Int(1), Value::Int(9_007_199_254_740_992)]]);
    let config = CompareConfig::new(["id"])
        .with_default_policy(ColumnPolicy::new().with_absolute_tolerance(0.0));

    let result = compare(&source, &target, &config).unwrap();

    assert_eq!(result.summary().changed, 1);
    assert_eq!(result.summary().unchanged, 0);
}

#[test]
fn decimal_places_beyond_float_precision_are_rejected() {
    let source = dataset(&["id", "x"], vec![vec![Value::Int(1), Value::Float(1.5)]]);
    let target = dataset(&["id", "x"], vec![vec![Value::Int(1), Value::Float(99.25)]]);
    let config = CompareConfig::new(["id"])
        .with_default_policy(ColumnPolicy::new().with_decimal_places(400));

    let err = compare(&source, &target, &config).unwrap_err();
    assert!(matches!(
        err,
        CompareError::Configuration(ConfigurationError::InvalidDecimalPlaces { value: 400, .. })
    ));
}
