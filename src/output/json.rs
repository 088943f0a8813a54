//! JSON output format

use std::io::Write;

use anyhow::Result;
use indexmap::IndexMap;
use serde::Serialize;

use crate::diff::{
    CellDiff, ComparisonResult, ComparisonSummary, RowClassification, RowStatus, SchemaMismatch,
};
use crate::model::{Canonical, KeyTuple, Row, Value};

use super::{ReportContext, ReportExporter};

/// JSON output formatter
pub struct JsonReport {
    pretty: bool,
}

impl JsonReport {
    pub fn new() -> Self {
        Self { pretty: true }
    }

    pub fn compact() -> Self {
        Self { pretty: false }
    }
}

impl Default for JsonReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable row entry; unchanged rows are only counted
#[derive(Serialize)]
struct JsonRow<'a> {
    status: RowStatus,
    key: IndexMap<&'a str, &'a Canonical>,
    source_line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    cells: Option<IndexMap<&'a str, &'a Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    changes: Option<&'a [CellDiff]>,
}

#[derive(Serialize)]
struct JsonComparison<'a> {
    title: &'a str,
    source: &'a str,
    target: &'a str,
    key_columns: &'a [String],
    compared_columns: &'a [String],
    summary: &'a ComparisonSummary,
    column_mismatches: &'a IndexMap<String, usize>,
    schema_mismatches: &'a [SchemaMismatch],
    rows: Vec<JsonRow<'a>>,
}

fn key_map<'a>(columns: &'a [String], key: &'a KeyTuple) -> IndexMap<&'a str, &'a Canonical> {
    columns.iter().map(String::as_str).zip(key.values()).collect()
}

fn cell_map<'a>(columns: &'a [String], row: &'a Row) -> IndexMap<&'a str, &'a Value> {
    columns.iter().map(String::as_str).zip(&row.cells).collect()
}

impl ReportExporter for JsonReport {
    fn render(
        &self,
        result: &ComparisonResult,
        context: &ReportContext,
        writer: &mut dyn Write,
    ) -> Result<()> {
        let key_columns = result.key_columns();

        let rows = result
            .classifications()
            .filter_map(|c| {
                let row = match c {
                    RowClassification::Unchanged(_) => return None,
                    RowClassification::Added(r) => JsonRow {
                        status: RowStatus::Added,
                        key: key_map(key_columns, &r.key),
                        source_line: r.row.source_line,
                        cells: Some(cell_map(result.target_columns(), &r.row)),
                        changes: None,
                    },
                    RowClassification::Removed(r) => JsonRow {
                        status: RowStatus::Removed,
                        key: key_map(key_columns, &r.key),
                        source_line: r.row.source_line,
                        cells: Some(cell_map(result.source_columns(), &r.row)),
                        changes: None,
                    },
                    RowClassification::Changed(r) => JsonRow {
                        status: RowStatus::Changed,
                        key: key_map(key_columns, &r.key),
                        source_line: r.source.source_line,
                        cells: None,
                        changes: Some(&r.diffs),
                    },
                };
                Some(row)
            })
            .collect();

        let output = JsonComparison {
            title: &context.title,
            source: &context.source_label,
            target: &context.target_label,
            key_columns,
            compared_columns: result.compared_columns(),
            summary: result.summary(),
            column_mismatches: result.column_mismatches(),
            schema_mismatches: result.schema_mismatches(),
            rows,
        };

        if self.pretty {
            serde_json::to_writer_pretty(&mut *writer, &output)?;
        } else {
            serde_json::to_writer(&mut *writer, &output)?;
        }
        writeln!(writer)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompareConfig;
    use crate::diff::compare;
    use crate::model::Dataset;

    #[test]
    fn test_render_json() {
        let source = Dataset::from_rows(
            &["id", "price"],
            vec![
                vec![Value::Int(1), Value::Float(1.5)],
                vec![Value::Int(2), Value::Float(2.0)],
            ],
        );
        let target = Dataset::from_rows(
            &["id", "price"],
            vec![
                vec![Value::Int(1), Value::Float(1.75)],
                vec![Value::Int(2), Value::Float(2.0)],
            ],
        );
        let result = compare(&source, &target, &CompareConfig::new(["id"])).unwrap();

        let mut buf = Vec::new();
        JsonReport::compact()
            .render(&result, &ReportContext::new("a", "b"), &mut buf)
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&buf).unwrap();

        assert_eq!(json["summary"]["changed"], 1);
        assert_eq!(json["summary"]["unchanged"], 1);
        assert_eq!(json["column_mismatches"]["price"], 1);
        let rows = json["rows"].as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["status"], "changed");
        assert_eq!(rows[0]["key"]["id"], 1);
        assert_eq!(rows[0]["changes"][0]["column"], "price");
        assert_eq!(rows[0]["changes"][0]["kind"], "value");
        assert_eq!(rows[0]["changes"][0]["target"], 1.75);
    }
}
