//! Excel workbook report
//!
//! One workbook holds a `Summary` sheet with a line per test, a `<test>_diffs`
//! sheet per test with differing cells, and a `Missing_Rows` sheet collating
//! rows found on one side only across all tests.

use std::io::Write;

use anyhow::{Context, Result};
use indexmap::IndexSet;
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use rustc_hash::FxHashSet;

use crate::diff::{ComparisonResult, RowRecord};
use crate::model::{Canonical, Value};
use crate::session::TestOutcome;

use super::{ReportContext, ReportExporter};

/// Excel limit on sheet name length
const MAX_SHEET_NAME: usize = 31;

/// Characters Excel rejects in sheet names
const INVALID_SHEET_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

/// Integers beyond this magnitude lose digits as Excel numbers
const MAX_EXCEL_INT: i64 = 999_999_999_999_999;

const SUMMARY_HEADERS: [&str; 10] = [
    "Test",
    "Status",
    "Source Rows",
    "Target Rows",
    "Added",
    "Removed",
    "Changed",
    "Unchanged",
    "Cells Changed",
    "Error",
];

/// Writes results as an `.xlsx` workbook
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxReport;

/// One test as it appears in the workbook
struct Entry<'a> {
    name: &'a str,
    outcome: std::result::Result<&'a ComparisonResult, &'a str>,
}

impl XlsxReport {
    pub fn new() -> Self {
        Self
    }

    /// Render every test case of a session into one workbook
    pub fn render_session(&self, outcomes: &[TestOutcome], writer: &mut dyn Write) -> Result<()> {
        let entries: Vec<Entry<'_>> = outcomes
            .iter()
            .map(|o| Entry {
                name: &o.name,
                outcome: o.result().ok_or_else(|| o.error().unwrap_or_default()),
            })
            .collect();
        write_workbook(&entries, writer)
    }
}

impl ReportExporter for XlsxReport {
    fn render(
        &self,
        result: &ComparisonResult,
        context: &ReportContext,
        writer: &mut dyn Write,
    ) -> Result<()> {
        let entries = [Entry {
            name: &context.title,
            outcome: Ok(result),
        }];
        write_workbook(&entries, writer)
    }
}

fn write_workbook(entries: &[Entry<'_>], writer: &mut dyn Write) -> Result<()> {
    let header = Format::new().set_bold();
    let mut workbook = Workbook::new();

    workbook.push_worksheet(summary_sheet(entries, &header)?);

    let mut used_names: FxHashSet<String> = ["summary", "missing_rows"]
        .into_iter()
        .map(String::from)
        .collect();
    for entry in entries {
        if let Ok(result) = entry.outcome {
            if !result.changed().is_empty() {
                let name = unique_sheet_name(entry.name, &mut used_names);
                workbook.push_worksheet(diff_sheet(&name, result, &header)?);
            }
        }
    }

    if let Some(sheet) = missing_sheet(entries, &header)? {
        workbook.push_worksheet(sheet);
    }

    let buffer = workbook
        .save_to_buffer()
        .context("Failed to build XLSX workbook")?;
    writer.write_all(&buffer)?;
    Ok(())
}

fn summary_sheet(entries: &[Entry<'_>], header: &Format) -> Result<Worksheet> {
    let mut sheet = Worksheet::new();
    sheet.set_name("Summary")?;
    write_header(&mut sheet, &SUMMARY_HEADERS, header)?;

    for (i, entry) in entries.iter().enumerate() {
        let row = sheet_row(i + 1)?;
        sheet.write_string(row, 0, entry.name)?;

        match entry.outcome {
            Ok(result) => {
                let status = if result.has_differences() {
                    "differences"
                } else {
                    "passed"
                };
                sheet.write_string(row, 1, status)?;

                let s = result.summary();
                let counts = [
                    s.source_rows,
                    s.target_rows,
                    s.added,
                    s.removed,
                    s.changed,
                    s.unchanged,
                    s.cells_changed,
                ];
                for (col, count) in (2u16..).zip(counts) {
                    sheet.write_number(row, col, count as f64)?;
                }
            }
            Err(error) => {
                sheet.write_string(row, 1, "error")?;
                sheet.write_string(row, 9, error)?;
            }
        }
    }

    sheet.set_freeze_panes(1, 0)?;
    sheet.autofit();
    Ok(sheet)
}

/// Key columns, then one line per differing cell
fn diff_sheet(name: &str, result: &ComparisonResult, header: &Format) -> Result<Worksheet> {
    let mut sheet = Worksheet::new();
    sheet.set_name(name)?;

    let keys = result.key_columns();
    let mut headers: Vec<&str> = keys.iter().map(String::as_str).collect();
    headers.extend(["Column", "Source", "Target", "Source Line", "Target Line"]);
    write_header(&mut sheet, &headers, header)?;

    let key_width = keys.len();
    let mut row_index = 1;
    for changed in result.changed() {
        for diff in &changed.diffs {
            let row = sheet_row(row_index)?;
            for (col, value) in changed.key.values().iter().enumerate() {
                write_canonical(&mut sheet, row, sheet_col(col)?, value)?;
            }

            let base = sheet_col(key_width)?;
            sheet.write_string(row, base, &diff.column)?;
            if let Some(value) = &diff.source_raw {
                write_value(&mut sheet, row, base + 1, value)?;
            }
            if let Some(value) = &diff.target_raw {
                write_value(&mut sheet, row, base + 2, value)?;
            }
            sheet.write_number(row, base + 3, changed.source.source_line as f64)?;
            sheet.write_number(row, base + 4, changed.target.source_line as f64)?;
            row_index += 1;
        }
    }

    sheet.set_freeze_panes(1, 0)?;
    sheet.autofit();
    Ok(sheet)
}

/// Rows on one side only, across tests, under the union of their columns
fn missing_sheet(entries: &[Entry<'_>], header: &Format) -> Result<Option<Worksheet>> {
    let mut blocks: Vec<(&str, &str, &[String], &[RowRecord], &ComparisonResult)> = Vec::new();
    for entry in entries {
        if let Ok(result) = entry.outcome {
            if !result.removed().is_empty() {
                blocks.push((
                    entry.name,
                    "Missing in Target",
                    result.source_columns(),
                    result.removed(),
                    result,
                ));
            }
            if !result.added().is_empty() {
                blocks.push((
                    entry.name,
                    "Missing in Source",
                    result.target_columns(),
                    result.added(),
                    result,
                ));
            }
        }
    }
    if blocks.is_empty() {
        return Ok(None);
    }

    let columns: IndexSet<&str> = blocks
        .iter()
        .flat_map(|(_, _, names, _, _)| names.iter().map(String::as_str))
        .collect();

    let mut sheet = Worksheet::new();
    sheet.set_name("Missing_Rows")?;
    let mut headers = vec!["Test", "Issue", "Key", "Line"];
    headers.extend(columns.iter().copied());
    write_header(&mut sheet, &headers, header)?;

    let mut row_index = 1;
    for (test, issue, names, records, result) in blocks {
        for record in records {
            let row = sheet_row(row_index)?;
            sheet.write_string(row, 0, test)?;
            sheet.write_string(row, 1, issue)?;
            sheet.write_string(row, 2, record.key.describe(result.key_columns()))?;
            sheet.write_number(row, 3, record.row.source_line as f64)?;

            for (name, value) in names.iter().zip(&record.row.cells) {
                if let Some(position) = columns.get_index_of(name.as_str()) {
                    write_value(&mut sheet, row, sheet_col(position + 4)?, value)?;
                }
            }
            row_index += 1;
        }
    }

    sheet.set_freeze_panes(1, 0)?;
    sheet.autofit();
    Ok(Some(sheet))
}

fn write_header(sheet: &mut Worksheet, headers: &[&str], format: &Format) -> Result<()> {
    for (col, title) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, sheet_col(col)?, *title, format)?;
    }
    Ok(())
}

fn write_value(sheet: &mut Worksheet, row: u32, col: u16, value: &Value) -> Result<()> {
    match value {
        Value::Null => {}
        Value::Bool(b) => {
            sheet.write_boolean(row, col, *b)?;
        }
        Value::Int(i) if i.unsigned_abs() <= MAX_EXCEL_INT as u64 => {
            sheet.write_number(row, col, *i as f64)?;
        }
        Value::Float(f) if f.is_finite() => {
            sheet.write_number(row, col, *f)?;
        }
        other => {
            sheet.write_string(row, col, other.display())?;
        }
    }
    Ok(())
}

fn write_canonical(sheet: &mut Worksheet, row: u32, col: u16, value: &Canonical) -> Result<()> {
    match value {
        Canonical::Absent => {}
        Canonical::Bool(b) => {
            sheet.write_boolean(row, col, *b)?;
        }
        Canonical::Int(i) if i.unsigned_abs() <= MAX_EXCEL_INT as u64 => {
            sheet.write_number(row, col, *i as f64)?;
        }
        Canonical::Float(f) if f.is_finite() => {
            sheet.write_number(row, col, *f)?;
        }
        other => {
            sheet.write_string(row, col, other.display())?;
        }
    }
    Ok(())
}

fn sheet_row(index: usize) -> Result<u32> {
    u32::try_from(index).context("Too many rows for an XLSX sheet")
}

fn sheet_col(index: usize) -> Result<u16> {
    u16::try_from(index).context("Too many columns for an XLSX sheet")
}

/// `<test>_diffs`, cleaned of characters Excel rejects and unique in the workbook
fn unique_sheet_name(test: &str, used: &mut FxHashSet<String>) -> String {
    let cleaned: String = test
        .chars()
        .map(|c| if INVALID_SHEET_CHARS.contains(&c) { '_' } else { c })
        .collect();
    let stem: String = cleaned.chars().take(25).collect();

    let mut name = format!("{}_diffs", stem);
    let mut n = 2;
    while !used.insert(name.to_lowercase()) {
        let suffix = format!("_{}_diffs", n);
        let room = MAX_SHEET_NAME - suffix.len();
        name = format!("{}{}", stem.chars().take(room).collect::<String>(), suffix);
        n += 1;
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompareConfig;
    use crate::diff::compare;
    use crate::model::Dataset;
    use crate::session::TestStatus;
    use calamine::{Data, Range, Reader, Xlsx};
    use std::io::Cursor;

    fn people_result() -> ComparisonResult {
        let names = ["id", "name", "age"];
        let source = Dataset::from_rows(
            &names,
            vec![
                vec![Value::Int(1), Value::from("Alice"), Value::Int(30)],
                vec![Value::Int(2), Value::from("Bob"), Value::Int(25)],
            ],
        );
        let target = Dataset::from_rows(
            &names,
            vec![
                vec![Value::Int(1), Value::from("Alice"), Value::Int(31)],
                vec![Value::Int(3), Value::from("Carl"), Value::Int(40)],
            ],
        );
        compare(&source, &target, &CompareConfig::new(["id"])).unwrap()
    }

    fn open(buf: Vec<u8>) -> Xlsx<Cursor<Vec<u8>>> {
        Xlsx::new(Cursor::new(buf)).unwrap()
    }

    fn text(range: &Range<Data>, row: u32, col: u32) -> String {
        match range.get_value((row, col)) {
            Some(Data::String(s)) => s.clone(),
            Some(Data::Float(f)) => f.to_string(),
            Some(Data::Bool(b)) => b.to_string(),
            _ => String::new(),
        }
    }

    #[test]
    fn test_single_result_workbook() {
        let mut buf = Vec::new();
        XlsxReport::new()
            .render(
                &people_result(),
                &ReportContext::new("a.csv", "b.csv").with_title("people"),
                &mut buf,
            )
            .unwrap();

        let mut workbook = open(buf);
        assert_eq!(
            workbook.sheet_names(),
            vec!["Summary", "people_diffs", "Missing_Rows"]
        );

        let summary = workbook.worksheet_range("Summary").unwrap();
        assert_eq!(text(&summary, 1, 0), "people");
        assert_eq!(text(&summary, 1, 1), "differences");
        assert_eq!(text(&summary, 1, 4), "1");

        let diffs = workbook.worksheet_range("people_diffs").unwrap();
        assert_eq!(text(&diffs, 0, 0), "id");
        assert_eq!(text(&diffs, 1, 1), "age");
        assert_eq!(text(&diffs, 1, 2), "30");
        assert_eq!(text(&diffs, 1, 3), "31");

        let missing = workbook.worksheet_range("Missing_Rows").unwrap();
        assert_eq!(text(&missing, 1, 1), "Missing in Target");
        assert_eq!(text(&missing, 1, 2), "id=2");
        assert_eq!(text(&missing, 1, 5), "Bob");
        assert_eq!(text(&missing, 2, 1), "Missing in Source");
        assert_eq!(text(&missing, 2, 5), "Carl");
    }

    #[test]
    fn test_session_workbook_with_failed_case() {
        let outcomes = vec![
            TestOutcome {
                name: "people".to_string(),
                source: "a.csv".into(),
                target: "b.csv".into(),
                status: TestStatus::Completed(people_result()),
            },
            TestOutcome {
                name: "broken".to_string(),
                source: "x.csv".into(),
                target: "y.csv".into(),
                status: TestStatus::Failed("Failed to open file: x.csv".to_string()),
            },
        ];

        let mut buf = Vec::new();
        XlsxReport::new().render_session(&outcomes, &mut buf).unwrap();

        let mut workbook = open(buf);
        let summary = workbook.worksheet_range("Summary").unwrap();
        assert_eq!(text(&summary, 2, 0), "broken");
        assert_eq!(text(&summary, 2, 1), "error");
        assert_eq!(text(&summary, 2, 9), "Failed to open file: x.csv");
        assert_eq!(workbook.sheet_names().len(), 3);
    }

    #[test]
    fn test_sheet_names_are_valid_and_unique() {
        let mut used = FxHashSet::default();
        let long = "a very long test name that will not fit";

        let first = unique_sheet_name(long, &mut used);
        let second = unique_sheet_name(long, &mut used);
        let cleaned = unique_sheet_name("q1/q2: [draft]", &mut used);

        assert_eq!(first, "a very long test name tha_diffs");
        assert_eq!(second, "a very long test name t_2_diffs");
        assert!(first.chars().count() <= MAX_SHEET_NAME);
        assert!(second.chars().count() <= MAX_SHEET_NAME);
        assert_eq!(cleaned, "q1_q2_ _draft__diffs");
    }
}
