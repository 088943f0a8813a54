//! Colored terminal output

use std::io::{IsTerminal, Write};

use anyhow::Result;
use tabled::builder::Builder;
use tabled::settings::Style;
use termcolor::{Ansi, Color, ColorChoice, ColorSpec, NoColor, WriteColor};

use crate::config::ResultDetail;
use crate::diff::{cell_diff::percentage_change, CellDiff, CellDiffKind, ComparisonResult, RowRecord};
use crate::model::Value;

use super::{ReportContext, ReportExporter};

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Terminal output with colors
pub struct TerminalReport {
    color_choice: ColorChoice,
}

impl TerminalReport {
    pub fn new() -> Self {
        Self {
            color_choice: ColorChoice::Auto,
        }
    }

    pub fn with_color_choice(color_choice: ColorChoice) -> Self {
        Self { color_choice }
    }

    fn use_color(&self) -> bool {
        match self.color_choice {
            ColorChoice::Always | ColorChoice::AlwaysAnsi => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => {
                std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal()
            }
        }
    }

    fn write_report<W: WriteColor>(
        &self,
        out: &mut W,
        result: &ComparisonResult,
        context: &ReportContext,
    ) -> Result<()> {
        writeln!(out, "{}", RULE)?;
        writeln!(
            out,
            " {}: {} → {}",
            context.title, context.source_label, context.target_label
        )?;
        writeln!(out, "{}", RULE)?;
        writeln!(out)?;

        self.write_schema_mismatches(out, result)?;
        self.write_summary(out, result)?;

        if !result.has_differences() {
            writeln!(out, "No differences found.")?;
            return Ok(());
        }

        self.write_column_mismatches(out, result)?;

        if result.detail() == ResultDetail::SummaryOnly {
            return Ok(());
        }

        write_records(out, "Added Rows:", Color::Green, result.target_columns(), result.added())?;
        write_records(out, "Removed Rows:", Color::Red, result.source_columns(), result.removed())?;
        self.write_changed_rows(out, result)?;

        Ok(())
    }

    fn write_schema_mismatches<W: WriteColor>(&self, out: &mut W, result: &ComparisonResult) -> Result<()> {
        if result.schema_mismatches().is_empty() {
            return Ok(());
        }

        heading(out, "Schema Differences:", Color::Yellow)?;
        for mismatch in result.schema_mismatches() {
            writeln!(out, "  {}", mismatch)?;
        }
        writeln!(out)?;
        Ok(())
    }

    fn write_summary<W: WriteColor>(&self, out: &mut W, result: &ComparisonResult) -> Result<()> {
        let summary = result.summary();
        writeln!(
            out,
            "Summary: +{} added, -{} removed, ~{} changed, {} unchanged (out of {} → {} rows)",
            summary.added,
            summary.removed,
            summary.changed,
            summary.unchanged,
            summary.source_rows,
            summary.target_rows
        )?;
        if summary.normalization_failures > 0 {
            writeln!(
                out,
                "         {} cells could not be normalized",
                summary.normalization_failures
            )?;
        }
        writeln!(out)?;
        Ok(())
    }

    fn write_column_mismatches<W: WriteColor>(&self, out: &mut W, result: &ComparisonResult) -> Result<()> {
        let columns: Vec<_> = result
            .column_mismatches()
            .iter()
            .filter(|(_, count)| **count > 0)
            .collect();
        if columns.is_empty() {
            return Ok(());
        }

        heading(out, "Column Mismatches:", Color::Yellow)?;
        for (column, count) in columns {
            writeln!(out, "  {}: {}", column, count)?;
        }
        writeln!(out)?;
        Ok(())
    }

    fn write_changed_rows<W: WriteColor>(&self, out: &mut W, result: &ComparisonResult) -> Result<()> {
        if result.changed().is_empty() {
            return Ok(());
        }

        heading(out, "Changed Rows:", Color::Yellow)?;
        for row in result.changed() {
            writeln!(out, "  {}:", row.key.describe(result.key_columns()))?;
            for diff in &row.diffs {
                write_cell_diff(out, diff)?;
            }
        }
        writeln!(out)?;
        Ok(())
    }
}

impl Default for TerminalReport {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportExporter for TerminalReport {
    fn render(
        &self,
        result: &ComparisonResult,
        context: &ReportContext,
        writer: &mut dyn Write,
    ) -> Result<()> {
        if self.use_color() {
            self.write_report(&mut Ansi::new(writer), result, context)
        } else {
            self.write_report(&mut NoColor::new(writer), result, context)
        }
    }
}

fn heading<W: WriteColor>(out: &mut W, text: &str, color: Color) -> Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
    writeln!(out, "{}", text)?;
    out.reset()?;
    Ok(())
}

fn write_records<W: WriteColor>(
    out: &mut W,
    title: &str,
    color: Color,
    columns: &[String],
    records: &[RowRecord],
) -> Result<()> {
    if records.is_empty() {
        return Ok(());
    }

    heading(out, title, color)?;
    writeln!(out, "{}", build_table(columns, records))?;
    Ok(())
}

fn write_cell_diff<W: WriteColor>(out: &mut W, diff: &CellDiff) -> Result<()> {
    let source = raw_display(diff.source_raw.as_ref());
    let target = raw_display(diff.target_raw.as_ref());

    let note = match &diff.kind {
        CellDiffKind::Value => match (&diff.source, &diff.target) {
            (Some(a), Some(b)) => percentage_change(a, b)
                .map(|p| format!(" ({:+.1}%)", p))
                .unwrap_or_default(),
            _ => String::new(),
        },
        CellDiffKind::Unnormalizable {
            source_error,
            target_error,
        } => {
            let reason = source_error
                .as_deref()
                .or(target_error.as_deref())
                .unwrap_or("not comparable");
            format!(" [{}]", reason)
        }
    };

    write!(out, "    {}: ", diff.column)?;
    out.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
    write!(out, "{}", source)?;
    out.reset()?;
    write!(out, " → ")?;
    out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
    write!(out, "{}", target)?;
    out.reset()?;
    writeln!(out, "{}", note)?;
    Ok(())
}

fn raw_display(value: Option<&Value>) -> String {
    value
        .map(|v| v.display().into_owned())
        .unwrap_or_else(|| "<missing>".to_string())
}

/// Build a box-drawn table of whole rows
fn build_table(columns: &[String], records: &[RowRecord]) -> String {
    let mut builder = Builder::default();
    builder.push_record(columns.iter().cloned());
    for record in records {
        builder.push_record(record.row.cells.iter().map(|c| c.display().into_owned()));
    }

    let mut table = builder.build();
    table.with(Style::modern());
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompareConfig;
    use crate::diff::compare;
    use crate::model::Dataset;

    fn render(result: &ComparisonResult) -> String {
        let mut buf = Vec::new();
        TerminalReport::with_color_choice(ColorChoice::Never)
            .render(result, &ReportContext::new("old.csv", "new.csv"), &mut buf)
            .unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn people(rows: Vec<(i64, &str, i64)>) -> Dataset {
        Dataset::from_rows(
            &["id", "name", "age"],
            rows.into_iter()
                .map(|(id, name, age)| vec![Value::Int(id), Value::from(name), Value::Int(age)])
                .collect(),
        )
    }

    #[test]
    fn test_render_differences() {
        let source = people(vec![(1, "Alice", 30), (2, "Bob", 25)]);
        let target = people(vec![(1, "Alice", 31), (3, "Carl", 40)]);
        let result = compare(&source, &target, &CompareConfig::new(["id"])).unwrap();

        let text = render(&result);
        assert!(text.contains("tabcompare: old.csv → new.csv"));
        assert!(text.contains("+1 added, -1 removed, ~1 changed, 0 unchanged"));
        assert!(text.contains("Added Rows:"));
        assert!(text.contains("Carl"));
        assert!(text.contains("Removed Rows:"));
        assert!(text.contains("id=1:"));
        assert!(text.contains("age: 30 → 31 (+3.3%)"));
        assert!(!text.contains('\u{1b}'));
    }

    #[test]
    fn test_render_no_differences() {
        let source = people(vec![(1, "Alice", 30)]);
        let result = compare(&source, &source, &CompareConfig::new(["id"])).unwrap();
        assert!(render(&result).contains("No differences found."));
    }
}
