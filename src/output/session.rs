//! Summary report across the test cases of a session

use std::io::Write;

use anyhow::{Context as _, Result};
use serde::Serialize;
use tabled::builder::Builder;
use tabled::settings::Style;
use tera::{Context, Tera};

use crate::config::OutputFormat;
use crate::diff::ComparisonSummary;
use crate::session::TestOutcome;

use super::{XlsxReport, CSS_STYLES};

const TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <title>tabcompare session</title>
  <style>{{ css | safe }}</style>
</head>
<body>
  <div class="header"><h1>tabcompare session</h1></div>
  <div class="section">
    <table>
      <tr><th>Test</th><th>Status</th><th>Source rows</th><th>Target rows</th><th>Added</th><th>Removed</th><th>Changed</th><th>Unchanged</th></tr>
{% for row in rows %}      <tr{% if row.error %} class="failed"{% endif %}><td>{{ row.name }}</td><td>{{ row.status }}{% if row.error %}: {{ row.error }}{% endif %}</td>{% if row.summary %}<td>{{ row.summary.source_rows }}</td><td>{{ row.summary.target_rows }}</td><td>{{ row.summary.added }}</td><td>{{ row.summary.removed }}</td><td>{{ row.summary.changed }}</td><td>{{ row.summary.unchanged }}</td>{% else %}<td colspan="6"></td>{% endif %}</tr>
{% endfor %}    </table>
  </div>
</body>
</html>
"#;

#[derive(Serialize)]
struct OutcomeView<'a> {
    name: &'a str,
    source: String,
    target: String,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<&'a ComparisonSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

impl<'a> OutcomeView<'a> {
    fn new(outcome: &'a TestOutcome) -> Self {
        let status = if outcome.is_failed() {
            "error"
        } else if outcome.has_differences() {
            "differences"
        } else {
            "passed"
        };
        Self {
            name: &outcome.name,
            source: outcome.source.display().to_string(),
            target: outcome.target.display().to_string(),
            status,
            summary: outcome.result().map(|r| r.summary()),
            error: outcome.error(),
        }
    }
}

/// Renders one line per test case
pub struct SessionReport {
    format: OutputFormat,
}

impl SessionReport {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn render(&self, outcomes: &[TestOutcome], writer: &mut dyn Write) -> Result<()> {
        let rows: Vec<OutcomeView<'_>> = outcomes.iter().map(OutcomeView::new).collect();

        match self.format {
            OutputFormat::Terminal => {
                writeln!(writer, "{}", build_table(&rows))?;
                let failed = rows.iter().filter(|r| r.status == "error").count();
                let differing = rows.iter().filter(|r| r.status == "differences").count();
                writeln!(
                    writer,
                    "{} tests: {} passed, {} with differences, {} failed",
                    rows.len(),
                    rows.len() - failed - differing,
                    differing,
                    failed
                )?;
            }
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut *writer, &rows)?;
                writeln!(writer)?;
            }
            OutputFormat::Html => {
                let mut ctx = Context::new();
                ctx.insert("css", CSS_STYLES);
                ctx.insert("rows", &rows);
                let html = Tera::one_off(TEMPLATE, &ctx, true)
                    .context("Failed to render HTML session report")?;
                writer.write_all(html.as_bytes())?;
            }
            OutputFormat::Xlsx => XlsxReport::new().render_session(outcomes, writer)?,
        }

        Ok(())
    }
}

fn build_table(rows: &[OutcomeView<'_>]) -> String {
    let mut builder = Builder::default();
    builder.push_record(
        [
            "test", "status", "source rows", "target rows", "added", "removed", "changed",
            "unchanged",
        ]
        .map(String::from),
    );

    for row in rows {
        let counts = match row.summary {
            Some(s) => [
                s.source_rows,
                s.target_rows,
                s.added,
                s.removed,
                s.changed,
                s.unchanged,
            ]
            .map(|n| n.to_string()),
            None => std::array::from_fn(|_| "-".to_string()),
        };
        let status = match row.error {
            Some(error) => format!("{}: {}", row.status, error),
            None => row.status.to_string(),
        };

        let mut record = vec![row.name.to_string(), status];
        record.extend(counts);
        builder.push_record(record);
    }

    let mut table = builder.build();
    table.with(Style::modern());
    table.to_string()
}
