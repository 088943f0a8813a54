//! HTML report output

use std::io::Write;

use anyhow::{Context as _, Result};
use serde::Serialize;
use tera::{Context, Tera};

use crate::config::ResultDetail;
use crate::diff::{cell_diff::percentage_change, CellDiffKind, ComparisonResult, RowRecord};

use super::{ReportContext, ReportExporter, CSS_STYLES};

const TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>{{ title }}: {{ source }} → {{ target }}</title>
  <style>{{ css | safe }}</style>
</head>
<body>
  <div class="header">
    <h1>{{ title }}</h1>
    <p class="files">{{ source }} → {{ target }}</p>
  </div>
  <div class="summary">
    <div class="stat added"><span class="num">+{{ summary.added }}</span><span class="label">added</span></div>
    <div class="stat removed"><span class="num">-{{ summary.removed }}</span><span class="label">removed</span></div>
    <div class="stat changed"><span class="num">~{{ summary.changed }}</span><span class="label">changed</span></div>
    <div class="stat"><span class="num">{{ summary.unchanged }}</span><span class="label">unchanged</span></div>
    <div class="stat"><span class="num">{{ summary.source_rows }} → {{ summary.target_rows }}</span><span class="label">rows</span></div>
  </div>
{% if schema_mismatches | length > 0 %}
  <div class="section">
    <h2>Schema Differences</h2>
    <ul>
{% for mismatch in schema_mismatches %}      <li>{{ mismatch }}</li>
{% endfor %}    </ul>
  </div>
{% endif %}
{% if column_mismatches | length > 0 %}
  <div class="section">
    <h2>Column Mismatches</h2>
    <table>
      <tr><th>Column</th><th>Mismatches</th></tr>
{% for column in column_mismatches %}      <tr><td>{{ column.name }}</td><td>{{ column.count }}</td></tr>
{% endfor %}    </table>
  </div>
{% endif %}
{% for block in row_blocks %}
  <div class="section">
    <h2>{{ block.title }}</h2>
    <table class="{{ block.class }}">
      <tr>{% for name in block.columns %}<th>{{ name }}</th>{% endfor %}</tr>
{% for row in block.rows %}      <tr>{% for cell in row %}<td>{{ cell }}</td>{% endfor %}</tr>
{% endfor %}    </table>
  </div>
{% endfor %}
{% if changed | length > 0 %}
  <div class="section">
    <h2>Changed Rows</h2>
{% for row in changed %}    <div class="changed-row">
      <h3>{{ row.key }}</h3>
      <table class="changes">
        <tr><th>Column</th><th>Source</th><th>Target</th><th></th></tr>
{% for change in row.changes %}        <tr><td>{{ change.column }}</td><td class="old">{{ change.source }}</td><td class="new">{{ change.target }}</td><td>{{ change.note }}</td></tr>
{% endfor %}      </table>
    </div>
{% endfor %}  </div>
{% endif %}
{% if not has_differences %}
  <p>No differences found.</p>
{% endif %}
</body>
</html>
"#;

/// HTML report output
pub struct HtmlReport;

#[derive(Serialize)]
struct ColumnCount<'a> {
    name: &'a str,
    count: usize,
}

#[derive(Serialize)]
struct RowBlock<'a> {
    title: &'static str,
    class: &'static str,
    columns: &'a [String],
    rows: Vec<Vec<String>>,
}

#[derive(Serialize)]
struct ChangeView<'a> {
    column: &'a str,
    source: String,
    target: String,
    note: String,
}

#[derive(Serialize)]
struct ChangedView<'a> {
    key: String,
    changes: Vec<ChangeView<'a>>,
}

impl HtmlReport {
    pub fn new() -> Self {
        Self
    }

    fn build_context(result: &ComparisonResult, context: &ReportContext) -> Context {
        let mut ctx = Context::new();
        ctx.insert("title", &context.title);
        ctx.insert("source", &context.source_label);
        ctx.insert("target", &context.target_label);
        ctx.insert("css", CSS_STYLES);
        ctx.insert("summary", result.summary());
        ctx.insert("has_differences", &result.has_differences());

        let schema: Vec<String> = result.schema_mismatches().iter().map(|m| m.to_string()).collect();
        ctx.insert("schema_mismatches", &schema);

        let columns: Vec<ColumnCount<'_>> = result
            .column_mismatches()
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(name, count)| ColumnCount { name, count: *count })
            .collect();
        ctx.insert("column_mismatches", &columns);

        let full = result.detail() == ResultDetail::Full;
        let mut blocks = Vec::new();
        if full && !result.added().is_empty() {
            blocks.push(row_block("Added Rows", "added", result.target_columns(), result.added()));
        }
        if full && !result.removed().is_empty() {
            blocks.push(row_block("Removed Rows", "removed", result.source_columns(), result.removed()));
        }
        ctx.insert("row_blocks", &blocks);

        let changed: Vec<ChangedView<'_>> = result
            .changed()
            .iter()
            .map(|row| ChangedView {
                key: row.key.describe(result.key_columns()),
                changes: row
                    .diffs
                    .iter()
                    .map(|diff| ChangeView {
                        column: &diff.column,
                        source: display_raw(diff.source_raw.as_ref()),
                        target: display_raw(diff.target_raw.as_ref()),
                        note: match (&diff.kind, &diff.source, &diff.target) {
                            (CellDiffKind::Value, Some(a), Some(b)) => percentage_change(a, b)
                                .map(|p| format!("{:+.1}%", p))
                                .unwrap_or_default(),
                            (CellDiffKind::Value, _, _) => String::new(),
                            (CellDiffKind::Unnormalizable { .. }, _, _) => "not normalizable".to_string(),
                        },
                    })
                    .collect(),
            })
            .collect();
        ctx.insert("changed", &changed);

        ctx
    }
}

impl Default for HtmlReport {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportExporter for HtmlReport {
    fn render(
        &self,
        result: &ComparisonResult,
        context: &ReportContext,
        writer: &mut dyn Write,
    ) -> Result<()> {
        let ctx = Self::build_context(result, context);
        let html = Tera::one_off(TEMPLATE, &ctx, true).context("Failed to render HTML report")?;
        writer.write_all(html.as_bytes())?;
        Ok(())
    }
}

fn row_block<'a>(
    title: &'static str,
    class: &'static str,
    columns: &'a [String],
    records: &[RowRecord],
) -> RowBlock<'a> {
    RowBlock {
        title,
        class,
        columns,
        rows: records
            .iter()
            .map(|r| r.row.cells.iter().map(|c| c.display().into_owned()).collect())
            .collect(),
    }
}

fn display_raw(value: Option<&crate::model::Value>) -> String {
    value
        .map(|v| v.display().into_owned())
        .unwrap_or_default()
}
