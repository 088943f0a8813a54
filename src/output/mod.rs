//! Report exporters for comparison results

mod html;
mod json;
mod session;
mod terminal;
mod xlsx;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use termcolor::ColorChoice;

use crate::config::OutputFormat;
use crate::diff::ComparisonResult;

pub use html::HtmlReport;
pub use json::JsonReport;
pub use session::SessionReport;
pub use terminal::TerminalReport;
pub use xlsx::XlsxReport;

/// Labels shown around a rendered result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportContext {
    pub title: String,
    pub source_label: String,
    pub target_label: String,
}

impl ReportContext {
    pub fn new(source_label: impl Into<String>, target_label: impl Into<String>) -> Self {
        Self {
            title: "tabcompare".to_string(),
            source_label: source_label.into(),
            target_label: target_label.into(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

/// Trait for report exporters
pub trait ReportExporter {
    /// Render a comparison result to a writer
    fn render(
        &self,
        result: &ComparisonResult,
        context: &ReportContext,
        writer: &mut dyn Write,
    ) -> Result<()>;
}

/// Factory for creating report exporters
pub struct OutputFactory;

impl OutputFactory {
    /// Create an exporter based on format type
    pub fn create(format: OutputFormat) -> Box<dyn ReportExporter> {
        match format {
            OutputFormat::Terminal => Box::new(TerminalReport::new()),
            OutputFormat::Json => Box::new(JsonReport::new()),
            OutputFormat::Html => Box::new(HtmlReport::new()),
            OutputFormat::Xlsx => Box::new(XlsxReport::new()),
        }
    }
}

/// Render a comparison result to stdout
pub fn render_to_stdout(
    result: &ComparisonResult,
    context: &ReportContext,
    format: OutputFormat,
) -> Result<()> {
    if format == OutputFormat::Xlsx {
        bail!("XLSX reports must be written to a file (use --output)");
    }
    let exporter = OutputFactory::create(format);
    let mut stdout = std::io::stdout().lock();
    exporter.render(result, context, &mut stdout)
}

/// Render a comparison result to a file; terminal output is written uncolored
pub fn render_to_path(
    result: &ComparisonResult,
    context: &ReportContext,
    format: OutputFormat,
    path: &Path,
) -> Result<()> {
    let exporter: Box<dyn ReportExporter> = match format {
        OutputFormat::Terminal => Box::new(TerminalReport::with_color_choice(ColorChoice::Never)),
        other => OutputFactory::create(other),
    };

    let file = File::create(path)
        .with_context(|| format!("Failed to create report file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    exporter.render(result, context, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Stylesheet shared by the HTML reports
pub(crate) const CSS_STYLES: &str = r#"
    :root {
      --bg: #1a1b26;
      --fg: #a9b1d6;
      --accent: #7aa2f7;
      --green: #9ece6a;
      --red: #f7768e;
      --yellow: #e0af68;
      --border: #414868;
    }
    * { box-sizing: border-box; margin: 0; padding: 0; }
    body {
      font-family: 'JetBrains Mono', 'Fira Code', monospace;
      background: var(--bg);
      color: var(--fg);
      padding: 2rem;
      line-height: 1.6;
    }
    .header { border-bottom: 2px solid var(--border); padding-bottom: 1rem; margin-bottom: 2rem; }
    .header h1 { color: var(--accent); font-size: 2rem; font-weight: 600; }
    .header .files { opacity: 0.8; margin-top: 0.5rem; }
    .summary { display: flex; gap: 2rem; margin-bottom: 2rem; }
    .stat { display: flex; flex-direction: column; padding: 1rem; border-radius: 8px; background: rgba(255,255,255,0.05); }
    .stat .num { font-size: 1.5rem; font-weight: 600; }
    .stat.added .num { color: var(--green); }
    .stat.removed .num { color: var(--red); }
    .stat.changed .num { color: var(--yellow); }
    .section { margin-bottom: 2rem; }
    .section h2 {
      color: var(--accent);
      font-size: 1.25rem;
      margin-bottom: 1rem;
      padding-bottom: 0.5rem;
      border-bottom: 1px solid var(--border);
    }
    table { width: 100%; border-collapse: collapse; margin-bottom: 1rem; }
    th, td { text-align: left; padding: 0.75rem; border: 1px solid var(--border); }
    th { background: rgba(255,255,255,0.05); font-weight: 600; }
    table.added tr:not(:first-child) { background: rgba(158, 206, 106, 0.1); }
    table.removed tr:not(:first-child) { background: rgba(247, 118, 142, 0.1); }
    tr.failed td { color: var(--red); }
    .changed-row { margin-bottom: 1.5rem; padding: 1rem; background: rgba(255,255,255,0.02); border-radius: 8px; }
    .changed-row h3 { color: var(--yellow); margin-bottom: 0.5rem; }
    .changes td.old { background: rgba(247, 118, 142, 0.15); color: var(--red); }
    .changes td.new { background: rgba(158, 206, 106, 0.15); color: var(--green); }
    ul { list-style: none; padding-left: 1rem; }
    ul li::before { content: "→"; margin-right: 0.5rem; color: var(--accent); }
"#;
