use std::io::{self, Write};

use shared::flows::ResultView;
use shared::markdown::render_report_html;
use shared::models::{AnalysisResult, AnalysisSummary};

pub const EMPTY_STATE: &str = "No analysis data found. Start a new analysis with \
                               `veridia submit --url <URL> --type <ANALYSIS TYPE>`.";

pub const RETRY_HINT: &str = "Run `veridia refresh` to try again.";

pub fn render_view<W: Write>(out: &mut W, view: &ResultView, html: bool) -> io::Result<()> {
    match view {
        ResultView::Empty => writeln!(out, "{EMPTY_STATE}"),
        ResultView::Loading => writeln!(out, "Loading analysis results..."),
        ResultView::Loaded(result) if html => writeln!(out, "{}", render_report_html(result)),
        ResultView::Loaded(result) => render_result_text(out, result),
        ResultView::Failed(err) => {
            writeln!(out, "Error loading analysis: {err}")?;
            writeln!(out, "{RETRY_HINT}")
        }
    }
}

pub fn render_result_text<W: Write>(out: &mut W, result: &AnalysisResult) -> io::Result<()> {
    writeln!(out, "Website Analysis Report [{}]", result.status_label())?;
    writeln!(out, "URL:           {}", result.url())?;
    writeln!(out, "Analysis Type: {}", result.analysis_type_label())?;

    if let Some(summary) = result.summary() {
        writeln!(out)?;
        writeln!(out, "{summary}")?;
    }
    Ok(())
}

pub fn render_history<W: Write>(out: &mut W, rows: &[AnalysisSummary]) -> io::Result<()> {
    if rows.is_empty() {
        return writeln!(out, "No analyses yet.");
    }

    let id_width = rows
        .iter()
        .map(|row| row.id_label().chars().count())
        .max()
        .unwrap_or(0)
        .max("ID".len());

    writeln!(out, "{:<id_width$}  {:<10}  URL", "ID", "STATUS")?;
    for row in rows {
        writeln!(
            out,
            "{:<id_width$}  {:<10}  {}",
            row.id_label(),
            row.status.as_deref().unwrap_or("-"),
            row.url.as_deref().unwrap_or("-"),
        )?;
    }
    writeln!(out, "{} analyses", rows.len())
}
