//! Markdown rendering for analysis summaries.

use maud::{DOCTYPE, Markup, PreEscaped, html};
use pulldown_cmark::{Event, Options, Parser, html as md_html};

use crate::models::AnalysisResult;

/// Render markdown to an HTML fragment.
///
/// Tables, footnotes, strikethrough and task lists are enabled. Raw HTML in the
/// source is emitted as escaped text, never as markup.
pub fn render_markdown(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });
    let mut html_output = String::with_capacity(markdown.len() * 2);
    md_html::push_html(&mut html_output, parser);
    html_output
}

/// Render a standalone report page for one analysis.
pub fn render_report_html(result: &AnalysisResult) -> String {
    report_page(result).into_string()
}

fn report_page(result: &AnalysisResult) -> Markup {
    let summary = result.summary().map(render_markdown);

    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                title { "Website Analysis Report" }
            }
            body {
                header {
                    h1 { "Website Analysis Report" }
                    p class="status" { (result.status_label()) }
                }
                dl {
                    dt { "Analyzed URL" }
                    dd {
                        @if is_http_url(result.url()) {
                            a href=(result.url()) rel="noopener noreferrer" { (result.url()) }
                        } @else {
                            (result.url())
                        }
                    }
                    dt { "Analysis Type" }
                    dd { (result.analysis_type_label()) }
                }
                @if let Some(summary) = summary {
                    section class="summary" {
                        h2 { "AI Analysis Summary" }
                        (PreEscaped(summary))
                    }
                }
            }
        }
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}
