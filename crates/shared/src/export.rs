use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::AnalysisResult;

const EXPORT_ANALYSIS_TYPE_FALLBACK: &str = "General Analysis";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write report {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A markdown report built from the displayed analysis. Purely local.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedReport {
    pub file_name: String,
    pub content: String,
}

impl ExportedReport {
    pub fn from_result(result: &AnalysisResult, now: DateTime<Utc>) -> Self {
        let analysis_type = result
            .request_prompt
            .as_deref()
            .filter(|prompt| !prompt.trim().is_empty())
            .unwrap_or(EXPORT_ANALYSIS_TYPE_FALLBACK);

        let content = format!(
            "# Website Analysis Report\n\n\
             **URL:** {url}\n\
             **Analysis Type:** {analysis_type}\n\
             **Date:** {date}\n\n\
             ## Analysis Results\n\n\
             {summary}",
            url = result.url(),
            date = now.format("%Y-%m-%d"),
            summary = result.analysis_summary.as_deref().unwrap_or_default(),
        );

        Self {
            file_name: format!("website-analysis-{}.md", now.timestamp_millis()),
            content,
        }
    }

    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        let path = dir.join(&self.file_name);
        fs::create_dir_all(dir).map_err(|source| ExportError::Write {
            path: dir.display().to_string(),
            source,
        })?;
        fs::write(&path, &self.content).map_err(|source| ExportError::Write {
            path: path.display().to_string(),
            source,
        })?;
        Ok(path)
    }
}
