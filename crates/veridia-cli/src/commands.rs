use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use shared::analyzer::{AnalyzerApi, ApiError};
use shared::export::ExportError;
use shared::flows::{
    EvictionPolicy, HistoryFlow, ResultView, RetrievalFlow, Route, SubmissionError,
    SubmissionFlow, SubmissionOutcome,
};
use shared::models::AnalysisForm;
use shared::session::{SessionStore, SessionStoreError};
use thiserror::Error;
use tracing::info;

use crate::cli::Command;
use crate::output::{EMPTY_STATE, RETRY_HINT, render_history, render_view};

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error("failed to load analysis: {0}")]
    Load(ApiError),
    #[error("failed to list analyses: {0}")]
    List(ApiError),
    #[error("session store error: {0}")]
    Session(#[from] SessionStoreError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("nothing to export: no analysis is stored for this session")]
    NothingToExport,
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

/// Everything a command needs; the analyzer and the session store are injected.
pub struct App {
    pub api: Arc<dyn AnalyzerApi>,
    pub store: Arc<dyn SessionStore>,
    pub model: String,
    pub eviction_policy: EvictionPolicy,
}

impl App {
    pub async fn run<W: Write>(&self, command: &Command, out: &mut W) -> Result<(), CommandError> {
        info!(command = command.name(), "running command");

        match command {
            Command::Submit {
                url,
                analysis_type,
                follow,
            } => {
                self.submit(&AnalysisForm::new(url.as_str(), analysis_type.as_str()), *follow, out)
                    .await
            }
            Command::Show { html } => {
                let view = self.retrieval().load().await?;
                finish_view(out, &view, *html)
            }
            Command::Refresh { html } => {
                let view = self.retrieval().refresh().await?;
                finish_view(out, &view, *html)
            }
            Command::Export { out_dir } => self.export(out_dir, out).await,
            Command::List => self.list(out).await,
            Command::Clear => {
                self.store.clear()?;
                writeln!(out, "Cleared the stored analysis.")?;
                Ok(())
            }
        }
    }

    async fn submit<W: Write>(
        &self,
        form: &AnalysisForm,
        follow: bool,
        out: &mut W,
    ) -> Result<(), CommandError> {
        let flow = SubmissionFlow::new(self.api.clone(), self.store.clone(), self.model.clone());

        match flow.submit(form).await? {
            SubmissionOutcome::Accepted { handle, route } => {
                writeln!(out, "Analysis submitted (id {handle}).")?;
                if follow && route == Route::ResultView {
                    writeln!(out)?;
                    let view = self.retrieval().load().await?;
                    return finish_view(out, &view, false);
                }
                Ok(())
            }
            SubmissionOutcome::Superseded => {
                writeln!(out, "A newer submission replaced this one.")?;
                Ok(())
            }
        }
    }

    async fn export<W: Write>(&self, out_dir: &Path, out: &mut W) -> Result<(), CommandError> {
        let flow = self.retrieval();
        match flow.load().await? {
            ResultView::Failed(err) => return Err(CommandError::Load(err)),
            ResultView::Empty | ResultView::Loading => return Err(CommandError::NothingToExport),
            ResultView::Loaded(_) => {}
        }

        let report = flow
            .export(Utc::now())
            .ok_or(CommandError::NothingToExport)?;
        let path = report.write_to(out_dir)?;
        writeln!(out, "Exported report to {}", path.display())?;
        Ok(())
    }

    async fn list<W: Write>(&self, out: &mut W) -> Result<(), CommandError> {
        let flow = HistoryFlow::new(self.api.clone());
        match flow.load().await {
            Some(Ok(rows)) => Ok(render_history(out, &rows)?),
            Some(Err(err)) => Err(CommandError::List(err)),
            None => Ok(()),
        }
    }

    fn retrieval(&self) -> RetrievalFlow {
        RetrievalFlow::new(self.api.clone(), self.store.clone(), self.eviction_policy)
    }
}

fn finish_view<W: Write>(out: &mut W, view: &ResultView, html: bool) -> Result<(), CommandError> {
    match view {
        ResultView::Failed(err) => {
            writeln!(out, "{RETRY_HINT}")?;
            Err(CommandError::Load(err.clone()))
        }
        ResultView::Empty => {
            writeln!(out, "{EMPTY_STATE}")?;
            Ok(())
        }
        _ => Ok(render_view(out, view, html)?),
    }
}
