use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::analyzer::{AnalyzerApi, ApiError};
use crate::models::{AnalysisForm, AnalysisRequest, CreatedAnalysis, SessionHandle};
use crate::request_state::{Invocation, RequestHook, RequestSnapshot};
use crate::session::{SessionStore, SessionStoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    Url,
    AnalysisType,
}

impl MissingField {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::AnalysisType => "analysis type",
        }
    }
}

/// Where the caller should go next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    ResultView,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Accepted { handle: SessionHandle, route: Route },
    /// A later submission started before this one resolved; its response was dropped.
    Superseded,
}

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("please enter both a URL and an analysis type (missing {})", .0.as_str())]
    MissingInput(MissingField),
    #[error("analysis failed: no identifier received from the server")]
    NoIdentifier,
    #[error("analysis failed: {0}")]
    Api(#[from] ApiError),
    #[error("analysis was created but the session handle could not be stored: {0}")]
    Session(#[from] SessionStoreError),
}

pub struct SubmissionFlow {
    api: Arc<dyn AnalyzerApi>,
    store: Arc<dyn SessionStore>,
    model: String,
    hook: RequestHook<CreatedAnalysis>,
}

impl SubmissionFlow {
    pub fn new(
        api: Arc<dyn AnalyzerApi>,
        store: Arc<dyn SessionStore>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api,
            store,
            model: model.into(),
            hook: RequestHook::new(),
        }
    }

    pub fn state(&self) -> RequestSnapshot<CreatedAnalysis> {
        self.hook.snapshot()
    }

    pub fn reset(&self) {
        self.hook.reset();
    }

    pub async fn submit(&self, form: &AnalysisForm) -> Result<SubmissionOutcome, SubmissionError> {
        validate(form)?;

        let request = AnalysisRequest::from_form(form, &self.model);
        info!(url = %request.url, analysis_type = %request.request_prompt, "submitting analysis");

        let response = async {
            let created = self.api.create_analysis(request).await?;
            if created.identifier().is_none() {
                return Err(ApiError::MissingIdentifier);
            }
            Ok(created)
        };

        let created = match self.hook.invoke(response).await {
            Invocation::Superseded => {
                info!("dropping superseded analysis response");
                return Ok(SubmissionOutcome::Superseded);
            }
            Invocation::Applied(Err(ApiError::MissingIdentifier)) => {
                warn!("analysis response carried no identifier");
                return Err(SubmissionError::NoIdentifier);
            }
            Invocation::Applied(Err(err)) => {
                warn!("analysis submission failed: {err}");
                return Err(err.into());
            }
            Invocation::Applied(Ok(created)) => created,
        };

        let Some(handle) = created.identifier() else {
            return Err(SubmissionError::NoIdentifier);
        };

        self.store.set(&handle)?;
        info!(analysis_id = %handle, "analysis accepted");

        Ok(SubmissionOutcome::Accepted {
            handle,
            route: Route::ResultView,
        })
    }
}

fn validate(form: &AnalysisForm) -> Result<(), SubmissionError> {
    if form.url.trim().is_empty() {
        return Err(SubmissionError::MissingInput(MissingField::Url));
    }
    if form.analysis_type.trim().is_empty() {
        return Err(SubmissionError::MissingInput(MissingField::AnalysisType));
    }
    Ok(())
}
