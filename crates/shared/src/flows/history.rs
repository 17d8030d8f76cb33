use std::sync::Arc;

use tracing::{info, warn};

use crate::analyzer::{AnalyzerApi, ApiError};
use crate::models::AnalysisSummary;
use crate::request_state::{Invocation, RequestHook, RequestSnapshot};

/// Lists every analysis known to the analyzer service.
pub struct HistoryFlow {
    api: Arc<dyn AnalyzerApi>,
    hook: RequestHook<Vec<AnalysisSummary>>,
}

impl HistoryFlow {
    pub fn new(api: Arc<dyn AnalyzerApi>) -> Self {
        Self {
            api,
            hook: RequestHook::new(),
        }
    }

    pub fn state(&self) -> RequestSnapshot<Vec<AnalysisSummary>> {
        self.hook.snapshot()
    }

    /// `None` means a newer load replaced this one.
    pub async fn load(&self) -> Option<Result<Vec<AnalysisSummary>, ApiError>> {
        match self.hook.invoke(self.api.list_analyses()).await {
            Invocation::Superseded => None,
            Invocation::Applied(Ok(records)) => {
                info!(count = records.len(), "loaded analysis history");
                Some(Ok(records))
            }
            Invocation::Applied(Err(err)) => {
                warn!("failed to load analysis history: {err}");
                Some(Err(err))
            }
        }
    }
}
