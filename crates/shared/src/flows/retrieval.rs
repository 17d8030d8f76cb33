use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::analyzer::{AnalyzerApi, ApiError};
use crate::export::ExportedReport;
use crate::models::{AnalysisResult, SessionHandle};
use crate::request_state::{Invocation, RequestHook};
use crate::session::{SessionStore, SessionStoreError};

/// When a failed fetch-by-id discards the stored handle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EvictionPolicy {
    #[default]
    AnyError,
    NotFoundOnly,
}

impl EvictionPolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "any_error" | "any" => Some(Self::AnyError),
            "not_found" | "not_found_only" => Some(Self::NotFoundOnly),
            _ => None,
        }
    }

    pub fn should_evict(self, error: &ApiError) -> bool {
        match self {
            Self::AnyError => true,
            Self::NotFoundOnly => error.is_not_found(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum ResultView {
    #[default]
    Empty,
    Loading,
    Loaded(AnalysisResult),
    Failed(ApiError),
}

impl ResultView {
    pub fn result(&self) -> Option<&AnalysisResult> {
        match self {
            Self::Loaded(result) => Some(result),
            _ => None,
        }
    }
}

/// The displayed view plus the ticket of the fetch allowed to settle it.
#[derive(Debug, Default)]
struct ViewSlot {
    ticket: u64,
    view: ResultView,
}

pub struct RetrievalFlow {
    api: Arc<dyn AnalyzerApi>,
    store: Arc<dyn SessionStore>,
    policy: EvictionPolicy,
    hook: RequestHook<AnalysisResult>,
    view: Mutex<ViewSlot>,
}

impl RetrievalFlow {
    pub fn new(
        api: Arc<dyn AnalyzerApi>,
        store: Arc<dyn SessionStore>,
        policy: EvictionPolicy,
    ) -> Self {
        Self {
            api,
            store,
            policy,
            hook: RequestHook::new(),
            view: Mutex::new(ViewSlot::default()),
        }
    }

    pub fn view(&self) -> ResultView {
        self.lock_view().view.clone()
    }

    /// Initial load: an absent handle renders the empty state without a request.
    pub async fn load(&self) -> Result<ResultView, SessionStoreError> {
        match self.store.get()? {
            Some(handle) => self.fetch(handle).await,
            None => {
                info!("no stored analysis handle");
                self.begin_view(ResultView::Empty);
                Ok(ResultView::Empty)
            }
        }
    }

    /// Manual refresh. Without a handle nothing is requested and the view is kept.
    pub async fn refresh(&self) -> Result<ResultView, SessionStoreError> {
        match self.store.get()? {
            Some(handle) => self.fetch(handle).await,
            None => Ok(self.view()),
        }
    }

    pub fn export(&self, now: DateTime<Utc>) -> Option<ExportedReport> {
        self.lock_view()
            .view
            .result()
            .map(|result| ExportedReport::from_result(result, now))
    }

    async fn fetch(&self, handle: SessionHandle) -> Result<ResultView, SessionStoreError> {
        let ticket = self.begin_view(ResultView::Loading);
        info!(analysis_id = %handle, "fetching analysis");

        let outcome = self
            .hook
            .invoke(self.api.fetch_analysis(handle.as_str()))
            .await;

        match outcome {
            Invocation::Superseded => Ok(self.view()),
            Invocation::Applied(Ok(result)) => {
                Ok(self.settle_view(ticket, ResultView::Loaded(result)))
            }
            Invocation::Applied(Err(err)) => {
                warn!(analysis_id = %handle, "failed to fetch analysis: {err}");
                let evict = self.policy.should_evict(&err);
                let view = self.settle_view(ticket, ResultView::Failed(err));

                // A handle stored by a newer submission while this fetch was in flight stays.
                if evict && self.store.clear_if(&handle)? {
                    info!(analysis_id = %handle, "discarded stored analysis handle");
                }
                Ok(view)
            }
        }
    }

    /// Replaces the view and invalidates any fetch still waiting to settle it.
    fn begin_view(&self, view: ResultView) -> u64 {
        let mut slot = self.lock_view();
        slot.ticket += 1;
        slot.view = view;
        slot.ticket
    }

    /// Writes `next` only if no newer view began since `ticket`; returns the view now shown.
    fn settle_view(&self, ticket: u64, next: ResultView) -> ResultView {
        let mut slot = self.lock_view();
        if slot.ticket == ticket {
            slot.view = next;
        }
        slot.view.clone()
    }

    fn lock_view(&self) -> MutexGuard<'_, ViewSlot> {
        self.view
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
