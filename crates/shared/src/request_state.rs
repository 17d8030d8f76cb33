//! Observable request state shared by every flow.
//!
//! A [`RequestHook`] tracks `{data, error, loading}` for one kind of request.
//! Each `invoke` takes a new generation; a completion whose generation is no
//! longer current is discarded instead of overwriting newer state.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::analyzer::ApiError;

#[derive(Debug, Clone, PartialEq)]
pub struct RequestSnapshot<T> {
    pub data: Option<T>,
    pub error: Option<ApiError>,
    pub loading: bool,
}

impl<T> Default for RequestSnapshot<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            loading: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Invocation<T> {
    Applied(Result<T, ApiError>),
    /// A newer `invoke` or a `reset` happened while this one was in flight.
    Superseded,
}

impl<T> Invocation<T> {
    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded)
    }
}

#[derive(Debug)]
struct HookInner<T> {
    generation: AtomicU64,
    state: Mutex<RequestSnapshot<T>>,
}

#[derive(Debug)]
pub struct RequestHook<T> {
    inner: Arc<HookInner<T>>,
}

impl<T> Clone for RequestHook<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for RequestHook<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RequestHook<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HookInner {
                generation: AtomicU64::new(0),
                state: Mutex::new(RequestSnapshot::default()),
            }),
        }
    }

    pub fn reset(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        *self.lock() = RequestSnapshot::default();
    }

    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    fn lock(&self) -> MutexGuard<'_, RequestSnapshot<T>> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner.generation.load(Ordering::SeqCst) == generation
    }
}

impl<T: Clone> RequestHook<T> {
    pub fn snapshot(&self) -> RequestSnapshot<T> {
        self.lock().clone()
    }

    pub async fn invoke<F>(&self, request: F) -> Invocation<T>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        let generation = {
            let mut state = self.lock();
            let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
            state.loading = true;
            state.error = None;
            state.data = None;
            generation
        };

        let mut guard = LoadingGuard {
            hook: self,
            generation,
            armed: true,
        };
        let outcome = request.await;
        guard.armed = false;

        let mut state = self.lock();
        if !self.is_current(generation) {
            return Invocation::Superseded;
        }

        match &outcome {
            Ok(data) => state.data = Some(data.clone()),
            Err(err) => state.error = Some(err.clone()),
        }
        state.loading = false;
        Invocation::Applied(outcome)
    }
}

/// Clears `loading` when an invocation is dropped before it completes.
struct LoadingGuard<'a, T> {
    hook: &'a RequestHook<T>,
    generation: u64,
    armed: bool,
}

impl<T> Drop for LoadingGuard<'_, T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.hook.lock();
        if self.hook.is_current(self.generation) {
            state.loading = false;
        }
    }
}
