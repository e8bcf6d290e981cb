//! Ownership of long-lived engine resources
//!
//! [`ResourceSlot`] holds the HTTP client or browser handle of one engine
//! instance. Once taken by `close`, the slot stays closed and every later
//! access fails with [`SearchError::ResourceClosed`].

use crate::engines::SearchEngine;
use crate::error::{Result, SearchError};
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

enum SlotState<T> {
    Vacant,
    Ready(T),
    Closed,
}

/// A resource owned by a single engine instance
pub struct ResourceSlot<T> {
    owner: String,
    state: Mutex<SlotState<T>>,
    closed: AtomicBool,
}

impl<T: Clone> ResourceSlot<T> {
    /// A slot holding an already acquired resource
    pub fn ready(owner: impl Into<String>, value: T) -> Self {
        Self::with_state(owner, SlotState::Ready(value))
    }

    /// A slot whose resource is acquired on first use
    pub fn vacant(owner: impl Into<String>) -> Self {
        Self::with_state(owner, SlotState::Vacant)
    }

    fn with_state(owner: impl Into<String>, state: SlotState<T>) -> Self {
        Self {
            owner: owner.into(),
            state: Mutex::new(state),
            closed: AtomicBool::new(false),
        }
    }

    /// Get the resource
    pub async fn get(&self) -> Result<T> {
        match &*self.state.lock().await {
            SlotState::Ready(value) => Ok(value.clone()),
            SlotState::Vacant => Err(SearchError::Transport(format!(
                "{} has no active session",
                self.owner
            ))),
            SlotState::Closed => Err(self.closed_error()),
        }
    }

    /// Get the resource, acquiring it with `init` if the slot is vacant.
    ///
    /// The slot stays locked while `init` runs, so concurrent callers share
    /// a single acquisition. A failed `init` leaves the slot vacant.
    pub async fn get_or_try_init<F, Fut>(&self, init: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut state = self.state.lock().await;
        match &*state {
            SlotState::Ready(value) => Ok(value.clone()),
            SlotState::Closed => Err(self.closed_error()),
            SlotState::Vacant => {
                let value = init().await?;
                *state = SlotState::Ready(value.clone());
                Ok(value)
            }
        }
    }

    /// Close the slot, handing back the resource if one was acquired.
    ///
    /// Returns `None` on every call after the first.
    pub async fn take(&self) -> Option<T> {
        let mut state = self.state.lock().await;
        self.closed.store(true, Ordering::SeqCst);
        match std::mem::replace(&mut *state, SlotState::Closed) {
            SlotState::Ready(value) => Some(value),
            SlotState::Vacant | SlotState::Closed => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn closed_error(&self) -> SearchError {
        SearchError::ResourceClosed(self.owner.clone())
    }
}

/// Run `f` with an engine and close the engine afterwards.
///
/// The engine is closed on every exit path: normal return, an `Err`
/// returned by `f`, and a panic inside `f`, which is resumed once the
/// engine has been closed.
pub async fn with_engine<E, F, Fut, T>(engine: E, f: F) -> T
where
    E: SearchEngine + 'static,
    F: FnOnce(Arc<E>) -> Fut,
    Fut: Future<Output = T>,
{
    let engine = Arc::new(engine);
    let outcome = AssertUnwindSafe(f(Arc::clone(&engine)))
        .catch_unwind()
        .await;

    if let Err(e) = engine.close().await {
        warn!(engine = engine.name(), error = %e, "failed to close engine");
    }

    match outcome {
        Ok(value) => value,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}
