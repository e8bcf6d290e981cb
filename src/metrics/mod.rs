//! Observability hooks
//!
//! Engines recover from sub-fetch failures locally. Every such failure is
//! handed to a [`SearchObserver`] so operators can see it; the default
//! observer emits `tracing` events, [`Metrics`] keeps counters.

use crate::error::SearchError;
use crate::results::FileType;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use tracing::{debug, warn};

/// The part of a search a report refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Organic result fetch
    Organic,
    /// Image result fetch
    Images,
    /// Per-result page visit for an image
    Enrichment,
    /// Filetype-qualified query
    Files(FileType),
    /// Browser launch or context creation
    Session,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Organic => f.write_str("organic"),
            Self::Images => f.write_str("images"),
            Self::Enrichment => f.write_str("enrichment"),
            Self::Files(ft) => write!(f, "files:{}", ft),
            Self::Session => f.write_str("session"),
        }
    }
}

/// Receives reports about sub-fetch outcomes
pub trait SearchObserver: Send + Sync {
    /// A sub-fetch failed and was degraded to an empty result
    fn on_failure(&self, engine: &str, stage: Stage, error: &SearchError);

    /// A sub-fetch completed with `items` records
    fn on_success(&self, _engine: &str, _stage: Stage, _items: usize) {}
}

/// Observer that logs through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl SearchObserver for TracingObserver {
    fn on_failure(&self, engine: &str, stage: Stage, error: &SearchError) {
        warn!(engine, stage = %stage, error = %error, "sub-fetch failed");
    }

    fn on_success(&self, engine: &str, stage: Stage, items: usize) {
        debug!(engine, stage = %stage, items, "sub-fetch completed");
    }
}

/// Counters per engine and stage
pub struct Metrics {
    /// Total failures reported
    pub total_failures: AtomicU64,
    failures: RwLock<HashMap<(String, Stage), u64>>,
    successes: RwLock<HashMap<(String, Stage), u64>>,
}

impl Metrics {
    /// Create a new metrics instance
    pub fn new() -> Self {
        Self {
            total_failures: AtomicU64::new(0),
            failures: RwLock::new(HashMap::new()),
            successes: RwLock::new(HashMap::new()),
        }
    }

    /// Failures recorded for an engine stage
    pub fn failures(&self, engine: &str, stage: Stage) -> u64 {
        self.failures
            .read()
            .map(|m| m.get(&(engine.to_string(), stage)).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Successes recorded for an engine stage
    pub fn successes(&self, engine: &str, stage: Stage) -> u64 {
        self.successes
            .read()
            .map(|m| m.get(&(engine.to_string(), stage)).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Get total failures
    pub fn get_total_failures(&self) -> u64 {
        self.total_failures.load(Ordering::Relaxed)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchObserver for Metrics {
    fn on_failure(&self, engine: &str, stage: Stage, error: &SearchError) {
        TracingObserver.on_failure(engine, stage, error);
        self.total_failures.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut failures) = self.failures.write() {
            *failures.entry((engine.to_string(), stage)).or_insert(0) += 1;
        }
    }

    fn on_success(&self, engine: &str, stage: Stage, items: usize) {
        TracingObserver.on_success(engine, stage, items);
        if let Ok(mut successes) = self.successes.write() {
            *successes.entry((engine.to_string(), stage)).or_insert(0) += 1;
        }
    }
}
