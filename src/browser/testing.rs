//! In-memory browser used by engine tests

use super::{BrowserDriver, BrowserLauncher, BrowsingContext, LaunchOptions, PageRequest};
use crate::error::{Result, SearchError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// A recorded page load
#[derive(Debug, Clone)]
pub struct Visit {
    pub url: String,
    pub started: Instant,
    pub finished: Instant,
}

enum Reply {
    Html(String),
    Fail,
}

/// Shared state of a [`FakeLauncher`], inspectable after the engine owns it
#[derive(Default)]
pub struct FakeState {
    routes: Mutex<Vec<(String, Reply)>>,
    log: Mutex<Vec<Visit>>,
    pub launches: AtomicUsize,
    pub shutdowns: AtomicUsize,
    pub contexts_opened: AtomicUsize,
    pub contexts_closed: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub fail_launch: std::sync::atomic::AtomicBool,
}

impl FakeState {
    pub fn visited_urls(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .map(|v| v.url.clone())
            .collect()
    }

    pub fn visits(&self) -> Vec<Visit> {
        self.log.lock().unwrap().clone()
    }
}

/// Serves canned pages keyed by a URL substring
#[derive(Clone, Default)]
pub struct FakeLauncher {
    pub state: Arc<FakeState>,
    delay: Duration,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time every page load takes
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Serve `html` for URLs containing `needle`; earlier routes win
    pub fn route(self, needle: &str, html: impl Into<String>) -> Self {
        self.state
            .routes
            .lock()
            .unwrap()
            .push((needle.to_string(), Reply::Html(html.into())));
        self
    }

    /// Fail navigation for URLs containing `needle`
    pub fn fail(self, needle: &str) -> Self {
        self.state
            .routes
            .lock()
            .unwrap()
            .push((needle.to_string(), Reply::Fail));
        self
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self, _options: &LaunchOptions) -> Result<Arc<dyn BrowserDriver>> {
        if self.state.fail_launch.load(Ordering::SeqCst) {
            return Err(SearchError::Browser("no browser binary".into()));
        }
        self.state.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FakeBrowser {
            state: Arc::clone(&self.state),
            delay: self.delay,
        }))
    }
}

struct FakeBrowser {
    state: Arc<FakeState>,
    delay: Duration,
}

#[async_trait]
impl BrowserDriver for FakeBrowser {
    async fn new_context(&self) -> Result<Box<dyn BrowsingContext>> {
        self.state.contexts_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeContext {
            state: Arc::clone(&self.state),
            delay: self.delay,
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        self.state.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FakeContext {
    state: Arc<FakeState>,
    delay: Duration,
}

#[async_trait]
impl BrowsingContext for FakeContext {
    async fn render(&self, request: &PageRequest) -> Result<String> {
        let now = self.state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let started = Instant::now();
        tokio::time::sleep(self.delay).await;
        self.state.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.state.log.lock().unwrap().push(Visit {
            url: request.url.clone(),
            started,
            finished: Instant::now(),
        });

        let routes = self.state.routes.lock().unwrap();
        match routes.iter().find(|(needle, _)| request.url.contains(needle.as_str())) {
            Some((_, Reply::Html(html))) => Ok(html.clone()),
            Some((_, Reply::Fail)) => Err(SearchError::Timeout(request.timeout)),
            None => Ok("<html><body></body></html>".to_string()),
        }
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.state.contexts_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
