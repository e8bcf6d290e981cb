//! Headless browser sessions
//!
//! The browser-driven engine talks to the browser through three traits:
//! a [`BrowserLauncher`] starts a process, the resulting [`BrowserDriver`]
//! hands out isolated [`BrowsingContext`]s, and a context renders pages.
//! [`ChromiumLauncher`] implements them on top of `chromiumoxide`.

mod chromium;
#[cfg(test)]
pub(crate) mod testing;

pub use chromium::ChromiumLauncher;

use crate::error::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Options used when starting a browser process
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    pub chrome_executable: Option<PathBuf>,
    pub user_agent: String,
    pub window_size: (u32, u32),
}

impl LaunchOptions {
    pub fn new(headless: bool, user_agent: impl Into<String>) -> Self {
        Self {
            headless,
            chrome_executable: None,
            user_agent: user_agent.into(),
            window_size: (1366, 768),
        }
    }
}

/// A single page load
#[derive(Debug, Clone)]
pub struct PageRequest {
    /// Page to navigate to
    pub url: String,
    /// Upper bound for navigation, load and settle together
    pub timeout: Duration,
    /// Extra wait after load for scripts that fill the page in
    pub settle: Option<Duration>,
}

impl PageRequest {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
            settle: None,
        }
    }

    pub fn settle(mut self, settle: Duration) -> Self {
        self.settle = Some(settle);
        self
    }
}

/// Starts browser processes
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, options: &LaunchOptions) -> Result<Arc<dyn BrowserDriver>>;
}

/// A running browser process
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Open a context that shares no cookies or storage with any other
    async fn new_context(&self) -> Result<Box<dyn BrowsingContext>>;

    /// Stop the browser process
    async fn shutdown(&self) -> Result<()>;
}

/// An isolated browsing context inside a running browser
#[async_trait]
pub trait BrowsingContext: Send + Sync {
    /// Open a new page, load `request.url` and return the rendered HTML.
    ///
    /// The page is closed before returning, whatever the outcome.
    async fn render(&self, request: &PageRequest) -> Result<String>;

    /// Dispose of the context and every page still open in it
    async fn close(self: Box<Self>) -> Result<()>;
}
