//! Chromium sessions driven over CDP

use super::{BrowserDriver, BrowserLauncher, BrowsingContext, LaunchOptions, PageRequest};
use crate::error::{Result, SearchError};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams,
    DisposeBrowserContextParams,
};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Launches Chromium with flags that keep automation less visible
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromiumLauncher;

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self, options: &LaunchOptions) -> Result<Arc<dyn BrowserDriver>> {
        let (width, height) = options.window_size;
        let mut builder = BrowserConfig::builder()
            .window_size(width, height)
            .args(launch_args(options));

        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(ref path) = options.chrome_executable {
            builder = builder.chrome_executable(path);
        }

        let config = builder
            .build()
            .map_err(|e| SearchError::Browser(format!("invalid browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(config).await?;
        info!(headless = options.headless, "browser launched");

        // The CDP connection only makes progress while the handler is polled
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("CDP handler error (continuing): {}", e);
                }
            }
            debug!("CDP handler task completed");
        });

        Ok(Arc::new(ChromiumBrowser {
            browser: Arc::new(Mutex::new(browser)),
            handler_task: std::sync::Mutex::new(Some(handler_task)),
        }))
    }
}

fn launch_args(options: &LaunchOptions) -> Vec<String> {
    vec![
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--disable-blink-features=AutomationControlled".to_string(),
        "--no-first-run".to_string(),
        "--disable-default-apps".to_string(),
        format!("--user-agent={}", options.user_agent),
    ]
}

struct ChromiumBrowser {
    browser: Arc<Mutex<Browser>>,
    handler_task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl ChromiumBrowser {
    fn stop_handler(&self) {
        if let Ok(mut task) = self.handler_task.lock() {
            if let Some(task) = task.take() {
                task.abort();
            }
        }
    }
}

#[async_trait]
impl BrowserDriver for ChromiumBrowser {
    async fn new_context(&self) -> Result<Box<dyn BrowsingContext>> {
        let response = self
            .browser
            .lock()
            .await
            .execute(CreateBrowserContextParams::default())
            .await?;

        Ok(Box::new(ChromiumContext {
            browser: Arc::clone(&self.browser),
            id: response.result.browser_context_id,
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        let mut browser = self.browser.lock().await;
        let closed = browser.close().await;
        if let Err(e) = browser.wait().await {
            debug!("browser wait failed: {}", e);
        }
        self.stop_handler();
        info!("browser closed");

        closed.map(|_| ()).map_err(SearchError::from)
    }
}

impl Drop for ChromiumBrowser {
    fn drop(&mut self) {
        self.stop_handler();
    }
}

struct ChromiumContext {
    browser: Arc<Mutex<Browser>>,
    id: BrowserContextId,
}

#[async_trait]
impl BrowsingContext for ChromiumContext {
    async fn render(&self, request: &PageRequest) -> Result<String> {
        let mut params = CreateTargetParams::new("about:blank");
        params.browser_context_id = Some(self.id.clone());
        let page = self.browser.lock().await.new_page(params).await?;

        let outcome = tokio::time::timeout(request.timeout, async {
            page.goto(request.url.as_str()).await?;
            page.wait_for_navigation().await?;
            if let Some(settle) = request.settle {
                tokio::time::sleep(settle).await;
            }
            page.content().await
        })
        .await;

        if let Err(e) = page.close().await {
            debug!("page close failed: {}", e);
        }

        match outcome {
            Ok(html) => Ok(html?),
            Err(_) => Err(SearchError::Timeout(request.timeout)),
        }
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.browser
            .lock()
            .await
            .execute(DisposeBrowserContextParams::new(self.id.clone()))
            .await?;
        Ok(())
    }
}
