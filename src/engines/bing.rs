//! Bing search engine implementation
//!
//! Bing is driven through a real browser. The browser is started on the
//! first search and kept until [`SearchEngine::close`]; each search runs in
//! a fresh browsing context that is disposed when the search ends.

use super::traits::*;
use crate::browser::{
    BrowserDriver, BrowserLauncher, BrowsingContext, ChromiumLauncher, LaunchOptions, PageRequest,
};
use crate::config::Settings;
use crate::error::{Result, SearchError};
use crate::lifecycle::ResourceSlot;
use crate::metrics::{SearchObserver, Stage, TracingObserver};
use crate::network::generate_user_agent;
use crate::results::{FileResult, FileType, ImageResult, OrganicResult, SearchResponse};
use crate::search::aggregate::settle;
use crate::search::SearchQuery;
use async_trait::async_trait;
use base64::Engine as _;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

static RESULTS_CONTAINER: Lazy<Selector> = Lazy::new(|| Selector::parse("#b_results").unwrap());
static RESULT: Lazy<Selector> = Lazy::new(|| Selector::parse("li.b_algo").unwrap());
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("h2 a").unwrap());
static SNIPPET: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());
static THUMBNAIL: Lazy<Selector> = Lazy::new(|| Selector::parse("a.iusc").unwrap());

/// Bing web, image and document search through a headless browser
pub struct Bing {
    base_url: String,
    organic_timeout: Duration,
    image_timeout: Duration,
    file_timeout: Duration,
    image_settle: Duration,
    file_types: Vec<FileType>,
    launcher: Arc<dyn BrowserLauncher>,
    options: LaunchOptions,
    browser: ResourceSlot<Arc<dyn BrowserDriver>>,
    observer: Arc<dyn SearchObserver>,
}

impl Bing {
    pub fn new(headless: bool) -> Result<Self> {
        let mut settings = Settings::default();
        settings.bing.headless = headless;
        Self::with_settings(&settings)
    }

    pub fn with_settings(settings: &Settings) -> Result<Self> {
        Self::with_launcher(settings, Arc::new(ChromiumLauncher))
    }

    /// Use `launcher` to start the browser instead of Chromium.
    ///
    /// Fails with [`SearchError::Configuration`] on invalid timeouts.
    pub fn with_launcher(
        settings: &Settings,
        launcher: Arc<dyn BrowserLauncher>,
    ) -> Result<Self> {
        let bing = &settings.bing;
        let user_agent = settings
            .outgoing
            .user_agent
            .clone()
            .unwrap_or_else(generate_user_agent);

        let mut options = LaunchOptions::new(bing.headless, user_agent);
        options.chrome_executable = bing.chrome_executable.clone();

        Ok(Self {
            base_url: bing.base_url.trim_end_matches('/').to_string(),
            organic_timeout: bing.organic_timeout()?,
            image_timeout: bing.image_timeout()?,
            file_timeout: bing.file_timeout()?,
            image_settle: Duration::from_millis(bing.image_settle_ms),
            file_types: bing.file_types.clone(),
            launcher,
            options,
            browser: ResourceSlot::vacant("bing"),
            observer: Arc::new(TracingObserver),
        })
    }

    /// Report sub-fetch outcomes to `observer`
    pub fn with_observer(mut self, observer: Arc<dyn SearchObserver>) -> Self {
        self.observer = observer;
        self
    }

    async fn browser(&self) -> Result<Arc<dyn BrowserDriver>> {
        self.browser
            .get_or_try_init(|| async {
                let browser = self.launcher.launch(&self.options).await?;
                info!(headless = self.options.headless, "bing browser session started");
                Ok::<_, SearchError>(browser)
            })
            .await
    }

    fn search_url(&self, query: &str) -> String {
        format!("{}/search?q={}", self.base_url, urlencoding::encode(query))
    }

    fn images_url(&self, query: &str) -> String {
        format!(
            "{}/images/search?q={}",
            self.base_url,
            urlencoding::encode(query)
        )
    }

    async fn fetch_organic(
        &self,
        context: &dyn BrowsingContext,
        query: &str,
        count: usize,
    ) -> Result<Vec<OrganicResult>> {
        let request = PageRequest::new(self.search_url(query), self.organic_timeout);
        let html = context.render(&request).await?;
        Ok(parse_organic(&html, count))
    }

    async fn fetch_images(
        &self,
        context: &dyn BrowsingContext,
        query: &str,
        count: usize,
    ) -> Result<Vec<ImageResult>> {
        let request =
            PageRequest::new(self.images_url(query), self.image_timeout).settle(self.image_settle);
        let html = context.render(&request).await?;
        Ok(parse_images(&html, count))
    }

    async fn fetch_files(
        &self,
        context: &dyn BrowsingContext,
        query: &str,
        file_type: FileType,
    ) -> Result<Vec<FileResult>> {
        let qualified = format!("{} filetype:{}", query, file_type.extension());
        let request = PageRequest::new(self.search_url(&qualified), self.file_timeout);
        let html = context.render(&request).await?;

        // Every matching link is kept; the text count only limits `data`
        Ok(parse_organic(&html, usize::MAX)
            .into_iter()
            .filter(|result| file_type.matches_link(&result.link))
            .map(|result| FileResult {
                title: result.title,
                url: result.link,
            })
            .collect())
    }

    /// Run every phase inside one browsing context
    async fn run_phases(
        &self,
        context: &dyn BrowsingContext,
        query: &SearchQuery,
    ) -> SearchResponse {
        let name = self.name();
        let observer = self.observer.as_ref();
        let text_count = query.text_count;
        let image_count = query.image_count_or(self.default_image_count());

        let data = settle(
            name,
            Stage::Organic,
            observer,
            self.fetch_organic(context, &query.query, text_count).await,
        );

        let images = if image_count > 0 {
            settle(
                name,
                Stage::Images,
                observer,
                self.fetch_images(context, &query.query, image_count).await,
            )
        } else {
            Vec::new()
        };

        // One file type at a time
        let mut files = BTreeMap::new();
        for &file_type in &self.file_types {
            let found = settle(
                name,
                Stage::Files(file_type),
                observer,
                self.fetch_files(context, &query.query, file_type).await,
            );
            if !found.is_empty() {
                files.insert(file_type, found);
            }
        }

        SearchResponse::new(data, images, text_count, image_count).with_files(files)
    }
}

/// Extract up to `limit` organic results from a Bing results page
fn parse_organic(html: &str, limit: usize) -> Vec<OrganicResult> {
    let document = Html::parse_document(html);
    let area = document
        .select(&RESULTS_CONTAINER)
        .next()
        .unwrap_or_else(|| document.root_element());

    area.select(&RESULT)
        .filter_map(|element| {
            let title_elem = element.select(&TITLE).next()?;
            let title = title_elem.text().collect::<String>().trim().to_string();
            if title.is_empty() {
                return None;
            }

            let href = title_elem.value().attr("href")?;
            if href.is_empty() || href.starts_with('/') {
                return None;
            }

            let snippet = element
                .select(&SNIPPET)
                .next()
                .map(|p| p.text().collect::<String>().trim().to_string())
                .unwrap_or_default();

            Some(OrganicResult::new(title, decode_bing_url(href)).with_snippet(snippet))
        })
        .take(limit)
        .collect()
}

/// Extract up to `limit` full-size image URLs from an image results page
fn parse_images(html: &str, limit: usize) -> Vec<ImageResult> {
    let document = Html::parse_document(html);

    document
        .select(&THUMBNAIL)
        .filter_map(|element| {
            let metadata = element.value().attr("m")?;
            match serde_json::from_str::<serde_json::Value>(metadata) {
                Ok(json) => json
                    .get("murl")
                    .and_then(|v| v.as_str())
                    .filter(|url| !url.is_empty())
                    .map(str::to_string),
                Err(e) => {
                    debug!("skipping thumbnail with malformed metadata: {}", e);
                    None
                }
            }
        })
        .take(limit)
        .collect()
}

/// Decode Bing's tracking links.
///
/// Links like `https://www.bing.com/ck/a?...&u=a1<base64>&...` carry the
/// destination base64 encoded in `u`, behind an `a1` prefix.
fn decode_bing_url(url: &str) -> String {
    if !url.starts_with("https://www.bing.com/ck/a?") {
        return url.to_string();
    }

    let Ok(parsed) = url::Url::parse(url) else {
        return url.to_string();
    };
    let Some((_, encoded)) = parsed.query_pairs().find(|(k, _)| k == "u") else {
        return url.to_string();
    };

    let Some(payload) = encoded.strip_prefix("a1").filter(|p| !p.is_empty()) else {
        return url.to_string();
    };
    let payload = payload.trim_end_matches('=');

    let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| base64::engine::general_purpose::STANDARD_NO_PAD.decode(payload));

    decoded
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| url.to_string())
}

#[async_trait]
impl SearchEngine for Bing {
    fn name(&self) -> &str {
        "bing"
    }

    fn about(&self) -> EngineAbout {
        EngineAbout::new()
            .website("https://www.bing.com")
            .official_api(false)
            .file_discovery(true)
            .results_format("HTML")
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse> {
        if self.is_closed() {
            return Err(SearchError::ResourceClosed(self.name().to_string()));
        }
        if query.is_empty() {
            return Ok(SearchResponse::empty());
        }

        let browser = match self.browser().await {
            Ok(browser) => browser,
            Err(e @ SearchError::ResourceClosed(_)) => return Err(e),
            Err(e) => {
                self.observer.on_failure(self.name(), Stage::Session, &e);
                return Ok(SearchResponse::empty());
            }
        };

        let context = match browser.new_context().await {
            Ok(context) => context,
            Err(e) => {
                self.observer.on_failure(self.name(), Stage::Session, &e);
                return Ok(SearchResponse::empty());
            }
        };

        let response = self.run_phases(context.as_ref(), query).await;

        if let Err(e) = context.close().await {
            warn!(engine = self.name(), error = %e, "failed to close browsing context");
        }

        Ok(response)
    }

    async fn close(&self) -> Result<()> {
        match self.browser.take().await {
            Some(browser) => {
                browser.shutdown().await?;
                info!("bing browser session closed");
            }
            None => debug!("bing close: no browser to shut down"),
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.browser.is_closed()
    }
}
