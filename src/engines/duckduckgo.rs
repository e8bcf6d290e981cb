//! DuckDuckGo search engine implementation

use super::traits::*;
use crate::config::Settings;
use crate::error::{Result, SearchError};
use crate::lifecycle::ResourceSlot;
use crate::metrics::{SearchObserver, Stage, TracingObserver};
use crate::network::HttpClient;
use crate::results::{OrganicResult, SearchResponse};
use crate::search::aggregate::settle_all;
use crate::search::SearchQuery;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

static RESULT: Lazy<Selector> = Lazy::new(|| Selector::parse("div.result").unwrap());
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("a.result__a").unwrap());
static SNIPPET: Lazy<Selector> = Lazy::new(|| Selector::parse("a.result__snippet").unwrap());
static OG_IMAGE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"meta[property="og:image"], meta[name="og:image"]"#).unwrap()
});
static TWITTER_IMAGE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="twitter:image"]"#).unwrap());

/// DuckDuckGo web search over the JavaScript-free HTML endpoint
pub struct DuckDuckGo {
    html_url: String,
    enrichment_timeout: Duration,
    client: ResourceSlot<HttpClient>,
    observer: Arc<dyn SearchObserver>,
}

impl DuckDuckGo {
    pub fn new() -> Result<Self> {
        Self::with_settings(&Settings::default())
    }

    pub fn with_settings(settings: &Settings) -> Result<Self> {
        let client = HttpClient::with_settings(&settings.outgoing)?;

        Ok(Self {
            html_url: settings.duckduckgo.html_url.clone(),
            enrichment_timeout: settings.duckduckgo.enrichment_timeout()?,
            client: ResourceSlot::ready("duckduckgo", client),
            observer: Arc::new(TracingObserver),
        })
    }

    /// Report sub-fetch outcomes to `observer`
    pub fn with_observer(mut self, observer: Arc<dyn SearchObserver>) -> Self {
        self.observer = observer;
        self
    }

    async fn fetch_results(
        &self,
        client: &HttpClient,
        query: &str,
        count: usize,
    ) -> Result<Vec<OrganicResult>> {
        let mut form = HashMap::new();
        form.insert("q".to_string(), query.to_string());

        let response = client
            .post_form(&self.html_url, form)
            .await?
            .error_for_status()?;

        let results = parse_html_results(&response.text, &response.url, count);
        if results.is_empty() && response.is_captcha() {
            return Err(SearchError::Parse("bot challenge page returned".into()));
        }

        Ok(results)
    }

    /// Visit a result page and read its representative image
    async fn extract_image(&self, client: &HttpClient, page_url: &str) -> Result<Option<String>> {
        let response = client
            .get_with_timeout(page_url, self.enrichment_timeout)
            .await?
            .error_for_status()?;
        Ok(parse_meta_image(&response.text, &response.url))
    }
}

/// Extract up to `limit` organic results from the HTML results page
fn parse_html_results(html: &str, page_url: &str, limit: usize) -> Vec<OrganicResult> {
    let document = Html::parse_document(html);

    document
        .select(&RESULT)
        .filter_map(|element| {
            let title_elem = element.select(&TITLE).next()?;
            let href = title_elem.value().attr("href")?;
            let link = resolve_result_link(page_url, href)?;

            let title = title_elem.text().collect::<String>().trim().to_string();
            let snippet = element
                .select(&SNIPPET)
                .next()
                .map(|s| s.text().collect::<String>().trim().to_string())
                .unwrap_or_default();

            Some(OrganicResult::new(title, link).with_snippet(snippet))
        })
        .take(limit)
        .collect()
}

/// Turn a result href into the destination URL.
///
/// Result links usually go through `//duckduckgo.com/l/?uddg=<target>`;
/// the target is unwrapped. Ad links (`/y.js`) yield `None`.
fn resolve_result_link(page_url: &str, href: &str) -> Option<String> {
    let base = Url::parse(page_url)
        .or_else(|_| Url::parse("https://html.duckduckgo.com/html/"))
        .ok()?;
    let url = base.join(href).ok()?;

    let is_ddg = url
        .host_str()
        .map_or(false, |h| h == "duckduckgo.com" || h.ends_with(".duckduckgo.com"));
    if !is_ddg {
        return Some(url.to_string());
    }

    match url.path() {
        "/l/" | "/l" => url
            .query_pairs()
            .find(|(k, _)| k == "uddg")
            .map(|(_, v)| v.into_owned()),
        _ => None,
    }
}

/// Read `og:image` (or `twitter:image`) from a page, resolved against its URL
fn parse_meta_image(html: &str, page_url: &str) -> Option<String> {
    let document = Html::parse_document(html);

    let content = document
        .select(&OG_IMAGE)
        .chain(document.select(&TWITTER_IMAGE))
        .filter_map(|meta| meta.value().attr("content"))
        .map(str::trim)
        .find(|c| !c.is_empty())?;

    match Url::parse(page_url).and_then(|base| base.join(content)) {
        Ok(url) => Some(url.to_string()),
        Err(_) => Some(content.to_string()),
    }
}

#[async_trait]
impl SearchEngine for DuckDuckGo {
    fn name(&self) -> &str {
        "duckduckgo"
    }

    fn about(&self) -> EngineAbout {
        EngineAbout::new()
            .website("https://duckduckgo.com")
            .official_api(false)
            .results_format("HTML")
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse> {
        let client = self.client.get().await?;
        if query.is_empty() {
            return Ok(SearchResponse::empty());
        }

        let text_count = query.text_count;
        let image_count = query.image_count_or(self.default_image_count());

        let mut results = match self.fetch_results(&client, &query.query, text_count).await {
            Ok(results) => {
                self.observer
                    .on_success(self.name(), Stage::Organic, results.len());
                results
            }
            Err(e) => {
                self.observer.on_failure(self.name(), Stage::Organic, &e);
                return Ok(SearchResponse::empty());
            }
        };

        if results.is_empty() {
            debug!("duckduckgo returned no results for '{}'", query.query);
            return Ok(SearchResponse::empty());
        }

        let visits = results
            .iter()
            .map(|result| self.extract_image(&client, &result.link));
        let found = settle_all(
            self.name(),
            Stage::Enrichment,
            self.observer.as_ref(),
            visits,
        )
        .await;

        let mut images = Vec::new();
        for (result, image) in results.iter_mut().zip(found) {
            if let Some(image) = image {
                images.push(image.clone());
                result.image_url = Some(image);
            }
        }

        Ok(SearchResponse::new(results, images, text_count, image_count))
    }

    async fn close(&self) -> Result<()> {
        if self.client.take().await.is_some() {
            debug!("duckduckgo client released");
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.client.is_closed()
    }
}
