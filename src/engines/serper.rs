//! Google search through the Serper structured API

use super::traits::*;
use crate::config::{Settings, SERPER_API_KEY_ENV};
use crate::error::{Result, SearchError};
use crate::lifecycle::ResourceSlot;
use crate::metrics::{SearchObserver, Stage, TracingObserver};
use crate::network::{accept_json, HttpClient};
use crate::results::{ImageResult, OrganicResult, SearchResponse};
use crate::search::aggregate::settle;
use crate::search::SearchQuery;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

/// Images requested when the query does not say
pub const DEFAULT_IMAGE_COUNT: usize = 10;

/// Google results from google.serper.dev
pub struct Serper {
    base_url: String,
    api_key: String,
    client: ResourceSlot<HttpClient>,
    observer: Arc<dyn SearchObserver>,
}

#[derive(Debug, Deserialize)]
struct OrganicEntry {
    #[serde(default)]
    title: String,
    link: String,
    #[serde(default)]
    snippet: String,
    #[serde(rename = "imageUrl")]
    image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImageEntry {
    #[serde(rename = "imageUrl")]
    image_url: String,
}

impl Serper {
    /// Create the engine from an explicit key or `GOOGLE_SERPER_API_KEY`.
    ///
    /// Fails with [`SearchError::Configuration`] when neither is set.
    pub fn new(api_key: Option<String>) -> Result<Self> {
        let key = resolve_api_key(api_key, std::env::var(SERPER_API_KEY_ENV).ok())?;
        let mut settings = Settings::default();
        settings.serper.api_key = Some(key);
        Self::with_settings(&settings)
    }

    /// Create the engine from settings; the key must already be resolved
    pub fn with_settings(settings: &Settings) -> Result<Self> {
        let api_key = resolve_api_key(settings.serper.api_key.clone(), None)?;
        let client = HttpClient::with_settings(&settings.outgoing)?;

        Ok(Self {
            base_url: settings.serper.base_url.trim_end_matches('/').to_string(),
            api_key,
            client: ResourceSlot::ready("serper", client),
            observer: Arc::new(TracingObserver),
        })
    }

    /// Report sub-fetch outcomes to `observer`
    pub fn with_observer(mut self, observer: Arc<dyn SearchObserver>) -> Self {
        self.observer = observer;
        self
    }

    fn request(&self, endpoint: &str, query: &str, count: usize) -> EngineRequest {
        EngineRequest::post(format!("{}/{}", self.base_url, endpoint))
            .header("X-API-KEY", self.api_key.as_str())
            .header("Accept", accept_json())
            .json(json!({ "q": query, "num": count }))
    }

    async fn fetch_text(
        &self,
        client: &HttpClient,
        query: &str,
        count: usize,
    ) -> Result<Vec<OrganicResult>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let response = client
            .execute(self.request("search", query, count))
            .await?
            .error_for_status()?;
        let body: Value = response.json()?;
        Ok(parse_organic(&body))
    }

    async fn fetch_images(
        &self,
        client: &HttpClient,
        query: &str,
        count: usize,
    ) -> Result<Vec<ImageResult>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let response = client
            .execute(self.request("images", query, count))
            .await?
            .error_for_status()?;
        let body: Value = response.json()?;
        Ok(parse_images(&body))
    }
}

/// Pick the explicit key, else the environment value; blank keys count as missing
fn resolve_api_key(explicit: Option<String>, env: Option<String>) -> Result<String> {
    explicit
        .filter(|k| !k.trim().is_empty())
        .or_else(|| env.filter(|k| !k.trim().is_empty()))
        .ok_or_else(|| {
            SearchError::Configuration(format!(
                "Serper API key missing: pass it explicitly or set {}",
                SERPER_API_KEY_ENV
            ))
        })
}

fn parse_organic(body: &Value) -> Vec<OrganicResult> {
    entries(body, "organic")
        .filter_map(|entry| match OrganicEntry::deserialize(entry) {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!("skipping malformed organic entry: {}", e);
                None
            }
        })
        .map(|entry| {
            let result = OrganicResult::new(entry.title, entry.link).with_snippet(entry.snippet);
            match entry.image_url {
                Some(image) => result.with_image(image),
                None => result,
            }
        })
        .collect()
}

fn parse_images(body: &Value) -> Vec<ImageResult> {
    entries(body, "images")
        .filter_map(|entry| match ImageEntry::deserialize(entry) {
            Ok(entry) => Some(entry.image_url),
            Err(e) => {
                debug!("skipping malformed image entry: {}", e);
                None
            }
        })
        .collect()
}

fn entries<'a>(body: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> {
    body.get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

#[async_trait]
impl SearchEngine for Serper {
    fn name(&self) -> &str {
        "serper"
    }

    fn about(&self) -> EngineAbout {
        EngineAbout::new()
            .website("https://serper.dev")
            .official_api(true)
            .api_key_required(true)
            .results_format("JSON")
    }

    fn default_image_count(&self) -> usize {
        DEFAULT_IMAGE_COUNT
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse> {
        let client = self.client.get().await?;
        if query.is_empty() {
            return Ok(SearchResponse::empty());
        }

        let text_count = query.text_count;
        let image_count = query.image_count_or(self.default_image_count());

        let (text, images) = tokio::join!(
            self.fetch_text(&client, &query.query, text_count),
            self.fetch_images(&client, &query.query, image_count),
        );

        let data = settle(self.name(), Stage::Organic, self.observer.as_ref(), text);
        let images = settle(self.name(), Stage::Images, self.observer.as_ref(), images);

        Ok(SearchResponse::new(data, images, text_count, image_count))
    }

    async fn close(&self) -> Result<()> {
        if self.client.take().await.is_some() {
            debug!("serper client released");
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.client.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Metrics;
    use wiremock::matchers::{header, method, path};
    use std::time::Duration;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings_for(server: &MockServer) -> Settings {
        let mut settings = Settings::default();
        settings.serper.api_key = Some("test-key".to_string());
        settings.serper.base_url = server.uri();
        settings
    }

    fn organic_body(n: usize) -> Value {
        let organic: Vec<Value> = (0..n)
            .map(|i| {
                json!({
                    "title": format!("Result {}", i),
                    "link": format!("https://example.com/{}", i),
                    "snippet": "about rust",
                    "position": i + 1
                })
            })
            .collect();
        json!({ "organic": organic })
    }

    #[test]
    fn test_resolve_api_key() {
        assert_eq!(
            resolve_api_key(Some("arg".into()), Some("env".into())).unwrap(),
            "arg"
        );
        assert_eq!(resolve_api_key(None, Some("env".into())).unwrap(), "env");
        assert_eq!(
            resolve_api_key(Some("  ".into()), Some("env".into())).unwrap(),
            "env"
        );
        assert!(matches!(
            resolve_api_key(None, None),
            Err(SearchError::Configuration(_))
        ));
    }

    #[test]
    fn test_missing_key_fails_construction() {
        let result = Serper::with_settings(&Settings::default());
        assert!(matches!(result, Err(SearchError::Configuration(_))));
    }

    #[test]
    fn test_new_without_key_or_env_fails() {
        std::env::remove_var(SERPER_API_KEY_ENV);
        assert!(matches!(
            Serper::new(None),
            Err(SearchError::Configuration(_))
        ));
    }

    #[test]
    fn test_parse_skips_malformed_entries() {
        let body = json!({
            "organic": [
                { "title": "ok", "link": "https://a.com" },
                { "title": "no link" },
                { "link": "https://b.com", "snippet": "s" }
            ],
            "images": [
                { "imageUrl": "https://a.com/1.png" },
                { "title": "no url" }
            ]
        });

        let organic = parse_organic(&body);
        assert_eq!(organic.len(), 2);
        assert_eq!(organic[1].title, "");
        assert_eq!(organic[1].snippet, "s");
        assert_eq!(parse_images(&body), vec!["https://a.com/1.png".to_string()]);
        assert!(parse_organic(&json!({})).is_empty());
    }

    #[tokio::test]
    async fn test_search_text_and_images() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(header("X-API-KEY", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(organic_body(5)))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/images"))
            .and(header("X-API-KEY", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "images": [
                    { "imageUrl": "https://img.com/1.jpg" },
                    { "imageUrl": "https://img.com/2.jpg" },
                    { "imageUrl": "https://img.com/3.jpg" }
                ]
            })))
            .mount(&server)
            .await;

        let engine = Serper::with_settings(&settings_for(&server)).unwrap();
        let query = SearchQuery::new("rust").with_text_count(3).with_image_count(2);
        let response = engine.search(&query).await.unwrap();

        assert_eq!(response.data.len(), 3);
        assert_eq!(response.data[0].title, "Result 0");
        assert_eq!(response.data[2].link, "https://example.com/2");
        assert_eq!(
            response.images,
            vec!["https://img.com/1.jpg".to_string(), "https://img.com/2.jpg".to_string()]
        );
        assert!(response.files.is_empty());
    }

    #[tokio::test]
    async fn test_image_failure_keeps_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(organic_body(2)))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/images"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let metrics = Arc::new(Metrics::new());
        let engine = Serper::with_settings(&settings_for(&server))
            .unwrap()
            .with_observer(metrics.clone());
        let response = engine.search(&SearchQuery::new("rust")).await.unwrap();

        assert_eq!(response.data.len(), 2);
        assert!(response.images.is_empty());
        assert_eq!(metrics.failures("serper", Stage::Images), 1);
        assert_eq!(metrics.failures("serper", Stage::Organic), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_degrades_to_empty() {
        let server = MockServer::start().await;
        let settings = settings_for(&server);
        drop(server);

        let engine = Serper::with_settings(&settings).unwrap();
        let response = engine.search(&SearchQuery::new("rust")).await.unwrap();

        assert!(response.data.is_empty());
        assert!(response.images.is_empty());
    }

    #[tokio::test]
    async fn test_zero_image_count_skips_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(organic_body(1)))
            .mount(&server)
            .await;

        let engine = Serper::with_settings(&settings_for(&server)).unwrap();
        let query = SearchQuery::new("rust").with_image_count(0);
        engine.search(&query).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url.path(), "/search");
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_final() {
        let server = MockServer::start().await;
        let engine = Serper::with_settings(&settings_for(&server)).unwrap();

        engine.close().await.unwrap();
        engine.close().await.unwrap();

        assert!(engine.is_closed());
        assert!(matches!(
            engine.search(&SearchQuery::new("rust")).await,
            Err(SearchError::ResourceClosed(_))
        ));
    }

    #[tokio::test]
    async fn test_text_and_images_fetched_concurrently() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(organic_body(3))
                    .set_delay(Duration::from_millis(400)),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/images"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "images": [{ "imageUrl": "https://img.com/1.png" }] }))
                    .set_delay(Duration::from_millis(400)),
            )
            .mount(&server)
            .await;

        let engine = Serper::with_settings(&settings_for(&server)).unwrap();
        let started = std::time::Instant::now();
        let response = engine.search(&SearchQuery::new("rust")).await.unwrap();
        let elapsed = started.elapsed();

        assert_eq!(response.data.len(), 3);
        assert_eq!(response.images.len(), 1);
        // Back-to-back requests would take at least 800ms
        assert!(elapsed < Duration::from_millis(700), "took {:?}", elapsed);
    }
}
