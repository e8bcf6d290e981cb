//! Engine traits and types

use crate::error::{Result, SearchError};
use crate::results::SearchResponse;
use crate::search::SearchQuery;
use async_trait::async_trait;
use std::collections::HashMap;

/// HTTP request to be made by an engine
#[derive(Debug, Clone)]
pub struct EngineRequest {
    /// URL to request
    pub url: String,
    /// HTTP method
    pub method: HttpMethod,
    /// Request headers
    pub headers: HashMap<String, String>,
    /// Request body
    pub data: Option<RequestBody>,
}

impl EngineRequest {
    /// Create a GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self::with_method(url, HttpMethod::Get)
    }

    /// Create a POST request
    pub fn post(url: impl Into<String>) -> Self {
        Self::with_method(url, HttpMethod::Post)
    }

    fn with_method(url: impl Into<String>, method: HttpMethod) -> Self {
        Self {
            url: url.into(),
            method,
            headers: HashMap::new(),
            data: None,
        }
    }

    /// Add a header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Add form data
    pub fn form(mut self, data: HashMap<String, String>) -> Self {
        self.data = Some(RequestBody::Form(data));
        self
    }

    /// Add JSON body
    pub fn json(mut self, data: serde_json::Value) -> Self {
        self.data = Some(RequestBody::Json(data));
        self
    }

    /// Case-insensitive header lookup
    pub fn has_header(&self, key: &str) -> bool {
        self.headers.keys().any(|k| k.eq_ignore_ascii_case(key))
    }
}

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// Request body types
#[derive(Debug, Clone)]
pub enum RequestBody {
    Form(HashMap<String, String>),
    Json(serde_json::Value),
}

/// HTTP response from an engine request
#[derive(Debug)]
pub struct EngineResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as text
    pub text: String,
    /// Response URL (after redirects)
    pub url: String,
}

impl EngineResponse {
    /// Parse response as JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.text)?)
    }

    /// Check if response is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx response into an error
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(SearchError::HttpStatus(self.status))
        }
    }

    /// Check if the body carries the markup of a bot challenge page.
    ///
    /// Only meaningful for pages that yielded no records; ordinary result
    /// text may mention captchas.
    pub fn is_captcha(&self) -> bool {
        self.text.contains("anomaly-modal")
            || self.text.contains("challenge-form")
            || self.text.contains("g-recaptcha")
    }
}

/// The contract every search engine implements.
///
/// `search` is the failure boundary: transport and parse failures degrade
/// to empty collections and are reported to the engine's observer. It only
/// returns an error when the engine has been closed. `close` is idempotent.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Engine name
    fn name(&self) -> &str;

    /// Static description of the engine
    fn about(&self) -> EngineAbout {
        EngineAbout::default()
    }

    /// Image count used when the query does not request one
    fn default_image_count(&self) -> usize {
        0
    }

    /// Run a search
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse>;

    /// Release every resource held by the engine
    async fn close(&self) -> Result<()>;

    /// Whether `close` has been called
    fn is_closed(&self) -> bool;
}

#[async_trait]
impl<E: SearchEngine + ?Sized> SearchEngine for Box<E> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn about(&self) -> EngineAbout {
        (**self).about()
    }

    fn default_image_count(&self) -> usize {
        (**self).default_image_count()
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse> {
        (**self).search(query).await
    }

    async fn close(&self) -> Result<()> {
        (**self).close().await
    }

    fn is_closed(&self) -> bool {
        (**self).is_closed()
    }
}

/// Engine metadata
#[derive(Debug, Clone, Default)]
pub struct EngineAbout {
    /// Website URL
    pub website: Option<String>,
    /// Whether it uses the official API
    pub use_official_api: bool,
    /// Whether an API key is required
    pub require_api_key: bool,
    /// Whether the engine discovers document files
    pub file_discovery: bool,
    /// Result format (HTML, JSON)
    pub results: String,
}

impl EngineAbout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn website(mut self, url: impl Into<String>) -> Self {
        self.website = Some(url.into());
        self
    }

    pub fn official_api(mut self, uses: bool) -> Self {
        self.use_official_api = uses;
        self
    }

    pub fn api_key_required(mut self, required: bool) -> Self {
        self.require_api_key = required;
        self
    }

    pub fn file_discovery(mut self, discovers: bool) -> Self {
        self.file_discovery = discovers;
        self
    }

    pub fn results_format(mut self, format: impl Into<String>) -> Self {
        self.results = format.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = EngineRequest::post("https://example.com/search")
            .header("X-API-KEY", "k")
            .json(serde_json::json!({"q": "rust"}));

        assert_eq!(request.method, HttpMethod::Post);
        assert!(request.has_header("x-api-key"));
        assert!(!request.has_header("Accept"));
        assert!(matches!(request.data, Some(RequestBody::Json(_))));
    }

    #[test]
    fn test_response_status() {
        let response = EngineResponse {
            status: 403,
            text: String::new(),
            url: "https://example.com".into(),
        };
        assert!(!response.is_success());
        assert!(matches!(
            response.error_for_status(),
            Err(SearchError::HttpStatus(403))
        ));
    }

    #[test]
    fn test_captcha_detection() {
        let page = |text: &str| EngineResponse {
            status: 200,
            text: text.to_string(),
            url: "https://example.com".into(),
        };

        assert!(page(r#"<div class="anomaly-modal__title">Unfortunately</div>"#).is_captcha());
        assert!(page(r#"<form id="challenge-form" action="/anomaly.js">"#).is_captcha());
        assert!(!page("<p>How to add a captcha to your CAPTCHA form</p>").is_captcha());
    }
}
