//! HTTP client used by the HTTP-backed engines

use super::user_agent::{accept_html, generate_user_agent};
use crate::config::OutgoingSettings;
use crate::engines::{EngineRequest, EngineResponse, HttpMethod, RequestBody};
use crate::error::{Result, SearchError};
use reqwest::{Client, Response};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// HTTP client wrapper with browser-like defaults
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    default_timeout: Duration,
    user_agent: String,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self> {
        Self::with_settings(&OutgoingSettings::default())
    }

    /// Create a new HTTP client with custom settings
    pub fn with_settings(settings: &OutgoingSettings) -> Result<Self> {
        let timeout = settings.timeout()?;
        let mut builder = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(settings.pool_maxsize)
            .cookie_store(true)
            .gzip(true)
            .brotli(true);

        if !settings.verify_ssl {
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(ref proxy_url) = settings.proxies.all {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url).map_err(config_error)?);
        } else {
            if let Some(ref http) = settings.proxies.http {
                builder = builder.proxy(reqwest::Proxy::http(http).map_err(config_error)?);
            }
            if let Some(ref https) = settings.proxies.https {
                builder = builder.proxy(reqwest::Proxy::https(https).map_err(config_error)?);
            }
        }

        let client = builder.build().map_err(config_error)?;

        Ok(Self {
            client,
            default_timeout: timeout,
            user_agent: settings
                .user_agent
                .clone()
                .unwrap_or_else(generate_user_agent),
        })
    }

    /// Execute an engine request
    pub async fn execute(&self, request: EngineRequest) -> Result<EngineResponse> {
        self.execute_with_timeout(request, self.default_timeout).await
    }

    /// Execute an engine request with a custom timeout.
    ///
    /// Non-2xx responses are returned as-is; callers decide whether the
    /// status is a failure.
    pub async fn execute_with_timeout(
        &self,
        request: EngineRequest,
        timeout: Duration,
    ) -> Result<EngineResponse> {
        let mut req_builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };

        req_builder = req_builder.timeout(timeout);

        // Defaults only where the request does not set its own value
        let defaults = [
            ("User-Agent", self.user_agent.as_str()),
            ("Accept", accept_html()),
            ("Accept-Language", "en-US,en;q=0.9"),
        ];
        for (key, value) in defaults {
            if !request.has_header(key) {
                req_builder = req_builder.header(key, value);
            }
        }

        for (key, value) in &request.headers {
            req_builder = req_builder.header(key, value);
        }

        if let Some(body) = request.data {
            req_builder = match body {
                RequestBody::Form(data) => req_builder.form(&data),
                RequestBody::Json(json) => req_builder.json(&json),
            };
        }

        debug!("{:?} {}", request.method, request.url);

        let response = req_builder.send().await.map_err(|e| {
            if e.is_timeout() {
                SearchError::Timeout(timeout)
            } else {
                SearchError::from(e)
            }
        })?;

        Self::parse_response(response, timeout).await
    }

    /// Simple GET request with a custom timeout
    pub async fn get_with_timeout(&self, url: &str, timeout: Duration) -> Result<EngineResponse> {
        self.execute_with_timeout(EngineRequest::get(url), timeout)
            .await
    }

    /// Form POST request
    pub async fn post_form(
        &self,
        url: &str,
        data: HashMap<String, String>,
    ) -> Result<EngineResponse> {
        self.execute(EngineRequest::post(url).form(data)).await
    }

    async fn parse_response(response: Response, timeout: Duration) -> Result<EngineResponse> {
        let status = response.status().as_u16();
        let url = response.url().to_string();

        let text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                SearchError::Timeout(timeout)
            } else {
                SearchError::from(e)
            }
        })?;

        Ok(EngineResponse { status, text, url })
    }

    /// Get current user agent
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

fn config_error(err: reqwest::Error) -> SearchError {
    SearchError::Configuration(format!("invalid HTTP client settings: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_client_creation() {
        let client = HttpClient::new();
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_fixed_user_agent() {
        let settings = OutgoingSettings {
            user_agent: Some("TestAgent/1.0".to_string()),
            ..Default::default()
        };
        let client = HttpClient::with_settings(&settings).unwrap();
        assert_eq!(client.user_agent(), "TestAgent/1.0");
    }

    #[tokio::test]
    async fn test_request_header_overrides_default() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data"))
            .and(header("Accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&server)
            .await;

        let client = HttpClient::new().unwrap();
        let request =
            EngineRequest::get(format!("{}/data", server.uri())).header("Accept", "application/json");
        let response = client.execute(request).await.unwrap();

        assert!(response.is_success());
        assert_eq!(response.text, "{}");
    }

    #[tokio::test]
    async fn test_timeout_maps_to_timeout_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let client = HttpClient::new().unwrap();
        let err = client
            .get_with_timeout(&server.uri(), Duration::from_millis(50))
            .await
            .unwrap_err();

        assert!(matches!(err, SearchError::Timeout(_)));
    }
}
