//! Settings structures for search-wrapper configuration

use crate::error::SearchError;
use crate::results::FileType;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the Serper API key
pub const SERPER_API_KEY_ENV: &str = "GOOGLE_SERPER_API_KEY";

/// Main settings structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub outgoing: OutgoingSettings,
    pub serper: SerperSettings,
    pub duckduckgo: DuckDuckGoSettings,
    pub bing: BingSettings,
}

impl Settings {
    /// Load settings from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = serde_yaml::from_str(&content)?;
        Ok(settings)
    }

    /// Merge with environment variables
    pub fn merge_env(&mut self) {
        if let Ok(val) = std::env::var(SERPER_API_KEY_ENV) {
            if !val.trim().is_empty() {
                self.serper.api_key = Some(val);
            }
        }
        if let Ok(val) = std::env::var("SEARCH_WRAPPER_HEADLESS") {
            if let Ok(headless) = val.parse() {
                self.bing.headless = headless;
            }
        }
        if let Ok(val) = std::env::var("SEARCH_WRAPPER_TIMEOUT") {
            if let Ok(timeout) = val.parse() {
                self.outgoing.request_timeout = timeout;
            }
        }
    }
}

/// Outgoing request settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutgoingSettings {
    /// Default request timeout in seconds
    pub request_timeout: f64,
    /// Fixed user agent (none = random)
    pub user_agent: Option<String>,
    /// Pool max size
    pub pool_maxsize: usize,
    /// Verify SSL certificates
    pub verify_ssl: bool,
    /// Proxy settings
    pub proxies: ProxySettings,
}

impl Default for OutgoingSettings {
    fn default() -> Self {
        Self {
            request_timeout: 30.0,
            user_agent: None,
            pool_maxsize: 20,
            verify_ssl: true,
            proxies: ProxySettings::default(),
        }
    }
}

impl OutgoingSettings {
    pub fn timeout(&self) -> crate::error::Result<Duration> {
        seconds("outgoing.request_timeout", self.request_timeout)
    }
}

/// Proxy settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    pub http: Option<String>,
    pub https: Option<String>,
    pub all: Option<String>,
}

/// Serper (Google structured API) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerperSettings {
    /// API key; the environment variable takes precedence when merged
    pub api_key: Option<String>,
    pub base_url: String,
}

impl Default for SerperSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://google.serper.dev".to_string(),
        }
    }
}

/// DuckDuckGo HTML scraping settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DuckDuckGoSettings {
    pub html_url: String,
    /// Timeout for each result-page visit, in seconds
    pub enrichment_timeout: f64,
}

impl Default for DuckDuckGoSettings {
    fn default() -> Self {
        Self {
            html_url: "https://html.duckduckgo.com/html/".to_string(),
            enrichment_timeout: 5.0,
        }
    }
}

impl DuckDuckGoSettings {
    pub fn enrichment_timeout(&self) -> crate::error::Result<Duration> {
        seconds("duckduckgo.enrichment_timeout", self.enrichment_timeout)
    }
}

/// Headless Bing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BingSettings {
    pub base_url: String,
    pub headless: bool,
    /// Explicit Chrome/Chromium binary, detected when absent
    pub chrome_executable: Option<PathBuf>,
    /// Navigation timeout for the organic results page, in seconds
    pub organic_timeout: f64,
    /// Navigation timeout for the image results page, in seconds
    pub image_timeout: f64,
    /// Navigation timeout for each file-type query, in seconds
    pub file_timeout: f64,
    /// Extra wait for lazily loaded thumbnails, in milliseconds
    pub image_settle_ms: u64,
    /// Document types searched for on every query
    pub file_types: Vec<FileType>,
}

impl Default for BingSettings {
    fn default() -> Self {
        Self {
            base_url: "https://www.bing.com".to_string(),
            headless: true,
            chrome_executable: None,
            organic_timeout: 30.0,
            image_timeout: 30.0,
            file_timeout: 20.0,
            image_settle_ms: 1000,
            file_types: FileType::ALL.to_vec(),
        }
    }
}

impl BingSettings {
    pub fn organic_timeout(&self) -> crate::error::Result<Duration> {
        seconds("bing.organic_timeout", self.organic_timeout)
    }

    pub fn image_timeout(&self) -> crate::error::Result<Duration> {
        seconds("bing.image_timeout", self.image_timeout)
    }

    pub fn file_timeout(&self) -> crate::error::Result<Duration> {
        seconds("bing.file_timeout", self.file_timeout)
    }
}

/// Convert a configured number of seconds; negative, NaN and overflowing values are rejected
pub fn seconds(key: &str, value: f64) -> crate::error::Result<Duration> {
    Duration::try_from_secs_f64(value).map_err(|e| {
        SearchError::Configuration(format!("invalid {} ({}): {}", key, value, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.outgoing.timeout().unwrap(), Duration::from_secs(30));
        assert_eq!(
            settings.duckduckgo.enrichment_timeout().unwrap(),
            Duration::from_secs(5)
        );
        assert_eq!(
            settings.bing.file_timeout().unwrap(),
            Duration::from_secs(20)
        );
        assert!(settings.bing.headless);
        assert_eq!(settings.bing.file_types.len(), 8);
        assert!(settings.serper.api_key.is_none());
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = r#"
bing:
  headless: false
  file_types: [pdf, csv]
serper:
  api_key: secret
"#;
        let settings: Settings = serde_yaml::from_str(yaml).unwrap();
        assert!(!settings.bing.headless);
        assert_eq!(settings.bing.file_types, vec![FileType::Pdf, FileType::Csv]);
        assert_eq!(settings.bing.base_url, "https://www.bing.com");
        assert_eq!(settings.serper.api_key.as_deref(), Some("secret"));
        assert_eq!(settings.outgoing.request_timeout, 30.0);
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!(
            "search-wrapper-settings-{}.yml",
            std::process::id()
        ));
        std::fs::write(&path, "outgoing:\n  request_timeout: 12.5\n").unwrap();

        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.outgoing.request_timeout, 12.5);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_invalid_timeouts_are_configuration_errors() {
        let mut settings = Settings::default();
        settings.outgoing.request_timeout = -1.0;
        settings.duckduckgo.enrichment_timeout = f64::NAN;
        settings.bing.organic_timeout = -0.5;

        assert!(matches!(
            settings.outgoing.timeout(),
            Err(SearchError::Configuration(_))
        ));
        assert!(matches!(
            settings.duckduckgo.enrichment_timeout(),
            Err(SearchError::Configuration(_))
        ));
        assert!(matches!(
            settings.bing.organic_timeout(),
            Err(SearchError::Configuration(_))
        ));
        assert_eq!(seconds("x", 0.25).unwrap(), Duration::from_millis(250));
    }
}
