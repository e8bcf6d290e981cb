//! Search query model

use serde::{Deserialize, Serialize};

/// Number of organic results requested when none is given
pub const DEFAULT_TEXT_COUNT: usize = 10;

/// A single search request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// The search query string
    pub query: String,
    /// Requested number of organic results
    #[serde(default = "default_text_count")]
    pub text_count: usize,
    /// Requested number of images; the engine default applies when absent
    #[serde(default)]
    pub image_count: Option<usize>,
}

fn default_text_count() -> usize {
    DEFAULT_TEXT_COUNT
}

impl SearchQuery {
    /// Create a query with default counts
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            text_count: DEFAULT_TEXT_COUNT,
            image_count: None,
        }
    }

    pub fn with_text_count(mut self, count: usize) -> Self {
        self.text_count = count;
        self
    }

    pub fn with_image_count(mut self, count: usize) -> Self {
        self.image_count = Some(count);
        self
    }

    /// Image count, falling back to the engine's default
    pub fn image_count_or(&self, default: usize) -> usize {
        self.image_count.unwrap_or(default)
    }

    /// Check if the query has no searchable text
    pub fn is_empty(&self) -> bool {
        self.query.trim().is_empty()
    }
}
