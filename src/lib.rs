//! search-wrapper: one search interface over three providers
//!
//! [`Serper`] queries Google through the Serper JSON API, [`DuckDuckGo`]
//! scrapes the HTML endpoint and enriches results with page images, and
//! [`Bing`] drives a headless browser that also discovers documents by
//! file type. All three return a [`SearchResponse`].

pub mod browser;
pub mod config;
pub mod engines;
pub mod error;
pub mod lifecycle;
pub mod metrics;
pub mod network;
pub mod results;
pub mod search;

pub use config::Settings;
pub use engines::bing::Bing;
pub use engines::duckduckgo::DuckDuckGo;
pub use engines::serper::Serper;
pub use engines::{EngineRegistry, SearchEngine};
pub use error::{Result, SearchError};
pub use lifecycle::with_engine;
pub use results::{FileResult, FileType, ImageResult, OrganicResult, SearchResponse};
pub use search::SearchQuery;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
