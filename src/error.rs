//! Error types for search engines
//!
//! Only configuration problems and use of a closed engine ever reach the
//! caller of `search`. Everything else is recovered inside the engine and
//! reported to its observer.

use std::time::Duration;

/// Broad class of a [`SearchError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or invalid configuration, detected at construction
    Configuration,
    /// Network, navigation or timeout failure
    Transport,
    /// Malformed or unexpected markup, JSON or metadata
    Parse,
    /// Operation attempted on a closed engine
    ResourceClosed,
}

/// Errors produced by search engines and their fetchers
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP error: {0}")]
    HttpStatus(u16),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("browser error: {0}")]
    Browser(String),

    #[error("engine '{0}' has been closed")]
    ResourceClosed(String),
}

impl SearchError {
    /// Map the error onto its broad class
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Transport(_) | Self::Timeout(_) | Self::HttpStatus(_) | Self::Browser(_) => {
                ErrorKind::Transport
            }
            Self::Parse(_) => ErrorKind::Parse,
            Self::ResourceClosed(_) => ErrorKind::ResourceClosed,
        }
    }

    /// Whether the error must be surfaced to the caller of `search`
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Configuration | ErrorKind::ResourceClosed
        )
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_status() {
            if let Some(status) = err.status() {
                return Self::HttpStatus(status.as_u16());
            }
        }
        Self::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<chromiumoxide::error::CdpError> for SearchError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Self::Browser(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, SearchError>;
