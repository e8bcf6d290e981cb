//! Result type definitions

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A single organic (non-paid) search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganicResult {
    /// Title of the result, may be empty
    #[serde(default)]
    pub title: String,
    /// Target URL
    pub link: String,
    /// Description snippet, may be empty
    #[serde(default)]
    pub snippet: String,
    /// Representative image found for the result
    #[serde(default)]
    pub image_url: Option<String>,
}

impl OrganicResult {
    /// Create a new result
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            snippet: String::new(),
            image_url: None,
        }
    }

    /// Add a snippet to the result
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = snippet.into();
        self
    }

    /// Attach an enrichment image
    pub fn with_image(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }
}

/// An image result is the URL of the image resource
pub type ImageResult = String;

/// Document types searched for by file discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Pdf,
    Doc,
    Docx,
    Ppt,
    Pptx,
    Xls,
    Xlsx,
    Csv,
}

impl FileType {
    /// Every supported file type, in discovery order
    pub const ALL: [FileType; 8] = [
        FileType::Pdf,
        FileType::Doc,
        FileType::Docx,
        FileType::Ppt,
        FileType::Pptx,
        FileType::Xls,
        FileType::Xlsx,
        FileType::Csv,
    ];

    /// Extension without the leading dot
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Doc => "doc",
            Self::Docx => "docx",
            Self::Ppt => "ppt",
            Self::Pptx => "pptx",
            Self::Xls => "xls",
            Self::Xlsx => "xlsx",
            Self::Csv => "csv",
        }
    }

    /// Whether a link points at a document of this type.
    ///
    /// The extension has to be followed by the end of the link or a
    /// non-alphanumeric character, so `.doc` does not match `report.docx`.
    pub fn matches_link(&self, link: &str) -> bool {
        let link = link.to_lowercase();
        let needle = format!(".{}", self.extension());

        link.match_indices(&needle).any(|(idx, _)| {
            link[idx + needle.len()..]
                .chars()
                .next()
                .map_or(true, |c| !c.is_ascii_alphanumeric())
        })
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for FileType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let ext = s.trim().trim_start_matches('.').to_lowercase();
        FileType::ALL
            .into_iter()
            .find(|ft| ft.extension() == ext)
            .ok_or_else(|| format!("unsupported file type: {}", s))
    }
}

/// A discovered document link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileResult {
    pub title: String,
    pub url: String,
}

/// The uniform response returned by every engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Organic results, in source order
    pub data: Vec<OrganicResult>,
    /// Image URLs, in source order
    pub images: Vec<ImageResult>,
    /// Documents grouped by type; only populated by engines with file discovery
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub files: BTreeMap<FileType, Vec<FileResult>>,
}

impl SearchResponse {
    /// An empty response
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a response, truncating each collection to the requested size
    pub fn new(
        mut data: Vec<OrganicResult>,
        mut images: Vec<ImageResult>,
        text_count: usize,
        image_count: usize,
    ) -> Self {
        data.truncate(text_count);
        images.truncate(image_count);
        Self {
            data,
            images,
            files: BTreeMap::new(),
        }
    }

    /// Attach discovered files, dropping empty groups
    pub fn with_files(mut self, files: BTreeMap<FileType, Vec<FileResult>>) -> Self {
        self.files = files
            .into_iter()
            .filter(|(_, entries)| !entries.is_empty())
            .collect();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty() && self.images.is_empty() && self.files.is_empty()
    }
}
