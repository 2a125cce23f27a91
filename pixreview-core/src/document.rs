//! Index and single-case documents written by the test runner.
//!
//! Both are JSON files tagged by a `page` field. Every document is addressed
//! by a locator URL (`file://` for documents on disk); hrefs and image paths
//! inside a document resolve relative to that locator.
//!
//! ```json
//! {"page": "index", "rows": [{"href": "test1.html", "actual_hash": "deadbeef"}]}
//! {"page": "case", "actual_hash": "deadbeef", "images": ["rec.png", "act.png"]}
//! ```

use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;
use serde::Deserialize;
use url::Url;

use crate::types::{IndexEntry, ReviewKey};

/// Errors raised while loading or interpreting a document.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed document {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid locator '{0}'")]
    Locator(String),
    #[error("locator '{0}' is not a local file")]
    NotLocal(String),
    #[error("invalid document {path}: {reason}")]
    Invalid { path: String, reason: String },
}

/// A parsed document, discriminated by its `page` field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "page", rename_all = "lowercase")]
pub enum Document {
    Index(IndexDocument),
    Case(CaseDocument),
}

/// Listing of test cases; row order is traversal order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IndexDocument {
    #[serde(default)]
    pub title: Option<String>,
    pub rows: Vec<IndexRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IndexRow {
    pub href: String,
    pub actual_hash: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// One test case: the recorded/actual pair plus optional animation frames.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CaseDocument {
    pub actual_hash: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Exactly two entries; their order is the diff input order.
    pub images: Vec<String>,
    #[serde(default)]
    pub frames: Vec<String>,
}

/// A document together with the locator it was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub locator: Url,
    pub document: Document,
}

impl LoadedDocument {
    /// Loads and validates the document stored at `path`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let absolute = std::fs::canonicalize(path)
            .map_err(|source| DocumentError::Read { path: display.clone(), source })?;
        let locator = Url::from_file_path(&absolute)
            .map_err(|()| DocumentError::Locator(absolute.display().to_string()))?;
        let raw = std::fs::read_to_string(&absolute)
            .map_err(|source| DocumentError::Read { path: display.clone(), source })?;
        Self::parse(locator, &raw)
    }

    /// Loads the document a locator points to. Only `file://` locators load.
    ///
    /// The locator is kept as given so keys derived from it match the index
    /// entry that linked here.
    pub fn from_locator(locator: &str) -> Result<Self, DocumentError> {
        let url = Url::parse(locator).map_err(|_| DocumentError::Locator(locator.to_owned()))?;
        let path = url
            .to_file_path()
            .map_err(|()| DocumentError::NotLocal(locator.to_owned()))?;
        let raw = std::fs::read_to_string(&path).map_err(|source| DocumentError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(url, &raw)
    }

    /// Parses `raw` as the document found at `locator`.
    pub fn parse(locator: Url, raw: &str) -> Result<Self, DocumentError> {
        let document: Document = serde_json::from_str(raw).map_err(|source| DocumentError::Parse {
            path: locator.to_string(),
            source,
        })?;
        let loaded = Self { locator, document };
        loaded.validate()?;
        Ok(loaded)
    }

    fn validate(&self) -> Result<(), DocumentError> {
        let invalid = |reason: String| DocumentError::Invalid { path: self.locator.to_string(), reason };
        match &self.document {
            Document::Case(case) => {
                if case.images.len() != 2 {
                    return Err(invalid(format!(
                        "expected 2 images (recorded, actual), found {}",
                        case.images.len()
                    )));
                }
                if case.actual_hash.is_empty() {
                    return Err(invalid("empty actual_hash".to_owned()));
                }
            }
            Document::Index(index) => {
                if let Some(row) = index.rows.iter().find(|r| r.actual_hash.is_empty()) {
                    return Err(invalid(format!("row '{}' has an empty actual_hash", row.href)));
                }
            }
        }
        Ok(())
    }

    /// Review key of a case document, `None` for an index.
    pub fn review_key(&self) -> Option<ReviewKey> {
        match &self.document {
            Document::Case(case) => Some(ReviewKey::new(self.locator.as_str(), &case.actual_hash)),
            Document::Index(_) => None,
        }
    }

    /// Index entries with hrefs resolved against this document's locator.
    pub fn entries(&self) -> Result<Vec<IndexEntry>, DocumentError> {
        let Document::Index(index) = &self.document else {
            return Ok(Vec::new());
        };
        index
            .rows
            .iter()
            .map(|row| {
                let resolved = self
                    .locator
                    .join(&row.href)
                    .map_err(|_| DocumentError::Locator(row.href.clone()))?;
                let name = row
                    .name
                    .clone()
                    .or_else(|| case_stem(resolved.as_str()))
                    .unwrap_or_else(|| row.href.clone());
                Ok(IndexEntry {
                    key: ReviewKey::new(resolved.as_str(), &row.actual_hash),
                    name,
                    href: row.href.clone(),
                })
            })
            .collect()
    }

    /// Resolves a path written inside this document to a local file path.
    pub fn resolve_path(&self, relative: &str) -> Result<PathBuf, DocumentError> {
        let url = self
            .locator
            .join(relative)
            .map_err(|_| DocumentError::Locator(relative.to_owned()))?;
        url.to_file_path()
            .map_err(|()| DocumentError::NotLocal(url.to_string()))
    }
}

/// Origin of a locator: `scheme://host[:port]`, or `file://` for local files.
pub fn origin_of(locator: &str) -> String {
    match Url::parse(locator) {
        Ok(url) if url.scheme() == "file" => "file://".to_owned(),
        Ok(url) => url.origin().ascii_serialization(),
        Err(_) => "null".to_owned(),
    }
}

/// Name of the test behind `locator`: the last path segment, percent-decoded,
/// without its extension.
///
/// `https://x/dir/test%20one.html` gives `test one`.
pub fn case_stem(locator: &str) -> Option<String> {
    let segment = match Url::parse(locator) {
        Ok(url) => url.path_segments()?.last()?.to_owned(),
        Err(_) => locator.rsplit('/').next()?.to_owned(),
    };
    let decoded = percent_decode_str(&segment).decode_utf8_lossy();
    let stem = match decoded.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => decoded.as_ref(),
    };
    if stem.is_empty() { None } else { Some(stem.to_owned()) }
}
