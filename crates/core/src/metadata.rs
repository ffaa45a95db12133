use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Title used by the host when a source supplies none.
pub const UNKNOWN_TITLE: &str = "Unknown";

/// Sole author recorded when a source supplies none.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// The host's canonical representation of a book's bibliographic data.
/// Every metadata source translates its own schema into this struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub title: String,
    pub authors: Vec<String>,
    pub publisher: Option<String>,
    pub pubdate: Option<DateTime<Utc>>,
    pub comments: Option<String>,
    pub tags: Vec<String>,
    pub identifiers: BTreeMap<String, String>,
    pub rating: Option<f64>,
    pub series: Option<String>,
    pub isbn: Option<String>,
}

impl Metadata {
    /// An empty title or author list falls back to the host's `"Unknown"`
    /// placeholders.
    pub fn new(title: impl Into<String>, authors: Vec<String>) -> Self {
        let title = title.into();
        let authors = if authors.is_empty() {
            vec![UNKNOWN_AUTHOR.to_string()]
        } else {
            authors
        };
        Self {
            title: if title.is_empty() {
                UNKNOWN_TITLE.to_string()
            } else {
                title
            },
            authors,
            publisher: None,
            pubdate: None,
            comments: None,
            tags: Vec::new(),
            identifiers: BTreeMap::new(),
            rating: None,
            series: None,
            isbn: None,
        }
    }

    pub fn identifier(&self, scheme: &str) -> Option<&str> {
        self.identifiers.get(scheme).map(String::as_str)
    }

    pub fn set_identifier(&mut self, scheme: impl Into<String>, value: impl Into<String>) {
        self.identifiers.insert(scheme.into(), value.into());
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Self::new(UNKNOWN_TITLE, Vec::new())
    }
}
