//! Wire model of the Douban book API v2.
//!
//! Every field is optional: the API omits anything the catalog lacks, and
//! fields the translator treats as required are checked there, not here.

use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RemoteBook {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub author: Option<AuthorField>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub pubdate: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub tags: Vec<RemoteTag>,
    #[serde(default)]
    pub isbn13: Option<String>,
    #[serde(default)]
    pub rating: Option<RemoteRating>,
    #[serde(default)]
    pub series: Option<RemoteSeries>,
}

/// The `author` field is a list in v2 responses but a bare string in some
/// older records.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AuthorField {
    One(String),
    Many(Vec<String>),
}

impl AuthorField {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            AuthorField::One(name) => vec![name],
            AuthorField::Many(names) => names,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteTag {
    pub name: String,
    #[serde(default)]
    pub count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteRating {
    #[serde(default)]
    pub average: Option<RatingValue>,
    #[serde(default, rename = "numRaters")]
    pub num_raters: Option<u64>,
}

/// `average` is a string such as `"8.9"` on most endpoints, a number on others.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RatingValue {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteSeries {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub books: Vec<RemoteBook>,
}
