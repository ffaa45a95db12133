use reqwest::Url;

use crate::error::LookupError;

pub const DEFAULT_BASE_URL: &str = "https://api.douban.com";
pub const DEFAULT_SEARCH_COUNT: u32 = 10;

/// The three Douban book endpoints, rooted at a configurable base URL.
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: Url,
    search_count: u32,
}

impl Endpoints {
    pub fn new(base: &str, search_count: u32) -> Result<Self, LookupError> {
        let base = Url::parse(base).map_err(|e| LookupError::InvalidUrl(format!("{}: {}", base, e)))?;
        if base.cannot_be_a_base() {
            return Err(LookupError::InvalidUrl(base.to_string()));
        }
        Ok(Self { base, search_count })
    }

    /// `/v2/book/isbn/{isbn}?apikey=`
    pub fn isbn(&self, isbn: &str, apikey: &str) -> Url {
        self.build(&["v2", "book", "isbn", isbn], &[("apikey", apikey)])
    }

    /// `/v2/book/{id}?apikey=`
    pub fn subject(&self, id: &str, apikey: &str) -> Url {
        self.build(&["v2", "book", id], &[("apikey", apikey)])
    }

    /// `/v2/book/search?q=&count=&apikey=`
    pub fn search(&self, query: &str, apikey: &str) -> Url {
        let count = self.search_count.to_string();
        self.build(
            &["v2", "book", "search"],
            &[("q", query), ("count", &count), ("apikey", apikey)],
        )
    }

    fn build(&self, segments: &[&str], params: &[(&str, &str)]) -> Url {
        let mut url = self.base.clone();
        // Checked in `new`.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url.query_pairs_mut().clear().extend_pairs(params);
        url
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            base: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
            search_count: DEFAULT_SEARCH_COUNT,
        }
    }
}
