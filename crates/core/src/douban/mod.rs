//! Douban book API v2 metadata source.

pub mod endpoint;
pub mod model;
pub mod translate;

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::config::DoubanConfig;
use crate::error::{DoubanError, LookupError};
use crate::lookup::{
    Capability, IdentifyContext, MetadataQuery, MetadataSource, OptionKind, ResultSink,
    SourceInfo, SourceOption,
};
use crate::metadata::Metadata;
use crate::transport::{redact, HttpTransport, Transport};

use self::endpoint::Endpoints;
use self::model::{RemoteBook, SearchResponse};
use self::translate::to_metadata;

pub const INFO: SourceInfo = SourceInfo {
    name: "Douban",
    description: "Download metadata from douban.com",
    author: "douban-metadata contributors",
    version: (1, 0, 0),
    minimum_host_version: (2, 80, 0),
    supported_platforms: &["windows", "osx", "linux"],
};

pub const CAPABILITIES: &[Capability] = &[Capability::Identify];

pub const TOUCHED_FIELDS: &[&str] = &[
    "title",
    "authors",
    "publisher",
    "pubdate",
    "comments",
    "tags",
    "identifier:isbn",
    "identifier:douban",
    "rating",
    "series",
];

pub const OPTIONS: &[SourceOption] = &[SourceOption {
    name: "apikey",
    kind: OptionKind::String,
    default: "",
    label: "douban api v2 apikey",
    description: "douban api v2 apikey",
}];

/// Which endpoint a query resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupTarget {
    Isbn(String),
    Subject(String),
    Search(String),
}

impl LookupTarget {
    pub fn kind(&self) -> &'static str {
        match self {
            LookupTarget::Isbn(_) => "isbn",
            LookupTarget::Subject(_) => "subject",
            LookupTarget::Search(_) => "search",
        }
    }
}

/// Pick the endpoint for `query`: ISBN first, then Douban id, then free text.
/// `None` when there is nothing to ask for.
pub fn plan(query: &MetadataQuery) -> Option<LookupTarget> {
    if let Some(isbn) = &query.isbn {
        return Some(LookupTarget::Isbn(isbn.clone()));
    }
    if let Some(id) = &query.douban_id {
        return Some(LookupTarget::Subject(id.clone()));
    }

    let mut q = String::new();
    if let Some(title) = &query.title {
        q.push_str(title);
        q.push(' ');
    }
    if let Some(authors) = &query.authors {
        q.push_str(&authors.join(" "));
    }
    if q.is_empty() {
        None
    } else {
        Some(LookupTarget::Search(q))
    }
}

pub struct DoubanSource<T: Transport = HttpTransport> {
    transport: T,
    endpoints: Endpoints,
}

impl DoubanSource<HttpTransport> {
    pub fn new() -> Result<Self, LookupError> {
        Ok(Self::with_transport(HttpTransport::new()?, Endpoints::default()))
    }

    pub fn from_config(cfg: &DoubanConfig) -> Result<Self, LookupError> {
        let endpoints = Endpoints::new(&cfg.base_url, cfg.search_count)?;
        Ok(Self::with_transport(HttpTransport::new()?, endpoints))
    }
}

impl<T: Transport> DoubanSource<T> {
    pub fn with_transport(transport: T, endpoints: Endpoints) -> Self {
        Self {
            transport,
            endpoints,
        }
    }

    /// Issue the single request `query` calls for and return its records.
    ///
    /// Without a credential, or once `ctx.abort` is set, nothing is requested
    /// and the result is empty. Translation happens as the returned iterator
    /// is consumed, in the order the server listed the books.
    pub fn lookup(
        &self,
        query: &MetadataQuery,
        ctx: &IdentifyContext<'_>,
    ) -> Result<Identified, LookupError> {
        if ctx.credential.is_empty() {
            tracing::debug!("No Douban apikey configured; skipping lookup");
            return Ok(Identified::empty());
        }
        let Some(target) = plan(query) else {
            return Ok(Identified::empty());
        };
        if ctx.abort.is_aborted() {
            tracing::debug!("Lookup aborted before request");
            return Ok(Identified::empty());
        }

        let url = match &target {
            LookupTarget::Isbn(isbn) => self.endpoints.isbn(isbn, ctx.credential),
            LookupTarget::Subject(id) => self.endpoints.subject(id, ctx.credential),
            LookupTarget::Search(q) => self.endpoints.search(q, ctx.credential),
        };
        tracing::debug!(endpoint = target.kind(), url = %redact(&url), "Requesting Douban");

        let body = self.transport.get(&url, ctx.timeout)?;
        let books = match target {
            LookupTarget::Search(_) => decode::<SearchResponse>(&body)?.books,
            LookupTarget::Isbn(_) | LookupTarget::Subject(_) => vec![decode::<RemoteBook>(&body)?],
        };
        tracing::debug!(count = books.len(), "Douban returned books");

        Ok(Identified {
            books: books.into_iter(),
        })
    }
}

impl<T: Transport> MetadataSource for DoubanSource<T> {
    fn info(&self) -> &SourceInfo {
        &INFO
    }

    fn capabilities(&self) -> &[Capability] {
        CAPABILITIES
    }

    fn touched_fields(&self) -> &[&'static str] {
        TOUCHED_FIELDS
    }

    fn options(&self) -> &[SourceOption] {
        OPTIONS
    }

    fn identify(
        &self,
        query: &MetadataQuery,
        ctx: &IdentifyContext<'_>,
        sink: &mut dyn ResultSink,
    ) -> Result<(), LookupError> {
        for record in self.lookup(query, ctx)? {
            sink.put(record?);
        }
        Ok(())
    }
}

/// Look up `query` using the key, endpoint and timeout from `cfg`.
pub fn identify_with_config(query: &MetadataQuery, cfg: &DoubanConfig) -> Result<Vec<Metadata>, DoubanError> {
    let source = DoubanSource::from_config(cfg)?;
    let ctx = IdentifyContext::new(&cfg.apikey).with_timeout(Duration::from_secs(cfg.timeout_secs));
    let mut results: Vec<Metadata> = Vec::new();
    source.identify(query, &ctx, &mut results)?;
    Ok(results)
}

/// Records from one lookup. Finite and consumed once.
#[derive(Debug)]
pub struct Identified {
    books: std::vec::IntoIter<RemoteBook>,
}

impl Identified {
    fn empty() -> Self {
        Self {
            books: Vec::new().into_iter(),
        }
    }
}

impl Iterator for Identified {
    type Item = Result<Metadata, LookupError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.books.next().map(|book| to_metadata(&book))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.books.size_hint()
    }
}

impl ExactSizeIterator for Identified {}

fn decode<D: DeserializeOwned>(body: &str) -> Result<D, LookupError> {
    serde_json::from_str(body).map_err(|e| LookupError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::AbortSignal;
    use reqwest::Url;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned bodies by URL path and records every URL requested.
    #[derive(Default)]
    struct RecordingTransport {
        bodies: HashMap<String, String>,
        requests: Mutex<Vec<(Url, Duration)>>,
    }

    impl RecordingTransport {
        fn serve(mut self, path: &str, body: serde_json::Value) -> Self {
            self.bodies.insert(path.to_string(), body.to_string());
            self
        }

        fn requested(&self) -> Vec<Url> {
            self.requests.lock().unwrap().iter().map(|(u, _)| u.clone()).collect()
        }
    }

    impl Transport for RecordingTransport {
        fn get(&self, url: &Url, timeout: Duration) -> Result<String, LookupError> {
            self.requests.lock().unwrap().push((url.clone(), timeout));
            self.bodies
                .get(url.path())
                .cloned()
                .ok_or_else(|| LookupError::HttpStatus {
                    status: 404,
                    url: url.to_string(),
                })
        }
    }

    fn book(id: &str, title: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "title": title,
            "author": ["Donald E. Knuth"],
            "rating": {"average": "9.0"},
            "tags": [{"name": "数学"}],
        })
    }

    fn source(transport: RecordingTransport) -> DoubanSource<RecordingTransport> {
        DoubanSource::with_transport(transport, Endpoints::default())
    }

    fn query_param(url: &Url, key: &str) -> Option<String> {
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    #[test]
    fn plan_prefers_isbn_over_id_over_text() {
        let mut q = MetadataQuery {
            title: Some("t".to_string()),
            authors: Some(vec!["a".to_string()]),
            isbn: Some("9787115308108".to_string()),
            douban_id: Some("10426640".to_string()),
        };
        assert_eq!(plan(&q), Some(LookupTarget::Isbn("9787115308108".to_string())));
        q.isbn = None;
        assert_eq!(plan(&q), Some(LookupTarget::Subject("10426640".to_string())));
        q.douban_id = None;
        assert_eq!(plan(&q), Some(LookupTarget::Search("t a".to_string())));
    }

    #[test]
    fn search_string_is_title_space_then_joined_authors() {
        let q = MetadataQuery::by_text(
            Some("foo".to_string()),
            Some(vec!["bar".to_string(), "baz".to_string()]),
        );
        assert_eq!(plan(&q), Some(LookupTarget::Search("foo bar baz".to_string())));
    }

    #[test]
    fn search_string_keeps_trailing_space_after_lone_title() {
        let q = MetadataQuery::by_text(Some("foo".to_string()), None);
        assert_eq!(plan(&q), Some(LookupTarget::Search("foo ".to_string())));
    }

    #[test]
    fn search_string_from_authors_only() {
        let q = MetadataQuery::by_text(None, Some(vec!["bar".to_string(), "baz".to_string()]));
        assert_eq!(plan(&q), Some(LookupTarget::Search("bar baz".to_string())));
    }

    #[test]
    fn empty_query_plans_nothing() {
        assert_eq!(plan(&MetadataQuery::default()), None);
        assert_eq!(plan(&MetadataQuery::by_text(None, Some(vec![]))), None);
    }

    #[test]
    fn isbn_lookup_hits_isbn_endpoint_only() {
        let transport = RecordingTransport::default()
            .serve("/v2/book/isbn/9787115308108", book("10426640", "具体数学"))
            .serve("/v2/book/10426640", book("10426640", "wrong endpoint"));
        let src = source(transport);
        let q = MetadataQuery {
            isbn: Some("9787115308108".to_string()),
            douban_id: Some("10426640".to_string()),
            ..Default::default()
        };
        let mut out: Vec<Metadata> = Vec::new();
        src.identify(&q, &IdentifyContext::new("k3y"), &mut out).unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "具体数学");
        assert_eq!(out[0].identifier("douban"), Some("10426640"));
        let requested = src.transport.requested();
        assert_eq!(requested.len(), 1);
        assert_eq!(requested[0].path(), "/v2/book/isbn/9787115308108");
        assert_eq!(query_param(&requested[0], "apikey").as_deref(), Some("k3y"));
    }

    #[test]
    fn subject_lookup_uses_douban_id() {
        let transport = RecordingTransport::default().serve("/v2/book/10426640", book("10426640", "具体数学"));
        let src = source(transport);
        let mut out: Vec<Metadata> = Vec::new();
        src.identify(
            &MetadataQuery::by_douban_id("10426640"),
            &IdentifyContext::new("k3y"),
            &mut out,
        )
        .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(src.transport.requested()[0].path(), "/v2/book/10426640");
    }

    #[test]
    fn search_emits_books_in_server_order() {
        let transport = RecordingTransport::default().serve(
            "/v2/book/search",
            serde_json::json!({"count": 2, "total": 2, "books": [book("1", "b1"), book("2", "b2")]}),
        );
        let src = source(transport);
        let q = MetadataQuery::by_text(
            Some("foo".to_string()),
            Some(vec!["bar".to_string(), "baz".to_string()]),
        );
        let mut out: Vec<Metadata> = Vec::new();
        src.identify(&q, &IdentifyContext::new("k3y"), &mut out).unwrap();

        let titles: Vec<&str> = out.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["b1", "b2"]);
        let url = &src.transport.requested()[0];
        assert_eq!(query_param(url, "q").as_deref(), Some("foo bar baz"));
        assert_eq!(query_param(url, "count").as_deref(), Some("10"));
        assert_eq!(query_param(url, "apikey").as_deref(), Some("k3y"));
    }

    #[test]
    fn search_keeps_books_whose_series_has_no_title() {
        let mut untitled = book("2", "b2");
        untitled["series"] = serde_json::json!({"id": "660"});
        let mut titled = book("3", "b3");
        titled["series"] = serde_json::json!({"id": "661", "title": "丛书"});
        let transport = RecordingTransport::default().serve(
            "/v2/book/search",
            serde_json::json!({"books": [book("1", "b1"), untitled, titled]}),
        );
        let src = source(transport);
        let mut out: Vec<Metadata> = Vec::new();
        src.identify(
            &MetadataQuery::by_text(Some("foo".to_string()), None),
            &IdentifyContext::new("k"),
            &mut out,
        )
        .unwrap();

        let series: Vec<Option<&str>> = out.iter().map(|m| m.series.as_deref()).collect();
        assert_eq!(series, vec![None, None, Some("丛书")]);
    }

    #[test]
    fn search_with_no_books_is_empty() {
        let transport = RecordingTransport::default().serve("/v2/book/search", serde_json::json!({"books": []}));
        let src = source(transport);
        let results: Vec<_> = src
            .lookup(&MetadataQuery::by_text(Some("nothing".to_string()), None), &IdentifyContext::new("k"))
            .unwrap()
            .collect();
        assert!(results.is_empty());
        assert_eq!(src.transport.requested().len(), 1);
    }

    #[test]
    fn empty_credential_issues_no_request() {
        let src = source(RecordingTransport::default());
        for q in [
            MetadataQuery::by_isbn("9787115308108"),
            MetadataQuery::by_douban_id("1"),
            MetadataQuery::by_text(Some("foo".to_string()), None),
        ] {
            let mut out: Vec<Metadata> = Vec::new();
            src.identify(&q, &IdentifyContext::new(""), &mut out).unwrap();
            assert!(out.is_empty());
        }
        assert!(src.transport.requested().is_empty());
    }

    #[test]
    fn empty_query_issues_no_request() {
        let src = source(RecordingTransport::default());
        let mut out: Vec<Metadata> = Vec::new();
        src.identify(&MetadataQuery::default(), &IdentifyContext::new("k"), &mut out)
            .unwrap();
        assert!(out.is_empty());
        assert!(src.transport.requested().is_empty());
    }

    #[test]
    fn abort_before_request_issues_no_request() {
        let src = source(RecordingTransport::default());
        let abort = AbortSignal::new();
        abort.abort();
        let ctx = IdentifyContext::new("k").with_abort(abort);
        let results: Vec<_> = src.lookup(&MetadataQuery::by_isbn("1"), &ctx).unwrap().collect();
        assert!(results.is_empty());
        assert!(src.transport.requested().is_empty());
    }

    #[test]
    fn timeout_is_passed_to_transport() {
        let transport = RecordingTransport::default().serve("/v2/book/isbn/1", book("1", "t"));
        let src = source(transport);
        let ctx = IdentifyContext::new("k").with_timeout(Duration::from_secs(7));
        let _ = src.lookup(&MetadataQuery::by_isbn("1"), &ctx).unwrap().count();
        let requests = src.transport.requests.lock().unwrap();
        assert_eq!(requests[0].1, Duration::from_secs(7));
    }

    #[test]
    fn transport_errors_propagate() {
        let src = source(RecordingTransport::default());
        let err = src
            .lookup(&MetadataQuery::by_isbn("0000000000"), &IdentifyContext::new("k"))
            .unwrap_err();
        assert!(matches!(err, LookupError::HttpStatus { status: 404, .. }));
    }

    #[test]
    fn malformed_body_is_a_decode_error() {
        let mut transport = RecordingTransport::default();
        transport
            .bodies
            .insert("/v2/book/isbn/1".to_string(), "<html>oops</html>".to_string());
        let src = source(transport);
        let err = src
            .lookup(&MetadataQuery::by_isbn("1"), &IdentifyContext::new("k"))
            .unwrap_err();
        assert!(matches!(err, LookupError::Decode(_)));
    }

    #[test]
    fn translation_failure_keeps_earlier_records() {
        let unrated = serde_json::json!({"id": "2", "title": "unrated"});
        let transport = RecordingTransport::default().serve(
            "/v2/book/search",
            serde_json::json!({"books": [book("1", "b1"), unrated, book("3", "b3")]}),
        );
        let src = source(transport);
        let mut out: Vec<Metadata> = Vec::new();
        let err = src
            .identify(
                &MetadataQuery::by_text(Some("x".to_string()), None),
                &IdentifyContext::new("k"),
                &mut out,
            )
            .unwrap_err();
        assert!(matches!(err, LookupError::MissingField("rating.average")));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "b1");
    }

    #[test]
    fn identified_is_lazy_per_record() {
        let unrated = serde_json::json!({"id": "2", "title": "unrated"});
        let transport = RecordingTransport::default().serve(
            "/v2/book/search",
            serde_json::json!({"books": [book("1", "b1"), unrated]}),
        );
        let src = source(transport);
        let mut results = src
            .lookup(&MetadataQuery::by_text(Some("x".to_string()), None), &IdentifyContext::new("k"))
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results.next().unwrap().unwrap().title, "b1");
        assert!(results.next().unwrap().is_err());
        assert!(results.next().is_none());
    }

    #[test]
    fn identify_with_config_without_apikey_is_empty() {
        let cfg = DoubanConfig::default();
        let results = identify_with_config(&MetadataQuery::by_isbn("9787115308108"), &cfg).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn identify_with_config_rejects_bad_base_url() {
        let cfg = DoubanConfig {
            apikey: "k".to_string(),
            base_url: "not a url".to_string(),
            ..Default::default()
        };
        let err = identify_with_config(&MetadataQuery::by_isbn("1"), &cfg).unwrap_err();
        assert!(matches!(err, DoubanError::Lookup(LookupError::InvalidUrl(_))));
    }

    #[test]
    fn declares_host_contract() {
        let src = source(RecordingTransport::default());
        assert_eq!(src.info().name, "Douban");
        assert_eq!(src.capabilities(), &[Capability::Identify]);
        assert!(src.touched_fields().contains(&"identifier:douban"));
        assert_eq!(src.options()[0].name, "apikey");
        assert_eq!(src.options()[0].default, "");
    }
}
