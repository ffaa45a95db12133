//! Host-facing metadata source interface.
//!
//! A source declares what it can do ([`Capability`]), which record fields it
//! may fill in, and the options it needs from the host's settings store. The
//! host then calls [`MetadataSource::identify`] once per user-initiated
//! lookup, passing the credential and a sink that receives each record.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::Duration;

use crate::error::LookupError;
use crate::metadata::Metadata;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub trait MetadataSource: Send + Sync {
    fn info(&self) -> &SourceInfo;
    fn capabilities(&self) -> &[Capability];
    fn touched_fields(&self) -> &[&'static str];
    fn options(&self) -> &[SourceOption];

    /// Look up `query` and hand every record found to `sink`, in order.
    ///
    /// Records already put into `sink` stay there when a later one fails.
    fn identify(
        &self,
        query: &MetadataQuery,
        ctx: &IdentifyContext<'_>,
        sink: &mut dyn ResultSink,
    ) -> Result<(), LookupError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub author: &'static str,
    pub version: (u16, u16, u16),
    pub minimum_host_version: (u16, u16, u16),
    pub supported_platforms: &'static [&'static str],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Identify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    String,
}

/// A setting the host stores on the source's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOption {
    pub name: &'static str,
    pub kind: OptionKind,
    pub default: &'static str,
    pub label: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataQuery {
    pub title: Option<String>,
    pub authors: Option<Vec<String>>,
    pub isbn: Option<String>,
    pub douban_id: Option<String>,
}

impl MetadataQuery {
    pub fn by_isbn(isbn: impl Into<String>) -> Self {
        Self {
            isbn: Some(isbn.into()),
            ..Default::default()
        }
    }

    pub fn by_douban_id(id: impl Into<String>) -> Self {
        Self {
            douban_id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn by_text(title: Option<String>, authors: Option<Vec<String>>) -> Self {
        Self {
            title,
            authors,
            ..Default::default()
        }
    }

    /// Build a query from the host's identifier map (`isbn`, `douban` keys).
    pub fn from_identifiers(
        title: Option<String>,
        authors: Option<Vec<String>>,
        identifiers: &BTreeMap<String, String>,
    ) -> Self {
        Self {
            title,
            authors,
            isbn: identifiers.get("isbn").cloned(),
            douban_id: identifiers.get("douban").cloned(),
        }
    }
}

/// Per-call inputs owned by the host.
#[derive(Debug, Clone)]
pub struct IdentifyContext<'a> {
    pub credential: &'a str,
    pub timeout: Duration,
    pub abort: AbortSignal,
}

impl<'a> IdentifyContext<'a> {
    pub fn new(credential: &'a str) -> Self {
        Self {
            credential,
            timeout: DEFAULT_TIMEOUT,
            abort: AbortSignal::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_abort(mut self, abort: AbortSignal) -> Self {
        self.abort = abort;
        self
    }
}

/// Advisory cancellation flag shared between the host and a running lookup.
/// Only consulted before the request goes out.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Receives records one at a time, in emission order.
pub trait ResultSink {
    fn put(&mut self, record: Metadata);
}

impl ResultSink for Vec<Metadata> {
    fn put(&mut self, record: Metadata) {
        self.push(record);
    }
}

impl ResultSink for Sender<Metadata> {
    fn put(&mut self, record: Metadata) {
        if self.send(record).is_err() {
            tracing::warn!("Result queue receiver dropped; discarding record");
        }
    }
}
