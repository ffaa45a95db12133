//! HTTP seam between the dispatcher and the network.

use std::time::Duration;

use reqwest::Url;

use crate::error::LookupError;

/// A blocking GET that yields the response body of a successful request.
pub trait Transport: Send + Sync {
    fn get(&self, url: &Url, timeout: Duration) -> Result<String, LookupError>;
}

/// Default transport over a blocking `reqwest` client.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, LookupError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("douban-metadata/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LookupError::Network(e.to_string()))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &Url, timeout: Duration) -> Result<String, LookupError> {
        let resp = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .map_err(|e| LookupError::Network(e.without_url().to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(LookupError::HttpStatus {
                status: status.as_u16(),
                url: redact(url),
            });
        }

        resp.text().map_err(|e| LookupError::Network(e.without_url().to_string()))
    }
}

/// `url` with the credential masked, for errors and logs.
pub fn redact(url: &Url) -> String {
    let mut shown = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "apikey" { "***".to_string() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();
    if !pairs.is_empty() {
        shown.query_pairs_mut().clear().extend_pairs(pairs);
    }
    shown.to_string()
}
