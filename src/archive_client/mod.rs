// HTTP access to archive listing pages

pub mod retry;

pub use retry::{RetryPolicy, RetryingFetcher};

use reqwest::Url;

/// Why a page could not be turned into markup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// HTTP 429 persisted through every allowed retry.
    #[error("rate limited (HTTP 429) after {attempts} attempts")]
    RateLimited { attempts: u32 },
    /// Any other non-success status. Not retried.
    #[error("HTTP status {status}")]
    Status { status: u16 },
    /// No response at all (DNS, connect, TLS, body read).
    #[error("network error: {0}")]
    Network(String),
}

/// Raw outcome of a single GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResponse {
    pub status: u16,
    pub body: String,
}

impl PageResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A single HTTP GET with no retry logic. Only network-level failures are errors.
#[async_trait::async_trait]
pub trait PageSource: Send + Sync {
    async fn get(&self, url: &Url) -> Result<PageResponse, FetchError>;
}

/// Fetch a listing page's markup, applying whatever retry policy the implementation carries.
#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError>;
}

#[async_trait::async_trait]
impl<T: PageSource + ?Sized> PageSource for std::sync::Arc<T> {
    async fn get(&self, url: &Url) -> Result<PageResponse, FetchError> {
        (**self).get(url).await
    }
}

#[derive(Clone, Debug)]
pub struct ArchiveClient {
    base_url: Url,
    cookie: Option<String>,
    client: reqwest::Client,
}

impl ArchiveClient {
    /// Create a new client for the given archive origin (e.g. "https://archiveofourown.org").
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let base_url = Url::parse(base_url.trim_end_matches('/'))?;
        tracing::debug!(%base_url, "creating ArchiveClient");
        Ok(ArchiveClient {
            base_url,
            cookie: None,
            client,
        })
    }

    /// Return a client that forwards the given Cookie header with every request
    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        let cookie = cookie.into();
        self.cookie = (!cookie.is_empty()).then_some(cookie);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve an href as it appears in page markup against the archive origin.
    pub fn resolve(&self, href: &str) -> Option<Url> {
        self.base_url.join(href.trim()).ok()
    }

    fn cookie_header(&self) -> Option<(&'static str, &str)> {
        self.cookie.as_deref().map(|c| ("Cookie", c))
    }
}

#[async_trait::async_trait]
impl PageSource for ArchiveClient {
    #[tracing::instrument(level = "debug", skip(self))]
    async fn get(&self, url: &Url) -> Result<PageResponse, FetchError> {
        tracing::debug!(%url, "GET listing page");
        let mut req = self.client.get(url.clone());
        if let Some((k, v)) = self.cookie_header() {
            req = req.header(k, v);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        let status = resp.status();
        let body = if status.is_success() {
            resp.text()
                .await
                .map_err(|e| FetchError::Network(e.to_string()))?
        } else {
            String::new()
        };
        Ok(PageResponse {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_hrefs_against_origin() {
        let c = ArchiveClient::new("https://archiveofourown.org/").unwrap();
        assert_eq!(
            c.resolve("/users/alice/readings").unwrap().as_str(),
            "https://archiveofourown.org/users/alice/readings"
        );
        assert_eq!(
            c.resolve("https://archiveofourown.gay/users/bob/bookmarks")
                .unwrap()
                .as_str(),
            "https://archiveofourown.gay/users/bob/bookmarks"
        );
    }

    #[test]
    fn empty_cookie_is_not_forwarded() {
        let c = ArchiveClient::new("https://archiveofourown.org")
            .unwrap()
            .with_cookie("");
        assert!(c.cookie_header().is_none());
        let c = c.with_cookie("_otwarchive_session=abc");
        assert_eq!(
            c.cookie_header(),
            Some(("Cookie", "_otwarchive_session=abc"))
        );
    }

    #[test]
    fn success_range() {
        let ok = PageResponse { status: 200, body: String::new() };
        let limited = PageResponse { status: 429, body: String::new() };
        assert!(ok.is_success());
        assert!(!limited.is_success());
    }
}
