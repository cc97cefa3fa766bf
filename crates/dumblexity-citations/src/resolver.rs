use async_trait::async_trait;
use futures_util::future::join_all;
use reqwest::header::USER_AGENT;
use std::time::Duration;
use tracing::debug;

/// Sent on every resolution request; some redirectors refuse non-browser agents.
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0 Safari/537.36";

/// Per-request timeout used unless configured otherwise.
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(10);

/// Maps URLs to their final redirect targets.
///
/// Implementations return exactly one output per input, in input order, and
/// fall back to the input URL whenever resolution fails.
#[async_trait]
pub trait ResolveUrls: Send + Sync {
    async fn resolve_all(&self, urls: &[String]) -> Vec<String>;
}

/// Resolves URLs by issuing a GET and following redirects.
pub struct HttpUrlResolver {
    http: reqwest::Client,
    timeout: Duration,
}

impl HttpUrlResolver {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            timeout: DEFAULT_RESOLVE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn resolve_one(&self, url: &str) -> String {
        let result = self
            .http
            .get(url)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .timeout(self.timeout)
            .send()
            .await;

        match result {
            Ok(resp) => {
                // Unredirected URLs keep their original spelling.
                if reqwest::Url::parse(url).is_ok_and(|parsed| &parsed == resp.url()) {
                    return url.to_string();
                }
                let resolved = resp.url().to_string();
                debug!(from = %url, to = %resolved, "Resolved citation URL");
                resolved
            }
            Err(e) => {
                debug!(url = %url, error = %e, "URL resolution failed, keeping original");
                url.to_string()
            }
        }
    }
}

impl Default for HttpUrlResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResolveUrls for HttpUrlResolver {
    async fn resolve_all(&self, urls: &[String]) -> Vec<String> {
        if urls.is_empty() {
            return Vec::new();
        }
        join_all(urls.iter().map(|url| self.resolve_one(url))).await
    }
}
