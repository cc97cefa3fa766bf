use dumblexity_core::{DumblexityError, DumblexityResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

pub const TAVILY_API_URL: &str = "https://api.tavily.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Result category for a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchTopic {
    #[default]
    General,
    News,
    Finance,
}

/// Recency window for a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    Day,
    Week,
    Month,
    Year,
}

/// Arguments of the `search_web` tool, forwarded to the search API as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub topic: SearchTopic,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,
    /// `YYYY-MM-DD`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    /// `YYYY-MM-DD`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    #[serde(default)]
    pub include_answer: bool,
    #[serde(default)]
    pub include_raw_content: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

fn default_max_results() -> u32 {
    5
}

/// Upper bound the search API accepts for `max_results`.
pub const MAX_SEARCH_RESULTS: u32 = 20;

/// Raw text of one page returned by the extract endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedPage {
    pub url: String,
    pub content: String,
}

#[derive(Deserialize)]
struct ExtractResponse {
    #[serde(default)]
    results: Vec<ExtractResult>,
    #[serde(default)]
    failed_results: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct ExtractResult {
    url: String,
    #[serde(default)]
    raw_content: Option<String>,
}

/// Minimal client for the Tavily search and extract API.
pub struct TavilyClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl TavilyClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: TAVILY_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Runs a search and returns the API's JSON reply untouched.
    pub async fn search(&self, request: &SearchRequest) -> DumblexityResult<serde_json::Value> {
        let mut request = request.clone();
        request.max_results = request.max_results.clamp(1, MAX_SEARCH_RESULTS);
        debug!(query = %request.query, topic = ?request.topic, "Tavily search");
        self.post("search", &request).await
    }

    /// Extracts raw page content for each URL; pages that fail are skipped.
    pub async fn extract(&self, urls: &[String]) -> DumblexityResult<Vec<ExtractedPage>> {
        let body = serde_json::json!({
            "urls": urls,
            "extract_depth": "basic",
        });
        let value = self.post("extract", &body).await?;
        let response: ExtractResponse = serde_json::from_value(value)?;

        if !response.failed_results.is_empty() {
            warn!(
                failed = response.failed_results.len(),
                "Some pages could not be extracted"
            );
        }

        Ok(response
            .results
            .into_iter()
            .map(|r| ExtractedPage {
                url: r.url,
                content: r.raw_content.unwrap_or_default(),
            })
            .collect())
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> DumblexityResult<serde_json::Value> {
        let url = format!("{}/{}", self.base_url, path);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(REQUEST_TIMEOUT)
            .json(body)
            .send()
            .await
            .map_err(|e| DumblexityError::Http(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let error_body = resp
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(DumblexityError::Http(format!(
                "Tavily API error {status}: {error_body}"
            )));
        }

        resp.json()
            .await
            .map_err(|e| DumblexityError::Http(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_search_request_defaults() {
        let request: SearchRequest =
            serde_json::from_value(serde_json::json!({"query": "rust 2024 edition"})).unwrap();
        assert_eq!(request.topic, SearchTopic::General);
        assert_eq!(request.max_results, 5);
        assert!(!request.include_answer);
        assert!(request.time_range.is_none());
    }

    #[test]
    fn test_search_request_omits_unset_optionals() {
        let request: SearchRequest = serde_json::from_value(serde_json::json!({
            "query": "q",
            "topic": "news",
            "time_range": "week"
        }))
        .unwrap();
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["topic"], "news");
        assert_eq!(body["time_range"], "week");
        assert!(body.get("country").is_none());
        assert!(body.get("start_date").is_none());
    }

    #[test]
    fn test_search_request_rejects_unknown_topic() {
        let result = serde_json::from_value::<SearchRequest>(serde_json::json!({
            "query": "q",
            "topic": "gossip"
        }));
        assert!(result.is_err());
    }
}
