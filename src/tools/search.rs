//! Web search providers
//!
//! Two backends are available:
//! - **Tavily**: REST API, needs a key (`TAVILY_API_KEY`)
//! - **DuckDuckGo**: keyless, via the daedra crate (`duckduckgo` feature)
//!
//! Search is best-effort. Providers swallow their own failures and return `None`; the
//! research pipeline substitutes placeholder data rather than aborting.

use crate::types::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// A single search hit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchResponse {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub results: Vec<SearchHit>,
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// `None` on any failure; search errors are never raised.
    async fn search(&self, query: &str) -> Option<SearchResponse>;

    fn name(&self) -> &str;
}

/// Tavily search API client
pub struct TavilySearch {
    http: reqwest::Client,
    api_key: String,
    api_base: String,
    max_results: usize,
    search_depth: String,
}

impl TavilySearch {
    pub fn new(api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            api_base: "https://api.tavily.com".to_string(),
            max_results: 5,
            search_depth: "basic".to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_search_depth(mut self, search_depth: impl Into<String>) -> Self {
        self.search_depth = search_depth.into();
        self
    }

    async fn request(&self, query: &str) -> Result<SearchResponse> {
        let body = json!({
            "api_key": self.api_key,
            "query": query,
            "search_depth": self.search_depth,
            "include_answer": true,
            "max_results": self.max_results,
            "include_domains": [],
            "exclude_domains": [],
        });

        let response = self
            .http
            .post(format!("{}/search", self.api_base))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Tavily request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Provider(format!(
                "Tavily API Error: {}",
                response.status()
            )));
        }

        response
            .json::<SearchResponse>()
            .await
            .map_err(|e| AppError::Provider(format!("Invalid Tavily response body: {}", e)))
    }
}

#[async_trait]
impl SearchProvider for TavilySearch {
    async fn search(&self, query: &str) -> Option<SearchResponse> {
        tracing::info!("[Tavily] Searching: {}", query);

        match self.request(query).await {
            Ok(response) => {
                tracing::debug!("[Tavily] {} results", response.results.len());
                Some(response)
            }
            Err(e) => {
                tracing::warn!("[Tavily] Search failed: {}", e);
                None
            }
        }
    }

    fn name(&self) -> &str {
        "tavily"
    }
}

/// Keyless web search powered by daedra (DuckDuckGo backend)
#[cfg(feature = "duckduckgo")]
pub struct DuckDuckGoSearch {
    max_results: usize,
}

#[cfg(feature = "duckduckgo")]
impl DuckDuckGoSearch {
    pub fn new(max_results: usize) -> Self {
        Self { max_results }
    }
}

#[cfg(feature = "duckduckgo")]
#[async_trait]
impl SearchProvider for DuckDuckGoSearch {
    async fn search(&self, query: &str) -> Option<SearchResponse> {
        tracing::info!("[DuckDuckGo] Searching: {}", query);

        let args = daedra::SearchArgs {
            query: query.to_string(),
            options: Some(daedra::SearchOptions {
                num_results: self.max_results,
                ..Default::default()
            }),
        };

        match daedra::tools::search::perform_search(&args).await {
            Ok(response) => Some(SearchResponse {
                answer: None,
                results: response
                    .data
                    .iter()
                    .map(|r| SearchHit {
                        title: r.title.to_string(),
                        url: r.url.to_string(),
                        content: r.description.to_string(),
                        score: None,
                    })
                    .collect(),
            }),
            Err(e) => {
                tracing::warn!("[DuckDuckGo] Search failed: {}", e);
                None
            }
        }
    }

    fn name(&self) -> &str {
        "duckduckgo"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tavily_builder() {
        let tavily = TavilySearch::new("tvly-test".to_string())
            .with_api_base("http://localhost:9999/")
            .with_max_results(3)
            .with_search_depth("advanced");

        assert_eq!(tavily.api_base, "http://localhost:9999");
        assert_eq!(tavily.max_results, 3);
        assert_eq!(tavily.search_depth, "advanced");
        assert_eq!(tavily.name(), "tavily");
    }

    #[tokio::test]
    async fn test_tavily_error_status_is_provider_error() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let tavily = TavilySearch::new("tvly-bad".to_string()).with_api_base(server.uri());
        let err = tavily.request("반려견").await.unwrap_err();
        assert!(matches!(&err, AppError::Provider(msg) if msg.starts_with("Tavily API Error: 401")));
        assert!(!err.message().contains("tvly-bad"));
    }

    #[test]
    fn test_search_response_tolerates_extra_fields() {
        let raw = r#"{
            "query": "q",
            "answer": "short answer",
            "results": [
                {"title": "A", "url": "https://a.example", "content": "body", "score": 0.9, "raw_content": null}
            ],
            "response_time": 1.2
        }"#;
        let parsed: SearchResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.answer.as_deref(), Some("short answer"));
        assert_eq!(parsed.results.len(), 1);
        assert_eq!(parsed.results[0].url, "https://a.example");
    }

    #[tokio::test]
    async fn test_tavily_unreachable_returns_none() {
        let tavily = TavilySearch::new("k".to_string()).with_api_base("http://127.0.0.1:1");
        assert!(tavily.search("anything").await.is_none());
    }
}
