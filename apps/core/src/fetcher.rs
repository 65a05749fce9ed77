use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::Config;
use crate::model::{Query, RawPackageRecord};
use crate::page::Page;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("search service returned status {0}")]
    Remote(u16),
    #[error("fetch cancelled")]
    Cancelled,
}

/// The remote lookup behind the fetcher: one query in, raw records out.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &Query) -> Result<Vec<RawPackageRecord>, FetchError>;
}

/// Runs one backend lookup per call, bounded by the caller's cancellation
/// scope. Taking `&mut self` keeps calls strictly sequential.
pub struct Fetcher {
    backend: Arc<dyn SearchBackend>,
}

impl Fetcher {
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self { backend }
    }

    pub async fn fetch(
        &mut self,
        query: &Query,
        scope: &CancellationToken,
    ) -> Result<Vec<RawPackageRecord>, FetchError> {
        if scope.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        let outcome = tokio::select! {
            biased;
            () = scope.cancelled() => return Err(FetchError::Cancelled),
            outcome = self.backend.search(query) => outcome,
        };

        // A response that raced with cancellation still belongs to a
        // superseded query.
        if scope.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        outcome
    }
}

/// Search backend speaking the NuGet search query protocol over HTTP.
pub struct HttpSearchBackend {
    client: Client,
    endpoint: String,
    page_size: u16,
    package_type: Option<&'static str>,
}

impl HttpSearchBackend {
    pub fn new(cfg: &Config, page: Page) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_millis(cfg.request_timeout_ms))
            .user_agent(cfg.user_agent.clone())
            .build()?;
        Ok(Self::with_client(
            client,
            &cfg.endpoint,
            cfg.page_size,
            page.package_type(),
        ))
    }

    pub fn with_client(
        client: Client,
        endpoint: &str,
        page_size: u16,
        package_type: Option<&'static str>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.trim().to_string(),
            page_size,
            package_type,
        }
    }

    pub fn search_url(&self, text: &str) -> String {
        let separator = if self.endpoint.contains('?') { '&' } else { '?' };
        let mut url = format!("{}{separator}take={}", self.endpoint, self.page_size);
        if let Some(package_type) = self.package_type {
            url.push_str("&packageType=");
            url.push_str(&urlencoding::encode(package_type));
        }
        url.push_str("&q=");
        url.push_str(&urlencoding::encode(text));
        url
    }
}

#[async_trait]
impl SearchBackend for HttpSearchBackend {
    async fn search(&self, query: &Query) -> Result<Vec<RawPackageRecord>, FetchError> {
        let url = self.search_url(query.text());
        debug!(seq = query.seq(), %url, "requesting package search");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Remote(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(parse_search_body(&body))
    }
}

/// Extracts the `data` array of a search response. A body that is not JSON,
/// or has no `data` array, is an empty result rather than a failure.
pub fn parse_search_body(body: &str) -> Vec<RawPackageRecord> {
    let root: Value = match serde_json::from_str(body) {
        Ok(root) => root,
        Err(error) => {
            debug!(%error, "search response is not valid json");
            return Vec::new();
        }
    };

    let Some(data) = root.get("data").and_then(Value::as_array) else {
        return Vec::new();
    };
    data.iter().map(RawPackageRecord::from_json).collect()
}
