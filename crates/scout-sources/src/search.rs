//! Web Search Aggregator: ranked fan-out over scholarly search providers
//! with deduplication and partial-failure tolerance.

use std::collections::HashSet;

use async_trait::async_trait;
use scout_types::{Result, ScoutError, SearchResult};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::arxiv::ArxivClient;
use crate::http::SourceEndpoints;
use crate::semantic_scholar::SemanticScholarClient;

/// A single ranked search backend.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Short tag used in results and error labels.
    fn name(&self) -> &str;
    async fn search(
        &self,
        query: &str,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<SearchResult>>;
}

/// Merged results plus the labeled failures of any providers that errored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provider_errors: Vec<String>,
}

/// Queries providers in rank order until `limit` unique results are found.
pub struct SearchAggregator {
    providers: Vec<Box<dyn SearchProvider>>,
}

impl SearchAggregator {
    /// An aggregator with no providers; add them with [`with_provider`](Self::with_provider).
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Semantic Scholar first, arXiv as the fallback.
    pub fn scholarly(client: reqwest::Client, endpoints: &SourceEndpoints) -> Self {
        Self::new()
            .with_provider(SemanticScholarClient::new(
                client.clone(),
                endpoints.semantic_scholar_api.clone(),
            ))
            .with_provider(ArxivClient::new(client, endpoints.arxiv_api.clone()))
    }

    /// Append a provider at the lowest rank.
    pub fn with_provider(mut self, provider: impl SearchProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Search every provider in order, stopping once `limit` unique URLs are
    /// collected. Earlier providers win on duplicate URLs.
    ///
    /// Fails only if no provider produced a usable result. Cancellation is
    /// never absorbed into `provider_errors`.
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<SearchResponse> {
        let limit = limit.max(1);
        let mut results: Vec<SearchResult> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut provider_errors: Vec<String> = Vec::new();

        for provider in &self.providers {
            if results.len() >= limit {
                break;
            }
            match provider.search(query, limit, cancel).await {
                Ok(hits) => {
                    tracing::debug!(provider = provider.name(), hits = hits.len(), "Provider returned");
                    for hit in hits {
                        if hit.url.is_empty() || !seen.insert(hit.url.clone()) {
                            continue;
                        }
                        results.push(hit);
                    }
                }
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    tracing::warn!(provider = provider.name(), error = %e, "Search provider failed");
                    provider_errors.push(format!("{}: {}", provider.name(), e));
                }
            }
        }

        results.truncate(limit);

        if results.is_empty() {
            if provider_errors.is_empty() {
                provider_errors.push(format!("no results for '{}'", query));
            }
            return Err(ScoutError::SearchFailed {
                errors: provider_errors,
            });
        }

        Ok(SearchResponse {
            results,
            provider_errors,
        })
    }
}

impl Default for SearchAggregator {
    fn default() -> Self {
        Self::new()
    }
}
