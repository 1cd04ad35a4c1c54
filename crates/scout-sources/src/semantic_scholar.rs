//! Semantic Scholar academic graph: the primary search provider.

use async_trait::async_trait;
use scout_types::{Result, ScoutError, SearchResult};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::arxiv;
use crate::http;
use crate::search::SearchProvider;
use crate::text::{clean_text, clip_with_ellipsis, SNIPPET_MAX_CHARS};

pub const PROVIDER_TAG: &str = "semantic-scholar";

const SEARCH_FIELDS: &str = "title,url,abstract,year,externalIds,tldr";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<PaperRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaperRecord {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default, rename = "abstract")]
    abstract_text: Option<String>,
    #[serde(default)]
    external_ids: Option<ExternalIds>,
    #[serde(default)]
    tldr: Option<Tldr>,
}

#[derive(Debug, Default, Deserialize)]
struct ExternalIds {
    #[serde(default, rename = "ArXiv")]
    arxiv: Option<String>,
    #[serde(default, rename = "DOI")]
    doi: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Tldr {
    #[serde(default)]
    text: Option<String>,
}

impl PaperRecord {
    /// Document URL, else an identifier-derived URL.
    fn best_url(&self) -> Option<String> {
        let direct = self
            .url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(String::from);
        direct.or_else(|| {
            let ids = self.external_ids.as_ref()?;
            ids.arxiv
                .as_deref()
                .filter(|id| !id.is_empty())
                .map(arxiv::abs_url)
                .or_else(|| {
                    ids.doi
                        .as_deref()
                        .filter(|doi| !doi.is_empty())
                        .map(|doi| format!("https://doi.org/{}", doi))
                })
        })
    }

    fn into_result(self) -> Option<SearchResult> {
        let url = self.best_url()?;
        let snippet = self
            .abstract_text
            .as_deref()
            .or_else(|| self.tldr.as_ref().and_then(|t| t.text.as_deref()))
            .map(clean_text)
            .unwrap_or_default();
        Some(SearchResult {
            title: self.title.as_deref().map(clean_text).unwrap_or_default(),
            url,
            snippet: clip_with_ellipsis(&snippet, SNIPPET_MAX_CHARS),
            provider: PROVIDER_TAG.to_string(),
        })
    }
}

/// Map a raw search payload to results, skipping records with no usable URL.
fn parse_search_response(body: &str) -> Result<Vec<SearchResult>> {
    let parsed: SearchResponse =
        serde_json::from_str(body).map_err(|e| ScoutError::Unparseable {
            what: "Semantic Scholar search response".into(),
            message: e.to_string(),
        })?;
    Ok(parsed
        .data
        .into_iter()
        .filter_map(PaperRecord::into_result)
        .collect())
}

/// Client for the Semantic Scholar paper search endpoint.
#[derive(Debug, Clone)]
pub struct SemanticScholarClient {
    client: reqwest::Client,
    base_url: String,
}

impl SemanticScholarClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SearchProvider for SemanticScholarClient {
    fn name(&self) -> &str {
        PROVIDER_TAG
    }

    async fn search(
        &self,
        query: &str,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<SearchResult>> {
        let url = format!(
            "{}/graph/v1/paper/search?query={}&limit={}&fields={}",
            self.base_url,
            urlencoding::encode(query),
            limit,
            SEARCH_FIELDS
        );
        tracing::debug!(%url, "Semantic Scholar search");
        let body = http::get_text(&self.client, &url, cancel).await?;
        parse_search_response(&body)
    }
}
