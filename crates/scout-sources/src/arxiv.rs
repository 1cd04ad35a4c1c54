//! arXiv: scholarly-record lookup and paper-repository search over the
//! Atom export API.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use scout_types::{Result, ScoutError, SearchResult};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::http;
use crate::search::SearchProvider;
use crate::text::{clip_with_ellipsis, decode_entities, normalize_whitespace, SNIPPET_MAX_CHARS};

pub const PROVIDER_TAG: &str = "arxiv";

const ARXIV_HOSTS: &[&str] = &["arxiv.org", "www.arxiv.org", "export.arxiv.org"];

/// Returns `true` if `host` serves arXiv abstract/PDF pages.
pub fn is_arxiv_host(host: &str) -> bool {
    ARXIV_HOSTS.contains(&host.to_ascii_lowercase().as_str())
}

/// Extract the arXiv identifier from an `/abs/<id>` or `/pdf/<id>[.pdf]` URL.
///
/// Old-style identifiers with a slash (`hep-th/9901001`) are kept whole.
pub fn arxiv_id_from_url(url: &Url) -> Option<String> {
    if !url.host_str().is_some_and(is_arxiv_host) {
        return None;
    }
    let path = url.path().trim_matches('/');
    let rest = path
        .strip_prefix("abs/")
        .or_else(|| path.strip_prefix("pdf/"))?;
    let id = rest.strip_suffix(".pdf").unwrap_or(rest).trim_matches('/');
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

/// Canonical abstract-page URL for an identifier.
pub fn abs_url(id: &str) -> String {
    format!("https://arxiv.org/abs/{}", id)
}

// ---------------------------------------------------------------------------
// Atom parsing
// ---------------------------------------------------------------------------

/// One `<entry>` of an arXiv Atom feed.
#[derive(Debug, Clone, PartialEq)]
pub struct ArxivEntry {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub authors: Vec<String>,
    pub published: String,
    pub abs_url: String,
    pub pdf_url: Option<String>,
}

impl ArxivEntry {
    /// Four-digit publication year from the `published` timestamp.
    pub fn year(&self) -> Option<i32> {
        self.published.get(..4).and_then(|y| y.parse().ok())
    }
}

static ENTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<entry\b[^>]*>(.*?)</entry>").expect("entry regex"));
static AUTHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<author\b[^>]*>(.*?)</author>").expect("author regex"));
static ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<id\b[^>]*>(.*?)</id>").expect("id regex"));
static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<title\b[^>]*>(.*?)</title>").expect("title regex"));
static SUMMARY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<summary\b[^>]*>(.*?)</summary>").expect("summary regex"));
static PUBLISHED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<published\b[^>]*>(.*?)</published>").expect("published regex")
});
static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<name\b[^>]*>(.*?)</name>").expect("name regex"));
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<link\b([^>]*)>").expect("link regex"));
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("attribute regex")
});
static CDATA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").expect("cdata regex"));

/// Parse every well-formed entry of an Atom feed. The API reports lookup
/// errors as a pseudo-entry whose id points at `/api/errors`; those are skipped.
pub fn parse_feed(xml: &str) -> Vec<ArxivEntry> {
    ENTRY_RE
        .captures_iter(xml)
        .filter_map(|c| c.get(1))
        .filter_map(|m| parse_entry(m.as_str()))
        .collect()
}

fn parse_entry(entry: &str) -> Option<ArxivEntry> {
    let id_url = element_text(entry, &ID_RE)?;
    if id_url.contains("/api/errors") {
        return None;
    }
    let id = id_from_id_url(&id_url);
    let title = element_text(entry, &TITLE_RE).filter(|t| !t.is_empty())?;

    let authors = AUTHOR_RE
        .captures_iter(entry)
        .filter_map(|c| c.get(1))
        .filter_map(|block| element_text(block.as_str(), &NAME_RE))
        .filter(|name| !name.is_empty())
        .collect();

    let mut pdf_url = None;
    let mut abs = abs_url(&id);
    for link in LINK_RE.captures_iter(entry).filter_map(|c| c.get(1)) {
        let attrs = link.as_str();
        let href = attribute(attrs, "href").unwrap_or_default();
        let title_attr = attribute(attrs, "title").unwrap_or_default();
        let link_type = attribute(attrs, "type").unwrap_or_default();
        if title_attr == "pdf" || link_type == "application/pdf" {
            pdf_url = Some(href);
        } else if href.contains("/abs/") {
            abs = href.replacen("http://", "https://", 1);
        }
    }

    Some(ArxivEntry {
        id,
        title,
        summary: element_text(entry, &SUMMARY_RE).unwrap_or_default(),
        authors,
        published: element_text(entry, &PUBLISHED_RE).unwrap_or_default(),
        abs_url: abs,
        pdf_url,
    })
}

fn id_from_id_url(id_url: &str) -> String {
    match id_url.rfind("/abs/") {
        Some(pos) => id_url[pos + 5..].to_string(),
        None => id_url.to_string(),
    }
}

/// Character data of the first element matched by `re`.
fn element_text(xml: &str, re: &Regex) -> Option<String> {
    re.captures(xml)
        .and_then(|c| c.get(1))
        .map(|m| character_data(m.as_str()))
}

/// Entity-decoded text with CDATA sections taken verbatim, whitespace collapsed.
fn character_data(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last = 0;
    for cdata in CDATA_RE.captures_iter(raw) {
        let (Some(whole), Some(inner)) = (cdata.get(0), cdata.get(1)) else {
            continue;
        };
        out.push_str(&decode_entities(&raw[last..whole.start()]));
        out.push_str(inner.as_str());
        last = whole.end();
    }
    out.push_str(&decode_entities(&raw[last..]));
    normalize_whitespace(&out)
}

/// Value of attribute `name`, single- or double-quoted, in any position.
fn attribute(attrs: &str, name: &str) -> Option<String> {
    ATTR_RE
        .captures_iter(attrs)
        .find(|c| c[1].eq_ignore_ascii_case(name))
        .and_then(|c| c.get(2).or_else(|| c.get(3)))
        .map(|m| decode_entities(m.as_str()))
}

// ---------------------------------------------------------------------------
// ArxivClient
// ---------------------------------------------------------------------------

/// HTTP client for the arXiv export API.
#[derive(Debug, Clone)]
pub struct ArxivClient {
    client: reqwest::Client,
    base_url: String,
}

impl ArxivClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Look up the single record for `id`.
    pub async fn fetch_record(&self, id: &str, cancel: &CancellationToken) -> Result<ArxivEntry> {
        let url = format!(
            "{}/api/query?id_list={}",
            self.base_url,
            urlencoding::encode(id)
        );
        tracing::debug!(%url, "arXiv record lookup");
        let body = http::get_text(&self.client, &url, cancel).await?;

        if !body.contains("<feed") {
            return Err(ScoutError::Unparseable {
                what: format!("arXiv record for '{}'", id),
                message: "response is not an Atom feed".into(),
            });
        }
        parse_feed(&body)
            .into_iter()
            .next()
            .ok_or_else(|| ScoutError::RecordNotFound { id: id.to_string() })
    }
}

#[async_trait]
impl SearchProvider for ArxivClient {
    fn name(&self) -> &str {
        PROVIDER_TAG
    }

    async fn search(
        &self,
        query: &str,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<SearchResult>> {
        let search_query = format!("all:{}", query);
        let url = format!(
            "{}/api/query?search_query={}&start=0&max_results={}",
            self.base_url,
            urlencoding::encode(&search_query),
            limit
        );
        tracing::debug!(%url, "arXiv search");
        let body = http::get_text(&self.client, &url, cancel).await?;

        Ok(parse_feed(&body)
            .into_iter()
            .map(|entry| SearchResult {
                title: entry.title,
                url: entry.abs_url,
                snippet: clip_with_ellipsis(&entry.summary, SNIPPET_MAX_CHARS),
                provider: PROVIDER_TAG.to_string(),
            })
            .collect())
    }
}
