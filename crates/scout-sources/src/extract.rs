//! Source Extraction Pipeline: classify a URL, fetch it, and normalize the
//! result into [`ExtractedMetadata`].
//!
//! Routing precedence:
//! 1. Scholarly-repository URLs resolve through the repository's record API
//!    and never look at `content-type`.
//! 2. Everything else is fetched directly and classified by `content-type`,
//!    falling back to the path extension.
//!
//! PDFs, and HTML pages that yield no body text, get their full text from
//! the readability mirror. That secondary fetch is a soft failure:
//! the extraction still succeeds without full text.

use scout_types::{ExtractedMetadata, Result, ScoutError, SourceKind};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::arxiv::{self, ArxivClient};
use crate::html::{strip_html, HtmlHead};
use crate::http::{self, SourceEndpoints};
use crate::text::{clean_text, non_empty, truncate_chars};

pub const TITLE_MAX_CHARS: usize = 300;
pub const AUTHOR_MAX_CHARS: usize = 200;
pub const MAX_AUTHORS: usize = 50;
pub const ABSTRACT_MAX_CHARS: usize = 4_000;
pub const FULL_TEXT_MAX_CHARS: usize = 20_000;

/// Date-bearing meta fields, highest priority first.
const YEAR_META_KEYS: &[&str] = &[
    "citation_publication_date",
    "citation_date",
    "citation_online_date",
    "dc.date",
    "dcterms.issued",
    "article:published_time",
    "date",
];

const ABSTRACT_META_KEYS: &[&str] = &[
    "citation_abstract",
    "dc.description",
    "og:description",
    "description",
];

const AUTHOR_META_KEYS: &[&str] = &["citation_author", "dc.creator"];

// ---------------------------------------------------------------------------
// Routing and classification
// ---------------------------------------------------------------------------

/// Where an extraction request is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Resolve through the arXiv record API.
    Arxiv { id: String },
    /// Fetch the URL itself and classify the response.
    Direct,
}

/// Decide the route for `url` from its host and path alone.
pub fn route(url: &Url) -> Route {
    match arxiv::arxiv_id_from_url(url) {
        Some(id) => Route::Arxiv { id },
        None => Route::Direct,
    }
}

/// Classify a directly fetched document by `content-type`, falling back to
/// the path extension when the header is absent or generic.
pub fn classify(content_type: Option<&str>, url: &Url) -> SourceKind {
    let mime = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|m| m.trim().to_ascii_lowercase())
        .filter(|m| {
            !m.is_empty() && m != "application/octet-stream" && m != "binary/octet-stream"
        });

    if let Some(mime) = mime {
        return match mime.as_str() {
            "application/pdf" | "application/x-pdf" => SourceKind::Pdf,
            "text/html" | "application/xhtml+xml" => SourceKind::Html,
            _ => SourceKind::Other,
        };
    }

    let path = url.path().to_ascii_lowercase();
    if path.ends_with(".pdf") {
        SourceKind::Pdf
    } else if path.ends_with(".html") || path.ends_with(".htm") || path.ends_with(".xhtml") {
        SourceKind::Html
    } else {
        SourceKind::Other
    }
}

/// Title derived from the URL: last path segment without its extension,
/// else the host.
pub fn title_from_url(url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut segs| segs.rfind(|s| !s.is_empty()))
        .map(|s| urlencoding::decode(s).map(|d| d.into_owned()).unwrap_or_else(|_| s.to_string()));

    if let Some(segment) = segment {
        let stem = match segment.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && ext.len() <= 5 => stem.to_string(),
            _ => segment,
        };
        let title = clean_text(&stem.replace(['-', '_'], " "));
        if !title.is_empty() {
            return title;
        }
    }
    url.host_str()
        .map(String::from)
        .unwrap_or_else(|| url.to_string())
}

// ---------------------------------------------------------------------------
// Extractor
// ---------------------------------------------------------------------------

/// Fetches and normalizes remote documents. Holds no per-call state, so one
/// instance may serve concurrent calls.
#[derive(Debug, Clone)]
pub struct Extractor {
    client: reqwest::Client,
    arxiv: ArxivClient,
    readability_mirror: String,
}

impl Extractor {
    pub fn new(client: reqwest::Client, endpoints: &SourceEndpoints) -> Self {
        Self {
            arxiv: ArxivClient::new(client.clone(), endpoints.arxiv_api.clone()),
            client,
            readability_mirror: endpoints.readability_mirror.trim_end_matches('/').to_string(),
        }
    }

    /// Extract normalized metadata for `url`.
    pub async fn extract(&self, url: &str, cancel: &CancellationToken) -> Result<ExtractedMetadata> {
        let parsed = parse_http_url(url)?;
        let mut meta = match route(&parsed) {
            Route::Arxiv { id } => self.extract_arxiv(&id, cancel).await?,
            Route::Direct => self.extract_direct(parsed, cancel).await?,
        };
        meta.recompute_missing_fields();
        tracing::info!(
            url = %meta.canonical_url,
            kind = %meta.source_kind,
            missing = meta.missing_fields.len(),
            "Extracted source"
        );
        Ok(meta)
    }

    async fn extract_arxiv(&self, id: &str, cancel: &CancellationToken) -> Result<ExtractedMetadata> {
        let entry = self.arxiv.fetch_record(id, cancel).await?;

        let mut meta = ExtractedMetadata::new(
            truncate_chars(&entry.title, TITLE_MAX_CHARS),
            SourceKind::ScholarlyId,
            arxiv::abs_url(id),
        );
        meta.year = entry.year();
        meta.authors = cap_authors(entry.authors.iter().map(String::as_str));
        meta.abstract_text = non_empty(&entry.summary, ABSTRACT_MAX_CHARS);
        Ok(meta)
    }

    async fn extract_direct(&self, url: Url, cancel: &CancellationToken) -> Result<ExtractedMetadata> {
        let response = http::send(self.client.get(url.clone()), url.as_str(), cancel).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScoutError::FetchFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let kind = classify(content_type.as_deref(), &final_url);
        tracing::debug!(url = %final_url, ?content_type, %kind, "Classified document");

        let mut meta = match kind {
            SourceKind::Pdf => {
                ExtractedMetadata::new(title_from_url(&final_url), kind, final_url.as_str())
            }
            _ => {
                let body = http::read_text(response, final_url.as_str(), cancel).await?;
                markup_metadata(&body, kind, &final_url)
            }
        };

        // The mirror only supplies full text; body text already extracted wins.
        if meta.full_text.is_none() {
            if let Some(text) = self.readability_text(&final_url, cancel).await? {
                meta.full_text = Some(text);
            }
        }
        Ok(meta)
    }

    /// Full text through the readability mirror. Any failure other than
    /// cancellation yields `Ok(None)`.
    async fn readability_text(&self, url: &Url, cancel: &CancellationToken) -> Result<Option<String>> {
        let mirror_url = format!("{}/{}", self.readability_mirror, url);
        match http::get_text(&self.client, &mirror_url, cancel).await {
            Ok(body) => {
                let text = body.trim();
                if text.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(truncate_chars(text, FULL_TEXT_MAX_CHARS)))
                }
            }
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Readability fallback failed");
                Ok(None)
            }
        }
    }
}

/// Metadata from an HTML (or unknown-markup) document body.
fn markup_metadata(body: &str, kind: SourceKind, url: &Url) -> ExtractedMetadata {
    let head = HtmlHead::parse(body);

    let title = head
        .title
        .clone()
        .or_else(|| head.meta("og:title"))
        .unwrap_or_else(|| title_from_url(url));

    let mut meta = ExtractedMetadata::new(truncate_chars(&title, TITLE_MAX_CHARS), kind, url.as_str());

    let authors = AUTHOR_META_KEYS
        .iter()
        .map(|k| head.meta_all(k))
        .find(|values| !values.is_empty())
        .unwrap_or_default();
    meta.authors = cap_authors(authors.iter().map(String::as_str));
    meta.year = head.year(YEAR_META_KEYS);
    meta.abstract_text = head
        .first_meta(ABSTRACT_META_KEYS)
        .map(|a| truncate_chars(&a, ABSTRACT_MAX_CHARS));

    let text = strip_html(body);
    if !text.is_empty() {
        meta.full_text = Some(truncate_chars(&text, FULL_TEXT_MAX_CHARS));
    }
    meta
}

fn cap_authors<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    names
        .filter_map(|n| non_empty(n, AUTHOR_MAX_CHARS))
        .take(MAX_AUTHORS)
        .collect()
}

fn parse_http_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url.trim()).map_err(|e| ScoutError::Unparseable {
        what: format!("URL '{}'", url),
        message: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(ScoutError::Unparseable {
            what: format!("URL '{}'", url),
            message: format!("unsupported scheme '{}'", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{build_client, HttpSettings};
    use scout_types::MetadataField;
    use wiremock::matchers::{method, path, path_regex, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn extractor_for(server: &MockServer) -> Extractor {
        let client = build_client(&HttpSettings::default()).unwrap();
        Extractor::new(client, &SourceEndpoints::all_at(&server.uri()))
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    // --- classification ---

    #[test]
    fn pdf_extension_without_content_type_is_pdf() {
        let u = url("https://files.example.net/papers/report.pdf");
        assert_eq!(classify(None, &u), SourceKind::Pdf);
        assert_eq!(classify(Some("application/octet-stream"), &u), SourceKind::Pdf);
    }

    #[test]
    fn content_type_wins_over_extension() {
        let u = url("https://example.net/paper.pdf");
        assert_eq!(classify(Some("text/html; charset=utf-8"), &u), SourceKind::Html);
        let page = url("https://example.net/page");
        assert_eq!(classify(Some("application/pdf"), &page), SourceKind::Pdf);
        assert_eq!(classify(Some("text/plain"), &page), SourceKind::Other);
    }

    #[test]
    fn html_extension_and_unknown_paths() {
        assert_eq!(classify(None, &url("https://x.org/a/index.HTML")), SourceKind::Html);
        assert_eq!(classify(None, &url("https://x.org/a/paper")), SourceKind::Other);
    }

    #[test]
    fn scholarly_hosts_route_to_record_api_regardless_of_extension() {
        assert_eq!(
            route(&url("https://arxiv.org/pdf/1706.03762.pdf")),
            Route::Arxiv {
                id: "1706.03762".into()
            }
        );
        assert_eq!(
            route(&url("https://arxiv.org/abs/1706.03762")),
            Route::Arxiv {
                id: "1706.03762".into()
            }
        );
        assert_eq!(route(&url("https://example.org/abs/1706.03762")), Route::Direct);
    }

    #[test]
    fn url_title_fallback() {
        assert_eq!(
            title_from_url(&url("https://x.org/papers/deep_residual-learning.pdf")),
            "deep residual learning"
        );
        assert_eq!(title_from_url(&url("https://x.org/")), "x.org");
    }

    // --- extraction against mock servers ---

    #[tokio::test]
    async fn html_page_metadata_is_normalized() {
        let server = MockServer::start().await;
        let page = r#"<html><head>
            <title>A  Study &amp; Survey</title>
            <meta name="citation_author" content="Doe, Jane">
            <meta name="citation_author" content="Roe, Rick">
            <meta name="citation_date" content="2019-05-01">
            <meta name="description" content="We survey   things.">
            </head><body><p>Body text here.</p><script>ignored()</script></body></html>"#;
        Mock::given(method("GET"))
            .and(path("/paper"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(page, "text/html; charset=utf-8"),
            )
            .mount(&server)
            .await;

        let meta = extractor_for(&server)
            .extract(&format!("{}/paper", server.uri()), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(meta.source_kind, SourceKind::Html);
        assert_eq!(meta.title, "A Study & Survey");
        assert_eq!(meta.authors, vec!["Doe, Jane", "Roe, Rick"]);
        assert_eq!(meta.year, Some(2019));
        assert_eq!(meta.abstract_text.as_deref(), Some("We survey things."));
        let text = meta.full_text.as_deref().unwrap();
        assert!(text.contains("Body text here."));
        assert!(!text.contains("ignored()"));
        assert!(meta.missing_fields.is_empty());
    }

    #[tokio::test]
    async fn pdf_uses_readability_mirror_for_full_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/docs/neural-nets.pdf"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/pdf")
                    .set_body_bytes(b"%PDF-1.4".to_vec()),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex("^/mirror/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Extracted PDF text."))
            .mount(&server)
            .await;

        let meta = extractor_for(&server)
            .extract(
                &format!("{}/docs/neural-nets.pdf", server.uri()),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(meta.source_kind, SourceKind::Pdf);
        assert_eq!(meta.title, "neural nets");
        assert_eq!(meta.full_text.as_deref(), Some("Extracted PDF text."));
        assert!(meta.missing_fields.contains(&MetadataField::Abstract));
        assert!(!meta.missing_fields.contains(&MetadataField::FullText));
    }

    #[tokio::test]
    async fn html_body_text_is_kept_over_the_mirror() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/notes"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string("<html><head><title>Notes</title></head><body><p>Real body text.</p></body></html>"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex("^/mirror/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("MIRROR TEXT"))
            .expect(0)
            .mount(&server)
            .await;

        let meta = extractor_for(&server)
            .extract(&format!("{}/notes", server.uri()), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(meta.full_text.as_deref(), Some("Real body text."));
        assert!(meta.abstract_text.is_none());
        assert!(meta.missing_fields.contains(&MetadataField::Abstract));
    }

    #[tokio::test]
    async fn empty_html_body_falls_back_to_the_mirror() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/app"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string("<html><head><title>App</title></head><body><script>render()</script></body></html>"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex("^/mirror/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Rendered article text."))
            .mount(&server)
            .await;

        let meta = extractor_for(&server)
            .extract(&format!("{}/app", server.uri()), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(meta.title, "App");
        assert_eq!(meta.full_text.as_deref(), Some("Rendered article text."));
    }

    #[tokio::test]
    async fn readability_failure_is_soft() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/doc.pdf"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex("^/mirror/"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let meta = extractor_for(&server)
            .extract(&format!("{}/doc.pdf", server.uri()), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(meta.source_kind, SourceKind::Pdf);
        assert!(meta.full_text.is_none());
        assert!(meta.missing_fields.contains(&MetadataField::FullText));
    }

    #[tokio::test]
    async fn rejected_fetch_carries_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = extractor_for(&server)
            .extract(&format!("{}/missing", server.uri()), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ScoutError::FetchFailed { status: 404, .. }));
    }

    #[tokio::test]
    async fn arxiv_url_resolves_through_record_api() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/query"))
            .and(query_param("id_list", "1706.03762v7"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(crate::arxiv::tests::SAMPLE_FEED),
            )
            .mount(&server)
            .await;

        let meta = extractor_for(&server)
            .extract(
                "https://arxiv.org/pdf/1706.03762v7.pdf",
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(meta.source_kind, SourceKind::ScholarlyId);
        assert_eq!(meta.title, "Attention Is All You Need");
        assert_eq!(meta.canonical_url, "https://arxiv.org/abs/1706.03762v7");
        assert_eq!(meta.year, Some(2017));
        assert_eq!(meta.authors.len(), 2);
        assert!(meta.abstract_text.is_some());
        assert_eq!(
            meta.missing_fields.iter().copied().collect::<Vec<_>>(),
            vec![MetadataField::FullText]
        );
    }

    #[tokio::test]
    async fn arxiv_lookup_with_no_entry_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/query"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>empty</title></feed>"#,
            ))
            .mount(&server)
            .await;

        let err = extractor_for(&server)
            .extract("https://arxiv.org/abs/9999.99999", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ScoutError::RecordNotFound { .. }));
    }

    #[tokio::test]
    async fn cancelled_extraction_is_distinguishable() {
        let server = MockServer::start().await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = extractor_for(&server)
            .extract(&format!("{}/anything", server.uri()), &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn non_http_urls_are_unparseable() {
        let server = MockServer::start().await;
        let err = extractor_for(&server)
            .extract("ftp://example.org/file", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ScoutError::Unparseable { .. }));
    }
}
