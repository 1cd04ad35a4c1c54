//! HTTP plumbing shared by every remote source: client construction,
//! endpoint configuration and cancellation-aware requests.

use std::future::Future;
use std::time::Duration;

use scout_types::{Result, ScoutError};
use tokio_util::sync::CancellationToken;

const USER_AGENT: &str = concat!("scout/", env!("CARGO_PKG_VERSION"));

/// Base URLs of the remote services consulted by the pipelines.
#[derive(Debug, Clone)]
pub struct SourceEndpoints {
    /// arXiv export API (Atom records and search).
    pub arxiv_api: String,
    /// Semantic Scholar academic graph API.
    pub semantic_scholar_api: String,
    /// Readability mirror; the target URL is appended after a `/`.
    pub readability_mirror: String,
}

impl Default for SourceEndpoints {
    fn default() -> Self {
        Self {
            arxiv_api: "https://export.arxiv.org".to_string(),
            semantic_scholar_api: "https://api.semanticscholar.org".to_string(),
            readability_mirror: "https://r.jina.ai".to_string(),
        }
    }
}

impl SourceEndpoints {
    /// Point every service at one base URL. Used by tests with a mock server.
    pub fn all_at(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            arxiv_api: base.clone(),
            semantic_scholar_api: base.clone(),
            readability_mirror: format!("{}/mirror", base),
        }
    }
}

/// Client-level settings applied to every request.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub user_agent: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub max_redirects: usize,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_redirects: 10,
        }
    }
}

/// Build a `reqwest::Client` from the given settings.
pub fn build_client(settings: &HttpSettings) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(settings.timeout)
        .connect_timeout(settings.connect_timeout)
        .user_agent(settings.user_agent.clone())
        .redirect(reqwest::redirect::Policy::limited(settings.max_redirects))
        .build()
        .map_err(|e| ScoutError::Other(format!("Failed to create HTTP client: {}", e)))
}

/// Race `fut` against `cancel`, yielding [`ScoutError::Cancelled`] if the
/// token fires first.
pub async fn or_cancel<F: Future>(fut: F, cancel: &CancellationToken) -> Result<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ScoutError::Cancelled),
        out = fut => Ok(out),
    }
}

/// Send a request, mapping transport failures to [`ScoutError::Network`].
///
/// Non-success statuses are returned as-is so callers can decide how to
/// treat them.
pub async fn send(
    request: reqwest::RequestBuilder,
    url: &str,
    cancel: &CancellationToken,
) -> Result<reqwest::Response> {
    or_cancel(request.send(), cancel)
        .await?
        .map_err(|e| network_error(url, e))
}

/// Read a response body as text.
pub async fn read_text(
    response: reqwest::Response,
    url: &str,
    cancel: &CancellationToken,
) -> Result<String> {
    or_cancel(response.text(), cancel)
        .await?
        .map_err(|e| network_error(url, e))
}

/// GET `url` and return the body, failing with [`ScoutError::FetchFailed`] on
/// any non-success status.
pub async fn get_text(
    client: &reqwest::Client,
    url: &str,
    cancel: &CancellationToken,
) -> Result<String> {
    let response = send(client.get(url), url, cancel).await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ScoutError::FetchFailed {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    read_text(response, url, cancel).await
}

fn network_error(url: &str, err: reqwest::Error) -> ScoutError {
    ScoutError::Network {
        url: url.to_string(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn get_text_returns_body_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/hello"))
            .respond_with(ResponseTemplate::new(200).set_body_string("hi there"))
            .mount(&server)
            .await;

        let client = build_client(&HttpSettings::default()).unwrap();
        let url = format!("{}/hello", server.uri());
        let body = get_text(&client, &url, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(body, "hi there");
    }

    #[tokio::test]
    async fn get_text_reports_status_on_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = build_client(&HttpSettings::default()).unwrap();
        let url = format!("{}/forbidden", server.uri());
        let err = get_text(&client, &url, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ScoutError::FetchFailed { status: 403, .. }));
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_delay(std::time::Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let client = build_client(&HttpSettings::default()).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = get_text(&client, &server.uri(), &cancel).await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn all_at_points_every_endpoint_at_base() {
        let endpoints = SourceEndpoints::all_at("http://127.0.0.1:9/");
        assert_eq!(endpoints.arxiv_api, "http://127.0.0.1:9");
        assert_eq!(endpoints.semantic_scholar_api, "http://127.0.0.1:9");
        assert_eq!(endpoints.readability_mirror, "http://127.0.0.1:9/mirror");
    }
}
