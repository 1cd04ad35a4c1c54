//! Filesystem-safe report slugs derived from seed URLs.

use scout_sources::arxiv;
use scout_types::{Result, ScoutError};
use url::Url;

/// Used when nothing usable survives sanitization.
pub const FALLBACK_SLUG: &str = "report";

/// Parse and check a seed URL. Only absolute `http`/`https` URLs are accepted.
pub fn parse_seed_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    let invalid = |reason: &str| ScoutError::InvalidSeedUrl {
        url: raw.to_string(),
        reason: reason.to_string(),
    };
    if trimmed.is_empty() {
        return Err(invalid("URL is empty"));
    }
    let url = Url::parse(trimmed).map_err(|e| invalid(&e.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(&format!("unsupported scheme '{}'", other))),
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("URL has no host"));
    }
    Ok(url)
}

/// Derive the report slug for `url`, at most `max_len` characters.
///
/// arXiv abstract and PDF links map to `arxiv-<id>`; anything else is built
/// from host and path.
pub fn derive_slug(url: &Url, max_len: usize) -> String {
    let slug = match arxiv::arxiv_id_from_url(url) {
        Some(id) => format!("arxiv-{}", collapse(&id, |c| c.is_ascii_alphanumeric() || c == '.')),
        None => {
            let host = url.host_str().unwrap_or_default();
            collapse(&format!("{}{}", host, url.path()), |c| c.is_ascii_alphanumeric())
        }
    };
    let capped = cap(&slug, max_len);
    if capped.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        capped
    }
}

/// Lowercase, replace every run of rejected characters with one `-`, trim `-`.
fn collapse(s: &str, keep: impl Fn(char) -> bool) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_dash = false;
    for c in s.chars().flat_map(char::to_lowercase) {
        if keep(c) {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c);
        } else {
            pending_dash = true;
        }
    }
    out
}

fn cap(slug: &str, max_len: usize) -> String {
    let cut: String = slug.chars().take(max_len).collect();
    cut.trim_matches('-').to_string()
}
