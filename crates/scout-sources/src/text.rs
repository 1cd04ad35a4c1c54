//! Text normalization helpers shared by the extraction and search paths.

use scraper::Html;

/// Character budget for search-result snippets.
pub const SNIPPET_MAX_CHARS: usize = 280;

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text content of an HTML fragment: every character reference decoded and
/// inline markup such as `<i>` dropped.
///
/// Input without `&` or `<` is returned as is.
pub fn decode_entities(s: &str) -> String {
    if !s.contains(['&', '<']) {
        return s.to_string();
    }
    Html::parse_fragment(s).root_element().text().collect()
}

/// Decode entities, then collapse whitespace.
pub fn clean_text(s: &str) -> String {
    normalize_whitespace(&decode_entities(s))
}

/// Truncate to at most `max_chars` characters, respecting char boundaries.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Truncate to `max_chars` characters, appending `…` when anything was cut.
pub fn clip_with_ellipsis(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut clipped = truncate_chars(s, max_chars).trim_end().to_string();
    clipped.push('…');
    clipped
}

/// Return `Some(normalized)` when the whitespace-normalized text is non-empty.
/// Input is expected to be decoded already.
pub(crate) fn non_empty(s: &str, max_chars: usize) -> Option<String> {
    let cleaned = normalize_whitespace(s);
    if cleaned.is_empty() {
        None
    } else {
        Some(truncate_chars(&cleaned, max_chars))
    }
}
