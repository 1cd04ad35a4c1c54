//! HTML metadata extraction: `<title>`, `<meta>` tags and visible body text,
//! read from a parsed `scraper` document.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

use crate::text::normalize_whitespace;

static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(1[6-9]\d{2}|20\d{2})\b").expect("year regex"));

/// Elements whose text never reaches the reader.
const NON_TEXT_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "svg"];

/// Title, meta tags, and nothing else from an HTML document head.
#[derive(Debug, Clone, Default)]
pub struct HtmlHead {
    pub title: Option<String>,
    /// `(key, content)` pairs in document order. Keys come from `name`,
    /// `property` or `itemprop` and are lower-cased.
    metas: Vec<(String, String)>,
}

impl HtmlHead {
    pub fn parse(html: &str) -> Self {
        let document = Html::parse_document(html);

        let title = Selector::parse("head title")
            .ok()
            .and_then(|sel| document.select(&sel).next())
            .map(|el| normalize_whitespace(&text_content(el)))
            .filter(|t| !t.is_empty());

        let mut metas = Vec::new();
        if let Ok(meta_sel) = Selector::parse("meta[content]") {
            for el in document.select(&meta_sel) {
                let attrs = el.value();
                let key = attrs
                    .attr("name")
                    .or_else(|| attrs.attr("property"))
                    .or_else(|| attrs.attr("itemprop"));
                if let (Some(key), Some(content)) = (key, attrs.attr("content")) {
                    metas.push((key.trim().to_ascii_lowercase(), content.to_string()));
                }
            }
        }

        Self { title, metas }
    }

    /// First non-blank cleaned value for `key`.
    pub fn meta(&self, key: &str) -> Option<String> {
        self.meta_all(key).into_iter().next()
    }

    /// All non-blank cleaned values for `key`, in document order.
    pub fn meta_all(&self, key: &str) -> Vec<String> {
        self.metas
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| normalize_whitespace(v))
            .filter(|v| !v.is_empty())
            .collect()
    }

    /// First value among `keys`, honoring the order of `keys`.
    pub fn first_meta(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|k| self.meta(k))
    }

    /// Year from the first date-bearing meta field (in `keys` order) that
    /// contains a plausible four-digit year.
    pub fn year(&self, keys: &[&str]) -> Option<i32> {
        keys.iter()
            .flat_map(|k| self.meta_all(k))
            .find_map(|v| extract_year(&v))
    }
}

fn text_content(el: ElementRef<'_>) -> String {
    el.text().collect::<Vec<_>>().join(" ")
}

/// Extract a plausible four-digit year from free-form date text.
pub fn extract_year(s: &str) -> Option<i32> {
    YEAR_RE
        .captures(s)
        .and_then(|c| c[1].parse::<i32>().ok())
}

/// Visible text of an HTML document body: script and style content skipped,
/// entities decoded, whitespace collapsed.
pub fn strip_html(html: &str) -> String {
    let document = Html::parse_document(html);
    let root = Selector::parse("body")
        .ok()
        .and_then(|sel| document.select(&sel).next())
        .unwrap_or_else(|| document.root_element());

    let mut parts = Vec::new();
    for node in root.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|el| NON_TEXT_ELEMENTS.contains(&el.name()))
        });
        if !hidden {
            parts.push(&**text);
        }
    }
    normalize_whitespace(&parts.join(" "))
}
