//! Extraction helpers for the HTML pages shorteners serve instead of redirects
//!
//! Two styles are supported:
//! - structural lookups through `scraper` (title, meta refresh, links, body text)
//! - literal markers bracketing a value in the raw markup, unescaped afterwards

use scraper::{Html, Selector};

/// Returns the trimmed page title, if any
pub fn page_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Returns the destination of a `<meta http-equiv="refresh" content="N; url=...">` tag
pub fn meta_refresh_target(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let meta_selector = Selector::parse("meta[http-equiv][content]").ok()?;

    document
        .select(&meta_selector)
        .filter(|element| {
            element
                .value()
                .attr("http-equiv")
                .is_some_and(|v| v.eq_ignore_ascii_case("refresh"))
        })
        .find_map(|element| element.value().attr("content").and_then(refresh_url))
}

/// Returns the `href` of the first element matching `selector`
pub fn first_link(html: &str, selector: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let link_selector = Selector::parse(selector).ok()?;

    document
        .select(&link_selector)
        .find_map(|element| element.value().attr("href"))
        .map(str::to_string)
}

/// Returns the trimmed text content of `<body>`
pub fn body_text(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let body_selector = Selector::parse("body").ok()?;

    document
        .select(&body_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Returns the raw text between the first `prefix` and the next `suffix`
pub fn text_between<'a>(haystack: &'a str, prefix: &str, suffix: &str) -> Option<&'a str> {
    let start = haystack.find(prefix)? + prefix.len();
    let len = haystack[start..].find(suffix)?;
    Some(&haystack[start..start + len])
}

/// Decodes HTML entities (`&amp;`, `&#39;`, ...)
pub fn unescape(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

/// Parses the URL out of a refresh `content` attribute such as `0; URL='http://x'`
fn refresh_url(content: &str) -> Option<String> {
    let (_, rest) = content.split_once(';')?;
    let rest = rest.trim_start();
    let (key, value) = rest.split_once('=')?;
    if !key.trim().eq_ignore_ascii_case("url") {
        return None;
    }

    let value = value.trim().trim_matches(|c| c == '\'' || c == '"');
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
