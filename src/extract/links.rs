// src/extract/links.rs
// =============================================================================
// This module extracts hyperlink targets from HTML pages.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (Document Object Model)
// - Supports CSS selectors for finding elements
// - Is built on html5ever (Mozilla's HTML parser)
//
// We also use the `url` crate to:
// - Parse and validate URLs
// - Resolve relative URLs to absolute URLs
//
// The crawler calls this on every successfully fetched page; it is the link
// discovery half of feature extraction. Duplicate targets are kept in page
// order - the crawler's visited set is what prevents double fetches.
// =============================================================================

use scraper::{Html, Selector};
use tracing::warn;
use url::Url;

// Extracts all anchor targets from HTML content
//
// Parameters:
//   html: the HTML content to parse (borrowed as &str)
//   base_url: the URL of the page (for resolving relative links)
//
// Returns: Vec<String> of absolute http(s) URLs, in document order
//
// Example:
//   html = "<a href='/docs'>Docs</a>"
//   base_url = "https://example.com"
//   result = ["https://example.com/docs"]
pub fn extract_links(html: &str, base_url: &str) -> Vec<String> {
    let mut links = Vec::new();

    // Parse the HTML into a document
    let document = Html::parse_document(html);

    // Create a CSS selector to find all <a> tags
    // Selector::parse returns Result, so we use .unwrap() which panics on error
    // This is OK here because our selector is a constant and known to be valid
    let selector = Selector::parse("a[href]").unwrap();

    // Parse the base URL once
    // We'll use this to resolve relative links
    let base = match Url::parse(base_url) {
        Ok(url) => url,
        Err(_) => {
            // If base URL is invalid, we can't resolve relative links
            warn!(base_url, "invalid base URL, skipping link extraction");
            return links;
        }
    };

    // Select all <a> elements with href attributes
    for element in document.select(&selector) {
        if let Some(href) = element.value().attr("href") {
            if let Some(absolute_url) = resolve_url(&base, href) {
                // Only keep HTTP/HTTPS links; mailto:, tel:, javascript:
                // and friends are not crawlable
                if is_crawlable_link(&absolute_url) {
                    links.push(absolute_url);
                }
            }
        }
    }

    links
}

// Resolves a possibly-relative URL to an absolute URL
//
// Parameters:
//   base: the base URL (the current page)
//   href: the href value (might be relative, might be absolute)
//
// Returns: Some(absolute_url) or None if invalid
//
// Examples:
//   base = "https://example.com/page"
//   href = "/docs" -> Some("https://example.com/docs")
//   href = "../other" -> Some("https://example.com/other")
//   href = "https://other.com" -> Some("https://other.com")
fn resolve_url(base: &Url, href: &str) -> Option<String> {
    // Skip fragments and non-navigational schemes up front
    if href.starts_with('#')
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("javascript:")
        || href.starts_with("data:")
    {
        return None;
    }

    // Url::join handles both absolute and relative href values
    match base.join(href) {
        Ok(url) => Some(url.to_string()),
        Err(_) => None, // Invalid URL, skip it
    }
}

// Checks if a URL is something the crawler could fetch
fn is_crawlable_link(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_absolute_link() {
        let html = r#"<a href="https://www.rust-lang.org">Rust</a>"#;
        let links = extract_links(html, "https://example.com");
        assert_eq!(links, vec!["https://www.rust-lang.org/"]);
    }

    #[test]
    fn test_resolve_relative_link() {
        let html = r#"<a href="/docs">Docs</a>"#;
        let links = extract_links(html, "https://example.com/page");
        assert_eq!(links, vec!["https://example.com/docs"]);
    }

    #[test]
    fn test_resolve_parent_relative_link() {
        let html = r#"<a href="../about">About</a>"#;
        let links = extract_links(html, "https://example.com/a/b/");
        assert_eq!(links, vec!["https://example.com/a/about"]);
    }

    #[test]
    fn test_skip_mailto_and_fragments() {
        // Double-hash raw string: href="#section" contains the "# sequence
        // that would close a single-hash raw literal early
        let html = r##"
            <a href="mailto:test@example.com">Email</a>
            <a href="tel:+15551234567">Call</a>
            <a href="#section">Jump</a>
            <a href="javascript:void(0)">Click</a>
        "##;
        let links = extract_links(html, "https://example.com");
        assert!(links.is_empty());
    }

    #[test]
    fn test_document_order_preserved() {
        let html = r#"
            <a href="/first">1</a>
            <a href="https://other.example/second">2</a>
            <a href="/third">3</a>
        "#;
        let links = extract_links(html, "https://example.com");
        assert_eq!(
            links,
            vec![
                "https://example.com/first",
                "https://other.example/second",
                "https://example.com/third",
            ]
        );
    }

    #[test]
    fn test_empty_html_yields_no_links() {
        assert!(extract_links("", "https://example.com").is_empty());
    }
}
