// src/extract/features.rs
// =============================================================================
// This module pulls structured features out of a fetched page's HTML:
// the title, the top-level headings, and the interesting meta tags.
//
// The crawler itself never needs these - it only needs links (links.rs).
// Features feed the reporting layer (and, downstream, content analysis),
// so extraction here is deliberately shallow and deterministic: no content
// interpretation, just what the markup says.
// =============================================================================

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// Which meta tags we bother keeping (by name= or property=)
const KEPT_META_KEYS: &[&str] = &["description", "keywords", "og:title", "og:description"];

/// Structured features of one page, derived purely from its markup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageFeatures {
    /// Contents of the <title> tag, whitespace-trimmed
    pub title: Option<String>,
    /// Text of h1/h2/h3 headings, in document order
    pub headings: Vec<String>,
    /// Selected meta tag values, keyed by lower-cased name/property
    pub meta: HashMap<String, String>,
}

// Extracts features from HTML
//
// Parameters:
//   html: the HTML content to parse
//
// Returns: PageFeatures (all fields empty for empty/unparseable input)
pub fn extract_features(html: &str) -> PageFeatures {
    let mut features = PageFeatures::default();
    if html.is_empty() {
        return features;
    }

    let document = Html::parse_document(html);

    // Title: first <title> element with non-empty text
    let title_selector = Selector::parse("title").unwrap();
    features.title = document
        .select(&title_selector)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .find(|t| !t.is_empty());

    // Headings: h1-h3 in document order, skipping empty ones
    let heading_selector = Selector::parse("h1, h2, h3").unwrap();
    for el in document.select(&heading_selector) {
        let text = normalize_whitespace(&el.text().collect::<String>());
        if !text.is_empty() {
            features.headings.push(text);
        }
    }

    // Meta tags: keep only the keys listed above; name= wins over property=
    // when both are present on the same tag
    let meta_selector = Selector::parse("meta").unwrap();
    for el in document.select(&meta_selector) {
        let key = el
            .value()
            .attr("name")
            .or_else(|| el.value().attr("property"))
            .map(|k| k.to_lowercase());
        let content = el.value().attr("content");
        if let (Some(key), Some(content)) = (key, content) {
            if KEPT_META_KEYS.contains(&key.as_str()) {
                features.meta.insert(key, content.trim().to_string());
            }
        }
    }

    features
}

// Collapses runs of whitespace (including newlines from nested markup)
// into single spaces
fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_title_and_headings() {
        let html = r#"
            <html><head><title>  Acme Corp  </title></head>
            <body><h1>Welcome</h1><h2>What we
            do</h2><h4>Ignored</h4></body></html>
        "#;
        let features = extract_features(html);
        assert_eq!(features.title.as_deref(), Some("Acme Corp"));
        assert_eq!(features.headings, vec!["Welcome", "What we do"]);
    }

    #[test]
    fn test_extracts_selected_meta_tags() {
        let html = r#"
            <head>
              <meta name="description" content="We sell anvils">
              <meta property="og:title" content="Acme">
              <meta name="viewport" content="width=device-width">
            </head>
        "#;
        let features = extract_features(html);
        assert_eq!(features.meta.get("description").map(String::as_str), Some("We sell anvils"));
        assert_eq!(features.meta.get("og:title").map(String::as_str), Some("Acme"));
        assert!(!features.meta.contains_key("viewport"));
    }

    #[test]
    fn test_empty_input() {
        let features = extract_features("");
        assert!(features.title.is_none());
        assert!(features.headings.is_empty());
        assert!(features.meta.is_empty());
    }
}
