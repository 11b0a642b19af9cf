// src/crawl/mod.rs
// =============================================================================
// This module handles the bounded site crawl.
//
// Features:
// - Breadth-first traversal starting from a seed URL
// - Every fetch goes through the SSRF-safe fetcher
// - Hard page-count and depth budgets
// - Internal/external link classification
// - Key policy page tagging (contact/about/privacy/terms)
// =============================================================================

mod queue;

// Re-export the crawler and its result type
pub use queue::{crawl_site, CrawlResult};
