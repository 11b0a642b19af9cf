// src/crawl/queue.rs
// =============================================================================
// This module implements the bounded site crawl with a breadth-first approach.
//
// How it works:
// 1. Start with the seed URL in a queue at depth 0
// 2. Fetch each dequeued page through the SSRF-safe fetcher
// 3. Extract links from the page HTML
// 4. Classify links internal/external; enqueue internal ones a level deeper
// 5. Repeat until the queue is empty or the page budget is spent
//
// Every bound is a hard bound:
// - At most max_pages fetches per crawl (failed fetches count)
// - No fetch for anything queued deeper than max_depth
// - Each fetch is itself capped (redirects, size, timeout) by the fetcher
//
// The crawl is deliberately sequential: one fetch finishes before the next
// starts. Total work is small (<= 10 pages) and a sequential loop keeps the
// wall-clock cost predictable without hammering the target site. The queue,
// visited set and counter are owned by this one invocation; nothing is
// shared across runs.
//
// Rust concepts:
// - HashSet: To track visited URLs (O(1) lookup)
// - VecDeque: Double-ended queue for breadth-first crawling
// - HashMap: For the key-page name -> artifact mapping
// =============================================================================

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;
use url::Url;

use crate::config::CrawlConfig;
use crate::extract::extract_links;
use crate::fetch::{build_client, safe_fetch, PageArtifact};

// Represents a page in the crawl queue
#[derive(Debug, Clone)]
struct CrawlItem {
    url: String,
    depth: usize, // How many link-hops from the seed URL (seed = 0)
}

/// Counters for one crawl run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlStats {
    /// How many fetches were performed (successes and failures alike)
    pub pages_crawled: usize,
}

/// Everything one crawl run produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlResult {
    /// The artifact for the very first URL dequeued - set exactly once,
    /// even when that fetch failed
    pub primary_page: Option<PageArtifact>,
    /// Key policy pages found by URL keyword: "contact", "about",
    /// "privacy", "terms". First match per key wins.
    pub key_pages: HashMap<String, PageArtifact>,
    /// Every fetched artifact, in strict fetch order
    pub all_pages: Vec<PageArtifact>,
    /// Run counters
    pub stats: CrawlStats,
}

impl CrawlResult {
    /// Did the primary page come back clean? Downstream analysis treats a
    /// failed primary page as "site not available".
    pub fn is_available(&self) -> bool {
        self.primary_page
            .as_ref()
            .map(|page| page.is_ok())
            .unwrap_or(false)
    }
}

// Crawls a site starting from a seed URL
//
// Parameters:
//   seed_url: The URL to start crawling from (depth 0)
//   config: page/depth budgets, keyword table, and per-fetch limits
//
// Returns: CrawlResult. The only hard error is failing to build the HTTP
// client; individual page failures are recorded on their artifacts.
pub async fn crawl_site(seed_url: &str, config: &CrawlConfig) -> Result<CrawlResult> {
    let client = build_client(&config.fetch)?;

    let mut result = CrawlResult::default();

    // Queue of pages to crawl, breadth-first
    let mut queue = VecDeque::new();
    queue.push_back(CrawlItem {
        url: seed_url.to_string(),
        depth: 0,
    });

    // Track visited URLs so rediscovering a page never refetches it
    let mut visited: HashSet<String> = HashSet::new();

    // Fetch counter; failed fetches spend budget too
    let mut pages_fetched = 0;

    while pages_fetched < config.max_pages {
        let Some(item) = queue.pop_front() else {
            break;
        };

        // Skip if already visited (no fetch, no counter bump)
        if visited.contains(&item.url) {
            continue;
        }
        visited.insert(item.url.clone());

        // Depth bound: anything queued past max_depth is never fetched
        if item.depth > config.max_depth {
            continue;
        }

        debug!(url = %item.url, depth = item.depth, "fetching page");
        let mut artifact = safe_fetch(&client, &item.url, &config.fetch).await;
        pages_fetched += 1;

        // Only clean pages with a body get link extraction and key tagging
        if artifact.is_ok() && artifact.html.is_some() {
            // Relative links resolve against where the page actually came
            // from (final_url), not where we asked for it
            let base = artifact
                .final_url
                .clone()
                .unwrap_or_else(|| item.url.clone());
            let links = {
                let html = artifact.html.as_deref().unwrap_or("");
                extract_links(html, &base)
            };

            for link in links {
                // Classified against the DEQUEUED url's host; after a
                // cross-domain redirect this can differ from final_url's
                // host (see DESIGN.md).
                if is_internal_link(&item.url, &link) {
                    artifact.links_internal.push(link.clone());
                    if item.depth + 1 <= config.max_depth {
                        queue.push_back(CrawlItem {
                            url: link,
                            depth: item.depth + 1,
                        });
                    }
                } else {
                    artifact.links_external.push(link);
                }
            }

            tag_key_page(&mut result, &item.url, &artifact, config);
        }

        // The first artifact ever stored is the primary page, errors or not
        if result.all_pages.is_empty() {
            result.primary_page = Some(artifact.clone());
        }
        result.all_pages.push(artifact);
    }

    result.stats.pages_crawled = pages_fetched;
    debug!(
        pages = result.stats.pages_crawled,
        key_pages = result.key_pages.len(),
        "crawl finished"
    );
    Ok(result)
}

// Is the target on the same site as the base URL?
//
// A link with no resolvable host counts as internal (it was a relative
// reference). Anything whose host differs from the base URL's host is
// external and never enqueued.
fn is_internal_link(base_url: &str, target_url: &str) -> bool {
    let base_host = Url::parse(base_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string));
    let target_host = Url::parse(target_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string));

    match (base_host, target_host) {
        (_, None) => true,
        (Some(base), Some(target)) => base == target,
        (None, Some(_)) => false,
    }
}

// Tags the artifact as a key policy page if its URL contains one of the
// configured keywords. Only the FIRST keyword in table order counts for a
// given page, and only the first page found for a key name is retained.
fn tag_key_page(result: &mut CrawlResult, url: &str, artifact: &PageArtifact, config: &CrawlConfig) {
    let url_lower = url.to_lowercase();
    for (keyword, key_name) in &config.key_page_keywords {
        if url_lower.contains(keyword.as_str()) {
            if !result.key_pages.contains_key(key_name) {
                debug!(key = %key_name, %url, "tagged key page");
                result.key_pages.insert(key_name.clone(), artifact.clone());
            }
            break;
        }
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why does the counter include failed fetches?
//    - The budget bounds how many times we contact the target site, not how
//      many pages came back clean; serving us errors must not buy an
//      attacker extra requests
//
// 2. Why clone the artifact for primary_page and key_pages?
//    - all_pages owns the artifacts; the primary/key views need their own
//      copies because Rust does not allow two owners of the same value
//    - The copies are taken after the artifact is final, so they never
//      drift from what is in all_pages
//
// 3. Why enqueue duplicates instead of checking visited at enqueue time?
//    - The dequeue-side check is the single place dedup happens, which
//      keeps the invariant easy to state: one fetch per exact URL string
// -----------------------------------------------------------------------------
