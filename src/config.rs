// src/config.rs
// =============================================================================
// This file defines the configuration surface of the scanner.
//
// Every limit the crawler and fetcher enforce lives here as plain data:
// - How many pages a crawl may fetch (max_pages)
// - How many link-hops deep it may go (max_depth)
// - How many redirects a single fetch may follow (max_redirects)
// - How large a response body may be (size_cap_bytes)
// - How long a single request may take (timeout)
// - Which URL keywords mark "key" policy pages (key_page_keywords)
// - Which network ranges the SSRF guard blocks (AddressPolicy)
//
// Nothing here is hidden module state. The crawler and fetcher receive these
// structs at call time, which means tests can substitute alternate policies
// (for example, allowing loopback so a local fixture server is reachable).
//
// Rust concepts:
// - Default trait: Gives every struct a canonical default value
// - Duration: Type-safe time spans instead of bare integers
// =============================================================================

use std::net::IpAddr;
use std::time::Duration;

use crate::fetch::{AddressPolicy, BlockedNet};

/// Limits applied to one fetch attempt (a single URL, redirects included).
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Per-request timeout. A fetch that exceeds this is abandoned and
    /// recorded as a failure on its artifact.
    pub timeout: Duration,
    /// Redirect hop budget. With the default of 3, a fetch makes at most
    /// 4 HTTP requests before giving up with "too many redirects".
    pub max_redirects: usize,
    /// Hard cap on the response body. Streaming aborts the moment the
    /// accumulated size would pass this, so we never buffer more than the cap.
    pub size_cap_bytes: usize,
    /// Which resolved addresses we refuse to connect to.
    pub policy: AddressPolicy,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_redirects: 3,
            size_cap_bytes: 2 * 1024 * 1024, // 2 MiB
            policy: AddressPolicy::default(),
        }
    }
}

/// Limits and tables applied to one crawl run.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Cap on fetched pages per crawl. Failed fetches count too.
    pub max_pages: usize,
    /// Cap on link-following depth. The seed URL is depth 0.
    pub max_depth: usize,
    /// Ordered (keyword, key-name) table for policy-page tagging.
    /// The first keyword found in a page's URL wins, and the key-name is
    /// what lands in CrawlResult::key_pages ("conditions" maps to "terms").
    pub key_page_keywords: Vec<(String, String)>,
    /// Limits for each individual fetch the crawl performs.
    pub fetch: FetchConfig,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_pages: 10,
            max_depth: 2,
            key_page_keywords: default_key_page_keywords(),
            fetch: FetchConfig::default(),
        }
    }
}

// The ordered keyword table for key-page tagging.
// Order matters: only the first keyword that appears in a URL is considered.
fn default_key_page_keywords() -> Vec<(String, String)> {
    [
        ("contact", "contact"),
        ("about", "about"),
        ("privacy", "privacy"),
        ("terms", "terms"),
        ("conditions", "terms"), // "terms & conditions" pages map to "terms"
    ]
    .iter()
    .map(|(kw, key)| (kw.to_string(), key.to_string()))
    .collect()
}

impl Default for AddressPolicy {
    /// The default block list: every range that is loopback, private-use,
    /// link-local, multicast, or reserved, plus the cloud metadata address.
    fn default() -> Self {
        Self {
            blocked: vec![
                // IPv4
                BlockedNet::new("0.0.0.0", 8),      // "this network"
                BlockedNet::new("127.0.0.0", 8),    // loopback
                BlockedNet::new("10.0.0.0", 8),     // private
                BlockedNet::new("172.16.0.0", 12),  // private
                BlockedNet::new("192.168.0.0", 16), // private
                BlockedNet::new("169.254.0.0", 16), // link-local
                BlockedNet::new("224.0.0.0", 4),    // multicast
                BlockedNet::new("240.0.0.0", 4),    // reserved
                // IPv6
                BlockedNet::new("::", 128),   // unspecified
                BlockedNet::new("::1", 128),  // loopback
                BlockedNet::new("fc00::", 7), // unique-local (private)
                BlockedNet::new("fe80::", 10), // link-local
                BlockedNet::new("ff00::", 8), // multicast
            ],
            metadata_addrs: vec![
                // Cloud metadata endpoint (AWS/GCP/Azure). Already inside
                // 169.254.0.0/16, but kept explicit so relaxing link-local
                // never exposes it.
                "169.254.169.254".parse::<IpAddr>().unwrap(),
            ],
        }
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why a config struct instead of constants?
//    - Constants hard-wire behavior; a struct lets callers (and tests)
//      choose different limits per invocation
//    - Default::default() still gives you the canonical values in one call
//
// 2. Why is the keyword table ordered?
//    - A URL like "/about-our-privacy" contains two keywords
//    - Taking the first match in table order makes tagging deterministic
//
// 3. Why unwrap() on the metadata address parse?
//    - "169.254.169.254" is a constant and known to parse
//    - Panicking here would mean a typo in this file, a programmer error
// -----------------------------------------------------------------------------
