// src/fetch/client.rs
// =============================================================================
// This module performs one SSRF-safe HTTP(S) retrieval.
//
// Key functionality:
// - Rejects non-http(s) schemes and hostless URLs before any network I/O
// - Re-validates the target host on EVERY redirect hop (DNS rebinding defense)
// - Follows redirects manually with a hard hop budget
// - Streams the response body and aborts the instant it passes the size cap
// - Detects various failure modes (SSRF block, timeout, TLS errors, etc.)
//
// The one rule of this module: safe_fetch never returns an error. Whatever
// happens, the caller gets a PageArtifact; failures are recorded on the
// artifact's error list so one bad page can never abort a whole crawl.
//
// Rust concepts:
// - async/await: For network I/O with timeouts
// - Enums: To represent the failure taxonomy
// - Streams: For reading response bodies chunk by chunk
// =============================================================================

use chrono::{DateTime, Utc};
use futures::StreamExt; // StreamExt gives us .next() on the byte stream
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::{redirect, Client, Response};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;
use url::Url;

use crate::config::FetchConfig;
use crate::fetch::safety::is_host_safe;

// The recorded outcome of one fetch attempt for one URL.
//
// Invariant: if `errors` is non-empty, `html` is None. The fetcher builds
// the artifact; the crawler only ever appends to the two link lists before
// the artifact is stored, and never touches it again afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageArtifact {
    /// The URL we were asked to fetch
    pub url: String,
    /// The URL we actually got the final response from (post-redirect)
    pub final_url: Option<String>,
    /// HTTP status code of the final response
    pub status_code: Option<u16>,
    /// Content-Type header of the final response
    pub content_type: Option<String>,
    /// Body text; only present for text/html or text/plain responses
    pub html: Option<String>,
    /// Same-site links found on this page (filled in by the crawler)
    pub links_internal: Vec<String>,
    /// Off-site links found on this page (filled in by the crawler)
    pub links_external: Vec<String>,
    /// When this fetch attempt happened
    pub fetched_at: DateTime<Utc>,
    /// What went wrong, if anything; empty means success
    pub errors: Vec<String>,
}

impl PageArtifact {
    /// A fresh artifact for a URL about to be fetched.
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            final_url: None,
            status_code: None,
            content_type: None,
            html: None,
            links_internal: Vec::new(),
            links_external: Vec::new(),
            fetched_at: Utc::now(),
            errors: Vec::new(),
        }
    }

    /// Did this fetch succeed (no errors recorded)?
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

// Every way a fetch can fail. Expected conditions are values, never panics:
// the fetcher converts each of these into an error string on the artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// The URL string did not parse at all
    InvalidUrl(String),
    /// Scheme other than http/https (ftp, file, mailto, ...)
    UnsupportedScheme(String),
    /// URL has no hostname to connect to
    MissingHost,
    /// The SSRF guard refused the target address (includes DNS fail-closed)
    SsrfBlocked(String),
    /// Hostname did not resolve at connect time
    DnsFailure,
    /// The request exceeded the configured timeout
    Timeout,
    /// Certificate verification failed
    TlsFailure,
    /// Redirect chain exceeded the hop budget
    TooManyRedirects,
    /// Body exceeded the size cap; holds the cap in bytes
    TooLarge(usize),
    /// Any other network-level failure
    Transport(String),
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchFailure::InvalidUrl(e) => write!(f, "Invalid URL: {}", e),
            FetchFailure::UnsupportedScheme(s) => write!(f, "Unsupported scheme: {}", s),
            FetchFailure::MissingHost => write!(f, "Invalid URL: no hostname"),
            FetchFailure::SsrfBlocked(url) => write!(f, "Blocked by SSRF protection: {}", url),
            FetchFailure::DnsFailure => write!(f, "DNS resolution failed"),
            FetchFailure::Timeout => write!(f, "Request timed out"),
            FetchFailure::TlsFailure => write!(f, "TLS certificate verification failed"),
            FetchFailure::TooManyRedirects => write!(f, "Too many redirects"),
            FetchFailure::TooLarge(cap) => write!(f, "Response too large (>{} bytes)", cap),
            FetchFailure::Transport(e) => write!(f, "Request failed: {}", e),
        }
    }
}

/// Builds the HTTP client the fetcher (and crawler) use.
///
/// Redirect following is disabled on purpose: we follow redirects by hand in
/// safe_fetch so the SSRF guard runs against every hop. TLS verification
/// stays on; turning it off would defeat the point of a trust scanner.
pub fn build_client(config: &FetchConfig) -> anyhow::Result<Client> {
    let client = Client::builder()
        .redirect(redirect::Policy::none())
        .timeout(config.timeout)
        .user_agent(concat!("site-sentry/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

// Fetches a single URL safely.
//
// Parameters:
//   client: shared HTTP client (redirects disabled, see build_client)
//   url: the URL to fetch
//   config: limits and the address policy to enforce
//
// Returns: a PageArtifact in ALL cases. Success fills in final_url, status
// and (for text responses) the body; failure fills in the error list.
pub async fn safe_fetch(client: &Client, url: &str, config: &FetchConfig) -> PageArtifact {
    let mut artifact = PageArtifact::new(url);

    // Step 1: parse and reject bad input before any network call.
    let parsed = match Url::parse(url) {
        Ok(u) => u,
        Err(e) => {
            artifact.errors.push(FetchFailure::InvalidUrl(e.to_string()).to_string());
            return artifact;
        }
    };

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        artifact
            .errors
            .push(FetchFailure::UnsupportedScheme(parsed.scheme().to_string()).to_string());
        return artifact;
    }

    if parsed.host().is_none() {
        artifact.errors.push(FetchFailure::MissingHost.to_string());
        return artifact;
    }

    // Steps 2 and 3: the redirect loop. The SSRF check runs at the top of
    // every iteration against the host we are about to contact, so a
    // redirect (or a rebinding DNS record) can never smuggle us onto an
    // internal address. max_redirects hops means max_redirects + 1 requests.
    let mut current = parsed;
    for _hop in 0..=config.max_redirects {
        match current.host() {
            Some(host) => {
                if !is_host_safe(&config.policy, &host).await {
                    artifact
                        .errors
                        .push(FetchFailure::SsrfBlocked(current.to_string()).to_string());
                    return artifact;
                }
            }
            None => {
                artifact.errors.push(FetchFailure::MissingHost.to_string());
                return artifact;
            }
        }

        let response = match client
            .get(current.clone())
            .timeout(config.timeout)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                artifact.errors.push(categorize_error(&e).to_string());
                return artifact;
            }
        };

        if response.status().is_redirection() {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string());

            if let Some(location) = location {
                // Url::join resolves relative Locations ("/login", "../x")
                // against the current hop, exactly like a browser would.
                match current.join(&location) {
                    Ok(next) => {
                        debug!(from = %current, to = %next, "following redirect");
                        current = next;
                        continue;
                    }
                    Err(e) => {
                        artifact.errors.push(
                            FetchFailure::Transport(format!(
                                "unparseable redirect location '{}': {}",
                                location, e
                            ))
                            .to_string(),
                        );
                        return artifact;
                    }
                }
            }
            // A redirect status with no Location header goes nowhere;
            // fall through and treat it as the final response.
        }

        return read_final_response(artifact, response, config).await;
    }

    // The loop ran out of hops without reaching a non-redirect response.
    artifact.errors.push(FetchFailure::TooManyRedirects.to_string());
    artifact
}

// Reads the terminal (non-redirect) response, enforcing the size cap while
// streaming. We check BEFORE appending each chunk, so the buffer never holds
// more than the cap and an oversize response never yields partial content.
async fn read_final_response(
    mut artifact: PageArtifact,
    response: Response,
    config: &FetchConfig,
) -> PageArtifact {
    let status_code = response.status().as_u16();
    let final_url = response.url().to_string();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let mut body: Vec<u8> = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => {
                artifact.errors.push(categorize_error(&e).to_string());
                return artifact;
            }
        };
        if body.len() + chunk.len() > config.size_cap_bytes {
            debug!(url = %final_url, cap = config.size_cap_bytes, "aborting oversize response");
            artifact
                .errors
                .push(FetchFailure::TooLarge(config.size_cap_bytes).to_string());
            return artifact;
        }
        body.extend_from_slice(&chunk);
    }

    artifact.final_url = Some(final_url);
    artifact.status_code = Some(status_code);
    artifact.content_type = content_type.clone();

    // Only text bodies are kept; for anything else (images, PDFs, JSON APIs)
    // the artifact carries status and content-type with no body.
    let is_text = content_type
        .as_deref()
        .map(|ct| ct.contains("text/html") || ct.contains("text/plain"))
        .unwrap_or(false);
    if is_text {
        artifact.html = Some(String::from_utf8_lossy(&body).into_owned());
    }

    artifact
}

// Categorizes different error types from reqwest into our failure taxonomy.
//
// reqwest errors can happen for many reasons:
// - Network timeout
// - DNS resolution failure at connect time
// - TLS certificate issues
// - Connection refused / reset
fn categorize_error(error: &reqwest::Error) -> FetchFailure {
    // Walk the source chain so we see the underlying cause, not just
    // reqwest's outer "error sending request" wrapper.
    let mut chain = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(s) = source {
        chain.push_str(": ");
        chain.push_str(&s.to_string());
        source = s.source();
    }
    let chain_lower = chain.to_lowercase();

    if error.is_timeout() {
        FetchFailure::Timeout
    } else if chain_lower.contains("certificate") || chain_lower.contains("tls") {
        FetchFailure::TlsFailure
    } else if error.is_connect() {
        if chain_lower.contains("dns") || chain_lower.contains("resolve") {
            FetchFailure::DnsFailure
        } else {
            FetchFailure::Transport("connection failed".to_string())
        }
    } else if chain_lower.contains("dns") {
        FetchFailure::DnsFailure
    } else {
        FetchFailure::Transport(chain)
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why follow redirects by hand?
//    - reqwest can follow redirects itself, but then the SSRF check would
//      only run against the FIRST hostname
//    - "https://fine.example -> 302 -> http://169.254.169.254/" must be
//      caught on the second hop, so every hop gets its own check
//
// 2. Why stream the body instead of response.text()?
//    - .text() buffers the whole body; a malicious server could send
//      gigabytes and exhaust our memory
//    - Streaming lets us stop the moment the cap is crossed, holding at
//      most size_cap_bytes in memory
//
// 3. What is String::from_utf8_lossy?
//    - Decodes bytes as UTF-8, replacing invalid sequences with U+FFFD
//    - Real-world HTML is often not clean UTF-8; lossy decoding matches
//      what browsers do rather than failing the fetch
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::safety::AddressPolicy;

    // A config that can talk to a mockito server on 127.0.0.1.
    fn local_config() -> FetchConfig {
        FetchConfig {
            policy: AddressPolicy::permissive(),
            ..FetchConfig::default()
        }
    }

    fn client_for(config: &FetchConfig) -> Client {
        build_client(config).expect("client builds")
    }

    #[tokio::test]
    async fn test_rejects_unsupported_scheme() {
        let config = local_config();
        let client = client_for(&config);
        let artifact = safe_fetch(&client, "ftp://example.com/file", &config).await;
        assert_eq!(
            artifact.errors,
            vec!["Unsupported scheme: ftp".to_string()]
        );
        assert!(artifact.html.is_none());
        assert!(artifact.status_code.is_none());
    }

    #[tokio::test]
    async fn test_rejects_unparseable_url() {
        let config = local_config();
        let client = client_for(&config);
        let artifact = safe_fetch(&client, "http://", &config).await;
        assert_eq!(artifact.errors.len(), 1);
        assert!(artifact.errors[0].starts_with("Invalid URL"));
    }

    #[tokio::test]
    async fn test_blocks_loopback_with_default_policy() {
        // Default policy, so 127.0.0.1 must be refused with no network call.
        // Port 9 (discard) would hang or refuse if we ever connected.
        let config = FetchConfig::default();
        let client = client_for(&config);
        let artifact = safe_fetch(&client, "http://127.0.0.1:9/admin", &config).await;
        assert_eq!(artifact.errors.len(), 1);
        assert!(artifact.errors[0].starts_with("Blocked by SSRF protection"));
        assert!(artifact.html.is_none());
    }

    #[tokio::test]
    async fn test_blocks_metadata_address() {
        let config = FetchConfig::default();
        let client = client_for(&config);
        let artifact =
            safe_fetch(&client, "http://169.254.169.254/latest/meta-data/", &config).await;
        assert!(artifact.errors[0].starts_with("Blocked by SSRF protection"));
    }

    #[tokio::test]
    async fn test_fetches_html_page() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .with_status(200)
            .with_header("content-type", "text/html; charset=utf-8")
            .with_body("<html><body><h1>Hello</h1></body></html>")
            .create_async()
            .await;

        let config = local_config();
        let client = client_for(&config);
        let artifact = safe_fetch(&client, &format!("{}/", server.url()), &config).await;

        mock.assert_async().await;
        assert!(artifact.is_ok(), "errors: {:?}", artifact.errors);
        assert_eq!(artifact.status_code, Some(200));
        assert!(artifact.html.as_deref().unwrap().contains("<h1>Hello</h1>"));
        assert!(artifact.final_url.as_deref().unwrap().ends_with('/'));
    }

    #[tokio::test]
    async fn test_non_text_body_is_dropped() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/data.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        let config = local_config();
        let client = client_for(&config);
        let artifact =
            safe_fetch(&client, &format!("{}/data.json", server.url()), &config).await;

        assert!(artifact.is_ok());
        assert_eq!(artifact.status_code, Some(200));
        assert_eq!(artifact.content_type.as_deref(), Some("application/json"));
        assert!(artifact.html.is_none());
    }

    #[tokio::test]
    async fn test_follows_relative_redirect() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/old")
            .with_status(302)
            .with_header("location", "/new")
            .create_async()
            .await;
        server
            .mock("GET", "/new")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<html>moved here</html>")
            .create_async()
            .await;

        let config = local_config();
        let client = client_for(&config);
        let artifact = safe_fetch(&client, &format!("{}/old", server.url()), &config).await;

        assert!(artifact.is_ok(), "errors: {:?}", artifact.errors);
        assert_eq!(artifact.status_code, Some(200));
        assert!(artifact.final_url.as_deref().unwrap().ends_with("/new"));
        assert!(artifact.html.as_deref().unwrap().contains("moved here"));
    }

    #[tokio::test]
    async fn test_redirect_without_location_is_final() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/odd")
            .with_status(302)
            .create_async()
            .await;

        let config = local_config();
        let client = client_for(&config);
        let artifact = safe_fetch(&client, &format!("{}/odd", server.url()), &config).await;

        // No Location header means nowhere to go: the 302 is the final answer.
        assert!(artifact.is_ok());
        assert_eq!(artifact.status_code, Some(302));
        assert!(artifact.html.is_none());
    }

    #[tokio::test]
    async fn test_too_many_redirects() {
        let mut server = mockito::Server::new_async().await;
        // A chain longer than the 3-hop budget: /r0 -> /r1 -> /r2 -> /r3 -> ...
        for i in 0..4 {
            server
                .mock("GET", format!("/r{}", i).as_str())
                .with_status(302)
                .with_header("location", &format!("/r{}", i + 1))
                .create_async()
                .await;
        }

        let config = local_config();
        let client = client_for(&config);
        let artifact = safe_fetch(&client, &format!("{}/r0", server.url()), &config).await;

        assert_eq!(artifact.errors, vec!["Too many redirects".to_string()]);
        assert!(artifact.html.is_none());
        assert!(artifact.status_code.is_none());
    }

    #[tokio::test]
    async fn test_oversize_body_aborted() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/big")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("x".repeat(64 * 1024))
            .create_async()
            .await;

        // A small cap so the test body stays small.
        let config = FetchConfig {
            size_cap_bytes: 1024,
            ..local_config()
        };
        let client = client_for(&config);
        let artifact = safe_fetch(&client, &format!("{}/big", server.url()), &config).await;

        assert_eq!(
            artifact.errors,
            vec!["Response too large (>1024 bytes)".to_string()]
        );
        // No partial content on overflow.
        assert!(artifact.html.is_none());
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        // Permissive policy so we actually attempt the connection; nothing
        // should be listening on this port.
        let config = local_config();
        let client = client_for(&config);
        let artifact = safe_fetch(&client, "http://127.0.0.1:1/", &config).await;
        assert_eq!(artifact.errors.len(), 1);
        assert!(
            artifact.errors[0].starts_with("Request failed")
                || artifact.errors[0].starts_with("Request timed out"),
            "unexpected error: {}",
            artifact.errors[0]
        );
    }

    #[test]
    fn test_failure_messages() {
        assert_eq!(FetchFailure::Timeout.to_string(), "Request timed out");
        assert_eq!(
            FetchFailure::TooLarge(2 * 1024 * 1024).to_string(),
            "Response too large (>2097152 bytes)"
        );
        assert_eq!(
            FetchFailure::UnsupportedScheme("file".to_string()).to_string(),
            "Unsupported scheme: file"
        );
    }
}
