// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Dispatch to the appropriate subcommand handler
// 3. Run the safe fetch or the bounded crawl and print the results
// 4. Exit with proper code (0 = site available, 1 = not available, 2 = error)
//
// Rust concepts used:
// - async/await: Because network I/O needs timeouts and concurrency-ready code
// - Result<T, E>: For error handling (T = success type, E = error type)
// - match: Pattern matching to handle different subcommands
// =============================================================================

// Module declarations - tells Rust about our other source files
mod cli; // src/cli.rs - command-line parsing
mod config; // src/config.rs - crawl/fetch limits and address policy
mod crawl; // src/crawl/ - bounded breadth-first crawler
mod extract; // src/extract/ - link and feature extraction from HTML
mod fetch; // src/fetch/ - SSRF-safe fetch layer

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use config::{CrawlConfig, FetchConfig};
use crawl::CrawlResult;
use fetch::PageArtifact;

// The #[tokio::main] attribute transforms our async main into a real main
// function: it creates a tokio runtime and runs our async code inside it
#[tokio::main]
async fn main() {
    // Structured logging, controlled by RUST_LOG (e.g. RUST_LOG=debug)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            // An unexpected internal error (e.g. the HTTP client failed to
            // build). Expected conditions never land here - they are values
            // on the artifacts.
            eprintln!("Error: {}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Main application logic
// Returns:
//   Ok(0) = primary page fetched cleanly
//   Ok(1) = primary page carries errors ("site not available")
//   Err = unexpected internal error (exit code 2)
async fn run() -> Result<i32> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch { url, json } => handle_fetch(&url, json).await,
        Commands::Scan {
            url,
            json,
            max_pages,
            max_depth,
            timeout,
        } => handle_scan(&url, json, max_pages, max_depth, timeout).await,
    }
}

// Handles the 'fetch' subcommand: one SSRF-safe fetch, no crawling
async fn handle_fetch(url: &str, json: bool) -> Result<i32> {
    let config = FetchConfig::default();
    let client = fetch::build_client(&config)?;

    println!("🔍 Fetching: {}", url);
    let artifact = fetch::safe_fetch(&client, url, &config).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&artifact)?);
    } else {
        print_artifact(&artifact);
    }

    if artifact.is_ok() {
        Ok(0)
    } else {
        Ok(1)
    }
}

// Handles the 'scan' subcommand: the full bounded crawl
async fn handle_scan(
    url: &str,
    json: bool,
    max_pages: usize,
    max_depth: usize,
    timeout: u64,
) -> Result<i32> {
    let config = CrawlConfig {
        max_pages,
        max_depth,
        fetch: FetchConfig {
            timeout: Duration::from_secs(timeout),
            ..FetchConfig::default()
        },
        ..CrawlConfig::default()
    };

    println!("🔍 Scanning site: {}", url);
    println!("📊 Budgets: {} pages, depth {}", max_pages, max_depth);

    let result = crawl::crawl_site(url, &config).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_crawl_result(&result);
    }

    // The pipeline contract: a failed primary page means the whole analysis
    // is "not available" to the caller.
    if result.is_available() {
        Ok(0)
    } else {
        Ok(1)
    }
}

// Prints a single artifact as a human-readable summary
fn print_artifact(artifact: &PageArtifact) {
    println!();
    println!("URL:          {}", artifact.url);
    if let Some(final_url) = &artifact.final_url {
        if final_url != &artifact.url {
            println!("Final URL:    {}", final_url);
        }
    }
    if let Some(status) = artifact.status_code {
        println!("Status:       HTTP {}", status);
    }
    if let Some(content_type) = &artifact.content_type {
        println!("Content-Type: {}", content_type);
    }
    match &artifact.html {
        Some(html) => {
            println!("Body:         {} bytes of text", html.len());
            let features = extract::extract_features(html);
            if let Some(title) = features.title {
                println!("Title:        {}", title);
            }
        }
        None => println!("Body:         (none)"),
    }
    for error in &artifact.errors {
        println!("❌ {}", error);
    }
    println!();
    if artifact.is_ok() {
        println!("✅ Fetched OK");
    } else {
        println!("❌ Fetch failed");
    }
}

// Prints the crawl result as a human-readable table plus summary
fn print_crawl_result(result: &CrawlResult) {
    println!();
    println!("{:<55} {:<12} {:<35}", "URL", "STATUS", "TITLE / ERROR");
    println!("{}", "=".repeat(102));

    for page in &result.all_pages {
        let status_display = format_page_status(page);

        // Title for clean pages, first error otherwise
        let detail = if let Some(error) = page.errors.first() {
            error.clone()
        } else {
            page.html
                .as_deref()
                .and_then(|html| extract::extract_features(html).title)
                .unwrap_or_default()
        };

        // Truncate long URLs so the table stays readable
        let url_display = truncate_for_table(&page.url, 52);

        println!("{:<55} {:<12} {:<35}", url_display, status_display, detail);
    }

    println!();
    if !result.key_pages.is_empty() {
        println!("🔑 Key pages:");
        // Stable order for display
        for key in ["contact", "about", "privacy", "terms"] {
            if let Some(page) = result.key_pages.get(key) {
                println!("   {:<8} {}", key, page.url);
            }
        }
        println!();
    }

    let ok_count = result.all_pages.iter().filter(|p| p.is_ok()).count();
    println!("📊 Summary:");
    println!("   ✅ Fetched OK: {}", ok_count);
    println!("   ❌ Failed: {}", result.all_pages.len() - ok_count);
    println!("   📋 Pages crawled: {}", result.stats.pages_crawled);
    println!(
        "   🌐 Site available: {}",
        if result.is_available() { "yes" } else { "no" }
    );
}

// Truncates a URL to at most max_chars characters for display, appending
// "..." when something was cut off.
//
// Counting characters (not bytes!) matters: URLs can legally contain
// multi-byte characters, and byte-slicing one in the middle panics.
fn truncate_for_table(url: &str, max_chars: usize) -> String {
    if url.chars().count() <= max_chars {
        url.to_string()
    } else {
        let head: String = url.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}

// Formats a page's fetch outcome for the table
fn format_page_status(page: &PageArtifact) -> String {
    if !page.is_ok() {
        "❌ FAILED".to_string()
    } else {
        match page.status_code {
            Some(code) if (200..300).contains(&code) => format!("✅ {}", code),
            Some(code) if (300..400).contains(&code) => format!("🔀 {}", code),
            Some(code) => format!("⚠️  {}", code),
            None => "?".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_keeps_short_urls() {
        assert_eq!(
            truncate_for_table("https://example.com/", 52),
            "https://example.com/"
        );
    }

    #[test]
    fn test_truncate_long_url_adds_ellipsis() {
        let url = format!("https://example.com/{}", "a".repeat(60));
        let display = truncate_for_table(&url, 52);
        assert!(display.ends_with("..."));
        assert_eq!(display.chars().count(), 55);
    }

    #[test]
    fn test_truncate_handles_multibyte_characters() {
        // 20 bytes of scheme+host+slash, then 31 ASCII bytes puts the
        // two-byte 'é' across byte offset 52; character-based truncation
        // must not panic there
        let url = format!("https://example.com/{}\u{e9}-page", "a".repeat(31));
        let display = truncate_for_table(&url, 52);
        assert!(display.ends_with("..."));
        assert_eq!(display.chars().count(), 55);
    }
}
