// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// clap is a popular Rust library for parsing command-line arguments.
// We use the "derive" API which lets us define the CLI structure using
// Rust structs and attributes (the #[...] things).
// =============================================================================

use clap::{Parser, Subcommand};

// This struct represents our entire CLI application
//
// #[derive(Parser)] tells clap to automatically generate parsing code
// The #[command(...)] attributes configure how the CLI behaves
#[derive(Parser, Debug)]
#[command(
    name = "site-sentry",
    version = "0.1.0",
    about = "Safely fetch and crawl an untrusted URL for trust analysis",
    long_about = "site-sentry turns an arbitrary, attacker-supplied URL into a small, bounded set \
                  of page artifacts. Every request is checked against SSRF rules (no loopback, \
                  private, link-local, or cloud-metadata addresses), redirects are re-validated \
                  hop by hop, and response size, redirect count, crawl depth and page count are \
                  all hard-capped."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

// This enum defines our subcommands (fetch, scan)
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Safely fetch a single URL and print the resulting page artifact
    ///
    /// Example: site-sentry fetch https://example.com
    Fetch {
        /// URL to fetch (scheme and host required)
        url: String,

        /// Output the artifact in JSON format instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Crawl a site breadth-first from a seed URL, within hard budgets
    ///
    /// Example: site-sentry scan https://example.com --max-pages 5
    Scan {
        /// Seed URL to start crawling from (depth 0)
        url: String,

        /// Output the full crawl result in JSON format instead of a table
        #[arg(long)]
        json: bool,

        /// Maximum number of pages to fetch (failed fetches count too)
        #[arg(long, default_value_t = 10)]
        max_pages: usize,

        /// Maximum link-following depth (seed = 0)
        #[arg(long, default_value_t = 2)]
        max_depth: usize,

        /// Per-request timeout in seconds
        #[arg(long, default_value_t = 10)]
        timeout: u64,
    },
}
