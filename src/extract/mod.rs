// src/extract/mod.rs
// =============================================================================
// This module contains page feature extraction.
//
// Submodules:
// - links: Finds hyperlink targets in HTML (used by the crawler for traversal)
// - features: Pulls title/headings/meta out of HTML (used for reporting)
//
// This file (mod.rs) is the module root - it ties everything together and
// exports the public API that other parts of our application can use.
// =============================================================================

mod features;
mod links;

// Re-export public items from submodules
pub use features::extract_features;
pub use links::extract_links;
