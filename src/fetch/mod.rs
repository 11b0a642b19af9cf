// src/fetch/mod.rs
// =============================================================================
// This module contains the SSRF-safe fetch layer.
//
// Submodules:
// - safety: Resolves hostnames and judges whether every address is safe
// - client: Performs one bounded HTTP(S) retrieval, yielding a PageArtifact
//
// This file (mod.rs) is the module root - it ties everything together and
// exports the public API that other parts of our application can use.
// =============================================================================

mod client;
mod safety;

// Re-export public items from submodules
// This lets users write `fetch::safe_fetch()` instead of
// `fetch::client::safe_fetch()`
pub use client::{build_client, safe_fetch, PageArtifact};
pub use safety::{AddressPolicy, BlockedNet};
