// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vector search module
//!
//! Retrieves ranked chunk content from a managed vector index and writes
//! embedded chunks back into it during ingestion.

pub mod azure;
pub mod provider;
pub mod types;

// Re-export commonly used types
pub use azure::AzureSearchClient;
pub use provider::SearchClient;
pub use types::SearchError;
