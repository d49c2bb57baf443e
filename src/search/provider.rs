// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Search client trait definition

use async_trait::async_trait;

use super::types::SearchError;
use crate::ingest::types::Chunk;

/// Trait for vector search index backends
///
/// Implementations query an index by embedding and write embedded chunks
/// back into it during ingestion.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Retrieve the content of the nearest chunks to `embedding`
    ///
    /// # Returns
    /// Content strings in relevance order; an empty vector means no matches
    async fn search(&self, embedding: &[f32]) -> Result<Vec<String>, SearchError>;

    /// Write chunks into the index, returning how many were accepted
    async fn upload(&self, chunks: &[Chunk]) -> Result<usize, SearchError>;
}
