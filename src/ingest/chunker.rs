// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Semantic chunking with per-chunk embeddings
//!
//! The splitter decides where topic boundaries lie; every resulting segment
//! is then embedded on its own. A segment whose embedding fails is dropped
//! and the rest of the document carries on.

use std::sync::Arc;
use tracing::{error, info, warn};

use super::errors::ChunkError;
use super::splitter::{PercentileSplitter, SemanticSplitter};
use super::types::{Chunk, Document};
use crate::embeddings::EmbeddingProvider;

pub struct SemanticChunker {
    embedder: Arc<dyn EmbeddingProvider>,
    splitter: Arc<dyn SemanticSplitter>,
}

impl SemanticChunker {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, splitter: Arc<dyn SemanticSplitter>) -> Self {
        Self { embedder, splitter }
    }

    /// Chunker whose splitter shares `embedder` (buffer 1, 95th percentile)
    pub fn with_default_splitter(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        let splitter = Arc::new(PercentileSplitter::new(embedder.clone()));
        Self::new(embedder, splitter)
    }

    /// The provider used for per-chunk embeddings
    pub fn embedder(&self) -> Arc<dyn EmbeddingProvider> {
        self.embedder.clone()
    }

    /// Split `text` into embedded chunks
    ///
    /// Blank text yields no chunks. Only a splitter failure fails the
    /// document; individual segments that cannot be embedded are skipped.
    pub async fn chunk_text(&self, text: &str, filename: &str) -> Result<Vec<Chunk>, ChunkError> {
        if text.trim().is_empty() {
            warn!("Text is empty or invalid for file: {}.", filename);
            return Ok(Vec::new());
        }

        let document = Document::new(text, filename);
        let segments = self.splitter.split(&document).await.map_err(|source| {
            error!("Error during chunking for file {}: {}", filename, source);
            ChunkError::ChunkingFailed {
                filename: filename.to_string(),
                source,
            }
        })?;

        let source_filename = document.filename().map(str::to_string);
        let mut chunks = Vec::with_capacity(segments.len());
        for (i, segment) in segments.into_iter().enumerate() {
            if segment.trim().is_empty() {
                warn!("Empty segment {} in file {}.", i, filename);
                continue;
            }

            match self.embedder.embed(&segment).await {
                Ok(embedding) if !embedding.is_empty() => {
                    chunks.push(Chunk::new(segment, embedding, source_filename.clone(), i));
                }
                Ok(_) => warn!("Null embedding for chunk {} in file {}.", i, filename),
                Err(e) => warn!("Error embedding chunk {} in file {}: {}", i, filename, e),
            }
        }

        info!("Created {} valid chunks for file: {}", chunks.len(), filename);
        Ok(chunks)
    }
}
