// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Text embedding capability
//!
//! An [`EmbeddingProvider`] turns text into a fixed-length vector. The same
//! provider is shared by the semantic splitter, the per-chunk embedding
//! step and the query side of the RAG pipeline.

pub mod azure_openai;

use async_trait::async_trait;
use thiserror::Error;

pub use azure_openai::AzureOpenAiEmbeddings;

/// Errors from an embedding backend
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EmbeddingError {
    /// The request never produced a response (connection, timeout)
    #[error("Embedding request failed: {0}")]
    Request(String),

    /// The service answered with a non-success status
    #[error("Embedding service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body did not have the expected shape
    #[error("Malformed embedding response: {0}")]
    MalformedResponse(String),
}

/// Converts text into embedding vectors
///
/// An empty vector is a valid answer meaning "no embedding available";
/// callers decide whether that is fatal.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single piece of text
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Embed several texts, preserving input order
    ///
    /// The default implementation issues one request per text.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }
}

/// Cosine similarity of two vectors; 0.0 for mismatched or zero-length input
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        0.0
    } else {
        dot_product / (magnitude_a * magnitude_b)
    }
}
