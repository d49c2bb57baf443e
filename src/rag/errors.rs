// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error types for the RAG pipeline
//!
//! The pipeline surfaces exactly two failure kinds:
//! - an empty query embedding, raised by the pipeline itself
//! - a normalized failure wrapping whatever a collaborator returned

use thiserror::Error;

/// Errors that can terminate a pipeline invocation
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The embedding provider returned no vector for the query
    #[error("Query embedding is empty or invalid.")]
    EmptyQueryEmbedding,

    /// A collaborator failed; the original error is kept as the source
    #[error("Failed RAG pipeline.")]
    PipelineFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl PipelineError {
    /// Wrap a collaborator failure
    pub fn failed<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        PipelineError::PipelineFailed {
            source: Box::new(err),
        }
    }

    /// Get error code for logging
    pub fn error_code(&self) -> &'static str {
        match self {
            PipelineError::EmptyQueryEmbedding => "EMPTY_QUERY_EMBEDDING",
            PipelineError::PipelineFailed { .. } => "PIPELINE_FAILED",
        }
    }

    /// Get user-friendly error message for the presentation layer
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::EmptyQueryEmbedding => {
                "Could not understand the question well enough to search. Try rephrasing it."
                    .to_string()
            }
            PipelineError::PipelineFailed { source } => {
                format!("{} ({})", self, source)
            }
        }
    }
}
