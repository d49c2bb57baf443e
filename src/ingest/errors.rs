// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error types for document ingestion
//!
//! Failures are layered the way ingestion absorbs them:
//! - pages and chunks are skipped with a log line and never show up here
//! - a whole document fails with one of the per-stage errors below
//! - only an unreachable blob store stops an ingestion run

use thiserror::Error;

use crate::search::SearchError;
use crate::storage::BlobError;

/// Errors from PDF text extraction
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    /// The PDF parsed but no page produced any text
    #[error("The PDF appears to have no extractable text.")]
    NoExtractableText,

    /// The bytes are not a readable PDF container
    #[error("Could not process the PDF stream: {0}")]
    UnprocessablePdf(String),
}

/// Errors from a semantic splitter
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SplitError {
    /// Sentence windows could not be embedded
    #[error("Failed to embed sentence windows: {0}")]
    Embedding(String),

    /// Splitter parameters are out of range
    #[error("Invalid splitter configuration: {0}")]
    InvalidConfig(String),
}

/// Whole-document chunking failure
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChunkError {
    #[error("Failed to chunk PDF text for {filename}")]
    ChunkingFailed {
        filename: String,
        #[source]
        source: SplitError,
    },
}

/// Per-document failure during an ingestion run
#[derive(Error, Debug)]
pub enum IngestError {
    #[error(transparent)]
    Blob(#[from] BlobError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Chunk(#[from] ChunkError),

    /// Every segment failed to embed; usually an embedding service outage
    #[error("No valid chunks were produced for {filename}.")]
    NoValidChunks { filename: String },

    #[error("Failed to index chunks: {0}")]
    Index(#[from] SearchError),

    /// The index answered but accepted none of the uploaded chunks
    #[error("The index rejected all {rejected} chunks for {filename}.")]
    AllChunksRejected { filename: String, rejected: usize },
}

impl IngestError {
    /// Get error code for logging and reports
    pub fn error_code(&self) -> &'static str {
        match self {
            IngestError::Blob(BlobError::EmptyBlob(_)) => "EMPTY_BLOB",
            IngestError::Blob(_) => "BLOB_UNAVAILABLE",
            IngestError::Extract(ExtractError::NoExtractableText) => "NO_EXTRACTABLE_TEXT",
            IngestError::Extract(ExtractError::UnprocessablePdf(_)) => "UNPROCESSABLE_PDF",
            IngestError::Chunk(_) => "CHUNKING_FAILED",
            IngestError::NoValidChunks { .. } => "NO_VALID_CHUNKS",
            IngestError::Index(_) => "INDEX_FAILED",
            IngestError::AllChunksRejected { .. } => "INDEX_REJECTED",
        }
    }
}
