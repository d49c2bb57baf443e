// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Core types for vector search functionality

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ingest::types::Chunk;

/// Errors that can occur during search index operations
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SearchError {
    /// The index answered with a non-success status
    #[error("Azure Search query failed with status code {status}")]
    SearchRequestFailed {
        /// HTTP status code
        status: u16,
        /// Response body, kept for diagnostics
        body: String,
    },

    /// Transport fault or unreadable response; the cause is only logged
    #[error("Failed to query Azure Search.")]
    SearchUnavailable,
}

impl SearchError {
    /// Status code carried by a request failure
    pub fn status(&self) -> Option<u16> {
        match self {
            SearchError::SearchRequestFailed { status, .. } => Some(*status),
            SearchError::SearchUnavailable => None,
        }
    }
}

/// Body of a vector search request
#[derive(Debug, Serialize)]
pub(crate) struct VectorSearchRequest<'a> {
    pub search: &'a str,
    pub vectors: Vec<VectorQuery<'a>>,
    pub select: &'a str,
}

/// One vector clause of a search request
#[derive(Debug, Serialize)]
pub(crate) struct VectorQuery<'a> {
    pub value: &'a [f32],
    pub fields: &'a str,
    pub k: usize,
}

/// Search response envelope
#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub value: Vec<SearchHit>,
}

/// A single ranked hit
#[derive(Debug, Deserialize)]
pub(crate) struct SearchHit {
    #[serde(default)]
    pub content: Option<String>,
}

/// Wire form of a chunk in an index batch
#[derive(Debug, Serialize)]
pub(crate) struct IndexDocument<'a> {
    #[serde(rename = "@search.action")]
    pub action: &'static str,
    pub id: &'a str,
    pub content: &'a str,
    pub embedding: &'a [f32],
    /// JSON-encoded `{"filename": ..., "chunk": n}`
    pub metadata: String,
}

impl<'a> IndexDocument<'a> {
    pub fn merge_or_upload(chunk: &'a Chunk) -> Self {
        let metadata = serde_json::json!({
            "filename": chunk.source_filename.as_deref().unwrap_or_default(),
            "chunk": chunk.sequence_index,
        })
        .to_string();

        Self {
            action: "mergeOrUpload",
            id: &chunk.id,
            content: &chunk.content,
            embedding: &chunk.embedding,
            metadata,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct IndexBatch<'a> {
    pub value: Vec<IndexDocument<'a>>,
}

/// Per-document outcome of an index batch
#[derive(Debug, Deserialize)]
pub(crate) struct IndexResponse {
    #[serde(default)]
    pub value: Vec<IndexingResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct IndexingResult {
    pub key: String,
    #[serde(default)]
    pub status: bool,
    #[serde(default)]
    pub error_message: Option<String>,
}
