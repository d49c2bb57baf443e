// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Core ingestion data types

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Metadata key holding the source filename of a document
pub const FILENAME_KEY: &str = "filename";

/// Text handed to the chunker, with its metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub text: String,
    pub metadata: HashMap<String, String>,
}

impl Document {
    pub fn new(text: impl Into<String>, filename: &str) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert(FILENAME_KEY.to_string(), filename.to_string());
        Self {
            text: text.into(),
            metadata,
        }
    }

    pub fn filename(&self) -> Option<&str> {
        self.metadata
            .get(FILENAME_KEY)
            .map(String::as_str)
            .filter(|f| !f.is_empty())
    }
}

/// A segment of source text with its embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// Stable key for the search index
    pub id: String,
    pub content: String,
    pub embedding: Vec<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_filename: Option<String>,
    /// Position of the segment within its document
    pub sequence_index: usize,
}

impl Chunk {
    pub fn new(
        content: String,
        embedding: Vec<f32>,
        source_filename: Option<String>,
        sequence_index: usize,
    ) -> Self {
        let id = chunk_id(source_filename.as_deref(), sequence_index, &content);
        Self {
            id,
            content,
            embedding,
            source_filename,
            sequence_index,
        }
    }
}

/// Deterministic, index-key-safe identifier for a chunk
pub fn chunk_id(filename: Option<&str>, sequence_index: usize, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(filename.unwrap_or_default().as_bytes());
    hasher.update(b":");
    hasher.update(sequence_index.to_string().as_bytes());
    hasher.update(b":");
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
