// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Semantic text splitting
//!
//! [`PercentileSplitter`] embeds a sliding window around every sentence and
//! cuts the text wherever the cosine distance between neighbouring windows
//! exceeds a percentile of all such distances.

use async_trait::async_trait;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

use super::errors::SplitError;
use super::types::Document;
use crate::embeddings::{cosine_similarity, EmbeddingProvider};

pub const DEFAULT_BUFFER_SIZE: usize = 1;
pub const DEFAULT_BREAKPOINT_PERCENTILE: f64 = 95.0;

/// Divides a document into topically coherent segments
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SemanticSplitter: Send + Sync {
    /// Segments in document order
    async fn split(&self, document: &Document) -> Result<Vec<String>, SplitError>;
}

/// Similarity-breakpoint splitter
pub struct PercentileSplitter {
    embedder: Arc<dyn EmbeddingProvider>,
    buffer_size: usize,
    breakpoint_percentile: f64,
}

impl PercentileSplitter {
    /// Buffer window of one sentence, breakpoints above the 95th percentile
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            embedder,
            buffer_size: DEFAULT_BUFFER_SIZE,
            breakpoint_percentile: DEFAULT_BREAKPOINT_PERCENTILE,
        }
    }

    pub fn with_params(
        embedder: Arc<dyn EmbeddingProvider>,
        buffer_size: usize,
        breakpoint_percentile: f64,
    ) -> Result<Self, SplitError> {
        if !(breakpoint_percentile > 0.0 && breakpoint_percentile <= 100.0) {
            return Err(SplitError::InvalidConfig(format!(
                "breakpoint percentile must be in (0, 100], got {}",
                breakpoint_percentile
            )));
        }

        Ok(Self {
            embedder,
            buffer_size,
            breakpoint_percentile,
        })
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    pub fn breakpoint_percentile(&self) -> f64 {
        self.breakpoint_percentile
    }
}

#[async_trait]
impl SemanticSplitter for PercentileSplitter {
    async fn split(&self, document: &Document) -> Result<Vec<String>, SplitError> {
        let sentences = split_sentences(&document.text);
        match sentences.len() {
            0 => return Ok(Vec::new()),
            1 => return Ok(vec![sentences[0].trim().to_string()]),
            _ => {}
        }

        let windows = combine_windows(&sentences, self.buffer_size);
        let embeddings = self
            .embedder
            .embed_batch(&windows)
            .await
            .map_err(|e| SplitError::Embedding(e.to_string()))?;

        if embeddings.len() != windows.len() {
            return Err(SplitError::Embedding(format!(
                "expected {} window embeddings, got {}",
                windows.len(),
                embeddings.len()
            )));
        }
        if let Some(i) = embeddings.iter().position(|e| e.is_empty()) {
            return Err(SplitError::Embedding(format!(
                "empty embedding for sentence window {}",
                i
            )));
        }

        let distances: Vec<f32> = embeddings
            .windows(2)
            .map(|pair| 1.0 - cosine_similarity(&pair[0], &pair[1]))
            .collect();
        let threshold = percentile(&distances, self.breakpoint_percentile);

        let mut segments = Vec::new();
        let mut start = 0;
        for (i, distance) in distances.iter().enumerate() {
            if *distance > threshold {
                push_segment(&mut segments, &sentences[start..=i]);
                start = i + 1;
            }
        }
        push_segment(&mut segments, &sentences[start..]);

        debug!(
            "Split {} sentences into {} segments (threshold {:.4})",
            sentences.len(),
            segments.len(),
            threshold
        );
        Ok(segments)
    }
}

/// Unicode sentences with their trailing whitespace; blank runs are folded
/// into the preceding sentence
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences: Vec<String> = Vec::new();
    for sentence in text.split_sentence_bounds() {
        if sentence.trim().is_empty() {
            if let Some(last) = sentences.last_mut() {
                last.push_str(sentence);
            }
            continue;
        }
        sentences.push(sentence.to_string());
    }
    sentences
}

/// Each sentence joined with up to `buffer` neighbours on either side
fn combine_windows(sentences: &[String], buffer: usize) -> Vec<String> {
    (0..sentences.len())
        .map(|i| {
            let start = i.saturating_sub(buffer);
            let end = (i + buffer + 1).min(sentences.len());
            sentences[start..end].concat()
        })
        .collect()
}

/// Linear-interpolated percentile, `p` in [0, 100]
fn percentile(values: &[f32], p: f64) -> f32 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let rank = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = (rank - lower as f64) as f32;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

fn push_segment(segments: &mut Vec<String>, sentences: &[String]) {
    let segment = sentences.concat().trim().to_string();
    if !segment.is_empty() {
        segments.push(segment);
    }
}
