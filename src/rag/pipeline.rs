// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Retrieval-augmented answering
//!
//! One invocation walks `EmbeddingQuery -> Searching -> Generating -> Done`
//! with two soft exits: no search hits, and a blank generated answer.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::errors::PipelineError;
use crate::config::RagConfig;
use crate::embeddings::{AzureOpenAiEmbeddings, EmbeddingProvider};
use crate::generation::{AnswerGenerator, AzureChatGenerator};
use crate::search::{AzureSearchClient, SearchClient};

pub const NO_RELEVANT_INFORMATION: &str = "No relevant information found in the PDF docs.";
pub const NO_RESPONSE_GENERATED: &str = "No response generated. Please refine your query.";

/// How an answer was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerOutcome {
    /// The model answered from retrieved chunks
    Generated,
    /// The index returned nothing; generation was skipped
    NoRelevantInformation,
    /// The model returned blank text
    NoResponseGenerated,
}

/// Final answer with the evidence that was retrieved for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub text: String,
    /// Everything the index returned, even when `text` is a fallback
    pub source_chunks: Vec<String>,
    pub outcome: AnswerOutcome,
}

enum Stage {
    EmbeddingQuery,
    Searching { embedding: Vec<f32> },
    Generating { chunks: Vec<String> },
    Done(Answer),
}

/// Embed, retrieve and generate for a single question
pub struct RagPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    search: Arc<dyn SearchClient>,
    generator: Arc<dyn AnswerGenerator>,
}

impl RagPipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        search: Arc<dyn SearchClient>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Self {
        Self {
            embedder,
            search,
            generator,
        }
    }

    /// Build a pipeline wired to the Azure services in `config`
    pub fn from_config(config: &RagConfig) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        Ok(Self::new(
            Arc::new(AzureOpenAiEmbeddings::new(&config.openai, timeout)?),
            Arc::new(AzureSearchClient::new(config.search.clone(), timeout)?),
            Arc::new(AzureChatGenerator::new(&config.openai, timeout)?),
        ))
    }

    /// Answer `query` from the indexed documents
    pub async fn answer(&self, query: &str) -> Result<Answer, PipelineError> {
        info!("Starting RAG pipeline for PDF documents.");

        let mut stage = Stage::EmbeddingQuery;
        loop {
            stage = match stage {
                Stage::EmbeddingQuery => self.embed_query(query).await?,
                Stage::Searching { embedding } => self.retrieve(&embedding).await?,
                Stage::Generating { chunks } => self.generate(query, chunks).await?,
                Stage::Done(answer) => return Ok(answer),
            };
        }
    }

    async fn embed_query(&self, query: &str) -> Result<Stage, PipelineError> {
        let embedding = self.embedder.embed(query).await.map_err(unexpected)?;
        if embedding.is_empty() {
            let err = PipelineError::EmptyQueryEmbedding;
            error!("Error in RAG pipeline: {}", err);
            return Err(err);
        }

        debug!("Query embedded into {} dimensions", embedding.len());
        Ok(Stage::Searching { embedding })
    }

    async fn retrieve(&self, embedding: &[f32]) -> Result<Stage, PipelineError> {
        let chunks = self.search.search(embedding).await.map_err(unexpected)?;
        if chunks.is_empty() {
            warn!("No chunks retrieved; skipping generation");
            return Ok(Stage::Done(Answer {
                text: NO_RELEVANT_INFORMATION.to_string(),
                source_chunks: Vec::new(),
                outcome: AnswerOutcome::NoRelevantInformation,
            }));
        }

        Ok(Stage::Generating { chunks })
    }

    async fn generate(&self, query: &str, chunks: Vec<String>) -> Result<Stage, PipelineError> {
        let text = self
            .generator
            .generate(query, &chunks)
            .await
            .map_err(unexpected)?;

        if text.trim().is_empty() {
            warn!("Generator returned an empty answer");
            return Ok(Stage::Done(Answer {
                text: NO_RESPONSE_GENERATED.to_string(),
                source_chunks: chunks,
                outcome: AnswerOutcome::NoResponseGenerated,
            }));
        }

        Ok(Stage::Done(Answer {
            text,
            source_chunks: chunks,
            outcome: AnswerOutcome::Generated,
        }))
    }
}

fn unexpected<E>(err: E) -> PipelineError
where
    E: std::error::Error + Send + Sync + 'static,
{
    error!("Unexpected error in RAG pipeline: {}", err);
    PipelineError::failed(err)
}
