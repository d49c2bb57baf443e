// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Ingestion orchestration
//!
//! Lists PDFs in the blob store and runs each one through extraction,
//! chunking and indexing. Documents are independent: a failure is recorded
//! in the report and the run moves on.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use super::chunker::SemanticChunker;
use super::errors::{ExtractError, IngestError};
use super::extractor::extract_text;
use crate::config::RagConfig;
use crate::embeddings::AzureOpenAiEmbeddings;
use crate::search::{AzureSearchClient, SearchClient};
use crate::storage::{AzureBlobStore, BlobError, BlobStore};

/// Options for one ingestion run
#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    /// Restrict the run to these blob names; empty means every PDF
    pub only: Vec<String>,
    /// Chunk and embed but do not write to the index
    pub dry_run: bool,
}

/// A document that could not be ingested
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFailure {
    pub filename: String,
    pub error_code: String,
    pub reason: String,
}

/// Summary of an ingestion run
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub documents_seen: usize,
    pub documents_indexed: usize,
    pub chunks_indexed: usize,
    pub failures: Vec<DocumentFailure>,
    pub elapsed_ms: u64,
}

pub struct IngestionService {
    blob_store: Arc<dyn BlobStore>,
    chunker: Arc<SemanticChunker>,
    index: Arc<dyn SearchClient>,
    concurrency: usize,
}

impl IngestionService {
    pub fn new(
        blob_store: Arc<dyn BlobStore>,
        chunker: Arc<SemanticChunker>,
        index: Arc<dyn SearchClient>,
        concurrency: usize,
    ) -> Self {
        Self {
            blob_store,
            chunker,
            index,
            concurrency: concurrency.max(1),
        }
    }

    /// Build a service wired to the Azure services in `config`
    pub fn from_config(config: &RagConfig) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let blob_store = AzureBlobStore::new(config.require_blob()?, timeout)?;
        let embedder = Arc::new(AzureOpenAiEmbeddings::new(&config.openai, timeout)?);

        Ok(Self::new(
            Arc::new(blob_store),
            Arc::new(SemanticChunker::with_default_splitter(embedder)),
            Arc::new(AzureSearchClient::new(config.search.clone(), timeout)?),
            config.ingest_concurrency,
        ))
    }

    /// Ingest every selected PDF
    ///
    /// Only a failure to list the store aborts the run.
    pub async fn run(&self, options: &IngestOptions) -> Result<IngestReport, BlobError> {
        let start = Instant::now();
        let mut names = self.blob_store.list_pdfs().await?;
        if !options.only.is_empty() {
            names.retain(|name| options.only.contains(name));
        }

        let mut report = IngestReport {
            documents_seen: names.len(),
            ..Default::default()
        };

        let outcomes: Vec<(String, Result<usize, IngestError>)> = stream::iter(names)
            .map(|name| async move {
                let outcome = self.ingest_document(&name, options.dry_run).await;
                (name, outcome)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for (filename, outcome) in outcomes {
            match outcome {
                Ok(chunks) => {
                    report.documents_indexed += 1;
                    report.chunks_indexed += chunks;
                }
                Err(e) => {
                    error!("Failed to ingest {}: {}", filename, e);
                    report.failures.push(DocumentFailure {
                        error_code: e.error_code().to_string(),
                        reason: e.to_string(),
                        filename,
                    });
                }
            }
        }
        report.failures.sort_by(|a, b| a.filename.cmp(&b.filename));
        report.elapsed_ms = start.elapsed().as_millis() as u64;

        info!(
            "Ingestion complete: {}/{} documents, {} chunks, {} failures in {}ms",
            report.documents_indexed,
            report.documents_seen,
            report.chunks_indexed,
            report.failures.len(),
            report.elapsed_ms
        );
        Ok(report)
    }

    /// Fetch, extract, chunk and index one document
    ///
    /// # Returns
    /// Number of chunks written (or that would be written on a dry run).
    /// A document that ends with nothing indexable is an error, never `Ok(0)`.
    pub async fn ingest_document(&self, name: &str, dry_run: bool) -> Result<usize, IngestError> {
        let bytes = self.blob_store.fetch(name).await?;

        // lopdf parsing is CPU-bound
        let text = tokio::task::spawn_blocking(move || extract_text(&bytes))
            .await
            .map_err(|e| ExtractError::UnprocessablePdf(e.to_string()))??;

        let chunks = self.chunker.chunk_text(&text, name).await?;
        if chunks.is_empty() {
            error!("No valid chunks produced for {}", name);
            return Err(IngestError::NoValidChunks {
                filename: name.to_string(),
            });
        }
        if dry_run {
            info!("Dry run: skipping upload of {} chunks for {}", chunks.len(), name);
            return Ok(chunks.len());
        }

        let accepted = self.index.upload(&chunks).await?;
        if accepted == 0 {
            error!("Index rejected every chunk for {}", name);
            return Err(IngestError::AllChunksRejected {
                filename: name.to_string(),
                rejected: chunks.len(),
            });
        }
        if accepted < chunks.len() {
            warn!(
                "Index accepted {} of {} chunks for {}",
                accepted,
                chunks.len(),
                name
            );
        }
        Ok(accepted)
    }
}
