// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod cli;
pub mod config;
pub mod embeddings;
pub mod generation;
pub mod ingest;
pub mod rag;
pub mod search;
pub mod storage;

// Re-export main types
pub use config::{ConfigError, RagConfig};
pub use ingest::{Chunk, Document, IngestReport, IngestionService, SemanticChunker};
pub use rag::{Answer, AnswerOutcome, PipelineError, RagPipeline};
