// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Document ingestion
//!
//! Offline path that turns PDFs into embedded chunks:
//! - text extraction, page by page
//! - semantic splitting at topic boundaries
//! - per-chunk embedding with fault isolation
//! - upload into the search index

pub mod chunker;
pub mod errors;
pub mod extractor;
pub mod service;
pub mod splitter;
pub mod types;

pub use chunker::SemanticChunker;
pub use errors::{ChunkError, ExtractError, IngestError, SplitError};
pub use extractor::{extract_text, extract_text_from_reader};
pub use service::{DocumentFailure, IngestOptions, IngestReport, IngestionService};
pub use splitter::{PercentileSplitter, SemanticSplitter};
pub use types::{Chunk, Document};
