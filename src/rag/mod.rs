// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// RAG (Retrieval-Augmented Generation) module
// Query-time orchestration of embedding, vector search and answer generation

pub mod errors;
pub mod pipeline;

pub use errors::PipelineError;
pub use pipeline::{
    Answer, AnswerOutcome, RagPipeline, NO_RELEVANT_INFORMATION, NO_RESPONSE_GENERATED,
};
