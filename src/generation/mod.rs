// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Answer generation from retrieved context

pub mod azure_openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use azure_openai::AzureChatGenerator;

pub const SYSTEM_PROMPT: &str =
    "You are a helpful assistant. Use the provided context to answer the user's query accurately.";

/// Output cap for generated answers
pub const MAX_ANSWER_TOKENS: u32 = 500;

/// Greedy decoding for reproducible answers
pub const ANSWER_TEMPERATURE: f32 = 0.0;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GenerationError {
    /// Any failure of the remote call; the cause is only logged
    #[error("Failed to call Azure OpenAI for final answer.")]
    GenerationFailed,
}

/// Produces an answer to a query from retrieved chunks
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Generate answer text; the result may be empty
    async fn generate(&self, query: &str, context_chunks: &[String])
        -> Result<String, GenerationError>;
}

/// A role-tagged chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Join chunks into one labelled context block
pub fn build_context(chunks: &[String]) -> String {
    chunks
        .iter()
        .map(|chunk| format!("Chunk: {}", chunk))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Instruction, context, then the raw query
pub fn build_messages(query: &str, chunks: &[String]) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::system(format!("Context: {}", build_context(chunks))),
        ChatMessage::user(query),
    ]
}
