// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Azure OpenAI chat completions adapter

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

use super::{
    build_messages, AnswerGenerator, ChatMessage, GenerationError, ANSWER_TEMPERATURE,
    MAX_ANSWER_TOKENS,
};
use crate::config::OpenAiConfig;

/// Answer generator backed by an Azure OpenAI chat deployment
pub struct AzureChatGenerator {
    client: Client,
    url: String,
    api_key: String,
}

impl AzureChatGenerator {
    pub fn new(config: &OpenAiConfig, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let url = format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            config.endpoint.trim_end_matches('/'),
            config.chat_deployment,
            config.api_version
        );

        Ok(Self {
            client,
            url,
            api_key: config.api_key.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, String> {
        let response = self
            .client
            .post(&self.url)
            .header("api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("status {}: {}", status.as_u16(), body));
        }

        let data: ChatResponse = response
            .json()
            .await
            .map_err(|e| format!("JSON parse error: {}", e))?;

        data.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default())
            .ok_or_else(|| "response contained no choices".to_string())
    }
}

#[async_trait]
impl AnswerGenerator for AzureChatGenerator {
    async fn generate(
        &self,
        query: &str,
        context_chunks: &[String],
    ) -> Result<String, GenerationError> {
        let request = ChatRequest {
            messages: build_messages(query, context_chunks),
            max_tokens: MAX_ANSWER_TOKENS,
            temperature: ANSWER_TEMPERATURE,
        };

        match self.complete(&request).await {
            Ok(content) => {
                info!("Response generated successfully with Azure OpenAI.");
                Ok(content)
            }
            Err(cause) => {
                error!("Error generating response with Azure OpenAI: {}", cause);
                Err(GenerationError::GenerationFailed)
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}
