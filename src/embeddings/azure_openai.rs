// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Azure OpenAI embeddings adapter

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

use super::{EmbeddingError, EmbeddingProvider};
use crate::config::OpenAiConfig;

/// Embedding provider backed by an Azure OpenAI embedding deployment
pub struct AzureOpenAiEmbeddings {
    client: Client,
    url: String,
    api_key: String,
    batch_size: usize,
}

impl AzureOpenAiEmbeddings {
    /// Create a new adapter for the configured embedding deployment
    pub fn new(config: &OpenAiConfig, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let url = format!(
            "{}/openai/deployments/{}/embeddings?api-version={}",
            config.endpoint.trim_end_matches('/'),
            config.embedding_deployment,
            config.api_version
        );

        Ok(Self {
            client,
            url,
            api_key: config.api_key.clone(),
            batch_size: config.embedding_batch_size.max(1),
        })
    }

    /// Endpoint this adapter posts to
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn request(&self, input: Vec<&str>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let expected = input.len();
        let response = self
            .client
            .post(&self.url)
            .header("api-key", &self.api_key)
            .json(&EmbeddingRequest { input })
            .send()
            .await
            .map_err(|e| {
                error!("Embedding request failed: {}", e);
                EmbeddingError::Request(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Embedding service returned {}: {}", status, body);
            return Err(EmbeddingError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let data: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::MalformedResponse(e.to_string()))?;

        let embeddings = data.into_ordered();
        debug!("Received {} embeddings for {} inputs", embeddings.len(), expected);
        Ok(embeddings)
    }
}

#[async_trait]
impl EmbeddingProvider for AzureOpenAiEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self
            .request(vec![text])
            .await?
            .into_iter()
            .next()
            .unwrap_or_default())
    }

    /// Embeds `texts` in requests of at most `embedding_batch_size` inputs
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let batch_embeddings = self
                .request(batch.iter().map(String::as_str).collect())
                .await?;
            if batch_embeddings.len() != batch.len() {
                return Err(EmbeddingError::MalformedResponse(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    batch_embeddings.len()
                )));
            }
            embeddings.extend(batch_embeddings);
        }
        Ok(embeddings)
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    input: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

impl EmbeddingResponse {
    fn into_ordered(mut self) -> Vec<Vec<f32>> {
        self.data.sort_by_key(|d| d.index);
        self.data.into_iter().map(|d| d.embedding).collect()
    }
}
