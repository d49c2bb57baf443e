// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Azure Cognitive Search client
//!
//! Issues pure vector queries (wildcard text match ranked by vector
//! similarity) and `mergeOrUpload` index batches over the REST API.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{error, info, warn};

use super::provider::SearchClient;
use super::types::{
    IndexBatch, IndexDocument, IndexResponse, SearchError, SearchResponse, VectorQuery,
    VectorSearchRequest,
};
use crate::config::SearchIndexConfig;
use crate::ingest::types::Chunk;

const SELECT_FIELDS: &str = "content,metadata";
const MATCH_ALL: &str = "*";

/// Azure Cognitive Search REST client
pub struct AzureSearchClient {
    client: Client,
    config: SearchIndexConfig,
}

impl AzureSearchClient {
    /// Create a new client for the configured index
    pub fn new(config: SearchIndexConfig, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, config })
    }

    fn docs_url(&self, operation: &str) -> String {
        format!(
            "{}/indexes/{}/docs/{}?api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.index_name,
            operation,
            self.config.api_version
        )
    }

    /// URL of the vector search operation
    pub fn search_url(&self) -> String {
        self.docs_url("search")
    }

    /// URL of the index batch operation
    pub fn index_url(&self) -> String {
        self.docs_url("index")
    }

    async fn post_json<T: serde::Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
    ) -> Result<(StatusCode, String), SearchError> {
        let response = self
            .client
            .post(url)
            .header("api-key", &self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!("Error querying Azure Search: {}", e);
                SearchError::SearchUnavailable
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            error!("Error reading Azure Search response: {}", e);
            SearchError::SearchUnavailable
        })?;
        Ok((status, text))
    }
}

#[async_trait]
impl SearchClient for AzureSearchClient {
    async fn search(&self, embedding: &[f32]) -> Result<Vec<String>, SearchError> {
        let request = VectorSearchRequest {
            search: MATCH_ALL,
            vectors: vec![VectorQuery {
                value: embedding,
                fields: &self.config.vector_field,
                k: self.config.top_k,
            }],
            select: SELECT_FIELDS,
        };

        let (status, body) = self.post_json(&self.search_url(), &request).await?;
        if status != StatusCode::OK {
            error!("Azure Search query failed: {} - {}", status.as_u16(), body);
            return Err(SearchError::SearchRequestFailed {
                status: status.as_u16(),
                body,
            });
        }

        let response: SearchResponse = serde_json::from_str(&body).map_err(|e| {
            error!("Error querying Azure Search: malformed response: {}", e);
            SearchError::SearchUnavailable
        })?;

        if response.value.is_empty() {
            warn!("No results retrieved from Azure Search.");
            return Ok(Vec::new());
        }

        let chunks: Vec<String> = response
            .value
            .into_iter()
            .filter_map(|hit| hit.content)
            .filter(|content| !content.is_empty())
            .collect();
        info!("Retrieved {} chunks from Azure Search.", chunks.len());
        Ok(chunks)
    }

    async fn upload(&self, chunks: &[Chunk]) -> Result<usize, SearchError> {
        let mut accepted = 0;
        for batch in chunks.chunks(self.config.upload_batch_size.max(1)) {
            accepted += self.upload_batch(batch).await?;
        }

        if !chunks.is_empty() {
            info!("Indexed {} of {} chunks.", accepted, chunks.len());
        }
        Ok(accepted)
    }
}

impl AzureSearchClient {
    /// Send one `mergeOrUpload` batch and count the documents the index accepted
    async fn upload_batch(&self, chunks: &[Chunk]) -> Result<usize, SearchError> {
        let batch = IndexBatch {
            value: chunks.iter().map(IndexDocument::merge_or_upload).collect(),
        };

        let (status, body) = self.post_json(&self.index_url(), &batch).await?;
        if status != StatusCode::OK && status != StatusCode::MULTI_STATUS {
            error!("Azure Search indexing failed: {} - {}", status.as_u16(), body);
            return Err(SearchError::SearchRequestFailed {
                status: status.as_u16(),
                body,
            });
        }

        let response: IndexResponse = serde_json::from_str(&body).map_err(|e| {
            error!("Malformed Azure Search indexing response: {}", e);
            SearchError::SearchUnavailable
        })?;

        let mut accepted = 0;
        for result in &response.value {
            if result.status {
                accepted += 1;
            } else {
                warn!(
                    "Index rejected chunk {}: {}",
                    result.key,
                    result.error_message.as_deref().unwrap_or("unknown error")
                );
            }
        }
        Ok(accepted)
    }
}
