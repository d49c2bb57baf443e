// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Configuration for the RAG service
//!
//! Values come from the process environment, optionally seeded from a
//! `.env` file. Azure OpenAI and Azure Cognitive Search settings are
//! required for every command; blob storage settings are only needed for
//! ingestion.

use std::env;
use thiserror::Error;
use tracing::error;

pub const DEFAULT_SEARCH_API_VERSION: &str = "2023-07-01-Preview";
pub const DEFAULT_VECTOR_FIELD: &str = "embedding";
pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_INGEST_CONCURRENCY: usize = 4;
pub const DEFAULT_EMBEDDING_BATCH_SIZE: usize = 16;
/// Keeps a batch of 1536-dimension vectors well under the 16 MB request cap
pub const DEFAULT_UPLOAD_BATCH_SIZE: usize = 100;
/// Azure Cognitive Search rejects index batches larger than this
pub const MAX_UPLOAD_BATCH_SIZE: usize = 1000;

/// Errors raised while loading or validating configuration
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// A required environment variable is unset or blank
    #[error("Env var '{0}' is not set.")]
    MissingVar(String),

    /// A variable is present but its value cannot be used
    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Azure OpenAI settings shared by the embedding and chat adapters
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub endpoint: String,
    pub chat_deployment: String,
    pub embedding_deployment: String,
    pub api_version: String,
    /// Maximum number of inputs sent in one embeddings request
    pub embedding_batch_size: usize,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: String::new(),
            chat_deployment: String::new(),
            embedding_deployment: String::new(),
            api_version: String::new(),
            embedding_batch_size: DEFAULT_EMBEDDING_BATCH_SIZE,
        }
    }
}

/// Azure Cognitive Search settings
#[derive(Debug, Clone)]
pub struct SearchIndexConfig {
    pub endpoint: String,
    pub api_key: String,
    pub index_name: String,
    pub api_version: String,
    /// Name of the vector field queried and populated by the index
    pub vector_field: String,
    /// Number of nearest neighbours requested per query
    pub top_k: usize,
    /// Maximum number of documents per index batch
    pub upload_batch_size: usize,
}

impl Default for SearchIndexConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            index_name: String::new(),
            api_version: DEFAULT_SEARCH_API_VERSION.to_string(),
            vector_field: DEFAULT_VECTOR_FIELD.to_string(),
            top_k: DEFAULT_TOP_K,
            upload_batch_size: DEFAULT_UPLOAD_BATCH_SIZE,
        }
    }
}

/// Azure Blob Storage settings (ingestion only)
#[derive(Debug, Clone, Default)]
pub struct BlobConfig {
    pub connection_string: String,
    pub container: String,
}

/// Top-level configuration
#[derive(Debug, Clone)]
pub struct RagConfig {
    pub openai: OpenAiConfig,
    pub search: SearchIndexConfig,
    pub blob: Option<BlobConfig>,
    /// Connection-level timeout applied to every HTTP client
    pub request_timeout_secs: u64,
    /// Maximum number of documents processed at once during ingestion
    pub ingest_concurrency: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            openai: OpenAiConfig::default(),
            search: SearchIndexConfig::default(),
            blob: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            ingest_concurrency: DEFAULT_INGEST_CONCURRENCY,
        }
    }
}

impl RagConfig {
    /// Load configuration from `.env` and the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is normal in deployed environments
        let _ = dotenv::dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| -> Result<String, ConfigError> {
            match lookup(name) {
                Some(value) if !value.trim().is_empty() => Ok(value),
                _ => {
                    error!("Environment variable '{}' is not set.", name);
                    Err(ConfigError::MissingVar(name.to_string()))
                }
            }
        };

        let openai = OpenAiConfig {
            api_key: required("AZURE_OPENAI_API_KEY")?,
            endpoint: required("AZURE_OPENAI_ENDPOINT")?,
            chat_deployment: required("AZURE_OPENAI_DEPLOYMENT_NAME")?,
            api_version: required("AZURE_OPENAI_MODEL_VERSION")?,
            embedding_deployment: required("AZURE_OPENAI_EMBEDDING_NAME")?,
            embedding_batch_size: parse_or(
                "EMBEDDING_BATCH_SIZE",
                lookup("EMBEDDING_BATCH_SIZE"),
                DEFAULT_EMBEDDING_BATCH_SIZE,
            )?,
        };

        let search = SearchIndexConfig {
            endpoint: required("SEARCH_ENDPOINT")?,
            api_key: required("SEARCH_ADMIN_KEY")?,
            index_name: required("SEARCH_INDEX_NAME")?,
            api_version: lookup("SEARCH_API_VERSION")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SEARCH_API_VERSION.to_string()),
            vector_field: DEFAULT_VECTOR_FIELD.to_string(),
            top_k: parse_or("SEARCH_TOP_K", lookup("SEARCH_TOP_K"), DEFAULT_TOP_K)?,
            upload_batch_size: parse_or(
                "SEARCH_UPLOAD_BATCH_SIZE",
                lookup("SEARCH_UPLOAD_BATCH_SIZE"),
                DEFAULT_UPLOAD_BATCH_SIZE,
            )?,
        };

        let blob = match (
            lookup("AZURE_STORAGE_CONNECTION_STRING").filter(|v| !v.trim().is_empty()),
            lookup("BLOB_CONTAINER_NAME").filter(|v| !v.trim().is_empty()),
        ) {
            (Some(connection_string), Some(container)) => Some(BlobConfig {
                connection_string,
                container,
            }),
            _ => None,
        };

        let config = Self {
            openai,
            search,
            blob,
            request_timeout_secs: parse_or(
                "REQUEST_TIMEOUT_SECS",
                lookup("REQUEST_TIMEOUT_SECS"),
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?,
            ingest_concurrency: parse_or(
                "INGEST_CONCURRENCY",
                lookup("INGEST_CONCURRENCY"),
                DEFAULT_INGEST_CONCURRENCY,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.search.top_k == 0 {
            return Err(invalid("SEARCH_TOP_K", "must be greater than 0"));
        }
        if self.openai.embedding_batch_size == 0 {
            return Err(invalid("EMBEDDING_BATCH_SIZE", "must be greater than 0"));
        }
        if self.search.upload_batch_size == 0
            || self.search.upload_batch_size > MAX_UPLOAD_BATCH_SIZE
        {
            return Err(invalid(
                "SEARCH_UPLOAD_BATCH_SIZE",
                &format!("must be between 1 and {}", MAX_UPLOAD_BATCH_SIZE),
            ));
        }
        if self.ingest_concurrency == 0 {
            return Err(invalid("INGEST_CONCURRENCY", "must be greater than 0"));
        }
        if self.request_timeout_secs == 0 {
            return Err(invalid("REQUEST_TIMEOUT_SECS", "must be greater than 0"));
        }
        check_url("AZURE_OPENAI_ENDPOINT", &self.openai.endpoint)?;
        check_url("SEARCH_ENDPOINT", &self.search.endpoint)?;
        Ok(())
    }

    /// Blob settings, or the first missing variable when ingestion is not configured
    pub fn require_blob(&self) -> Result<&BlobConfig, ConfigError> {
        self.blob.as_ref().ok_or_else(|| {
            error!("Blob storage is not configured.");
            ConfigError::MissingVar("AZURE_STORAGE_CONNECTION_STRING".to_string())
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    var: &str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map_err(|_| invalid(var, &format!("'{}' is not a number", value))),
        _ => Ok(default),
    }
}

fn check_url(var: &str, value: &str) -> Result<(), ConfigError> {
    url::Url::parse(value)
        .map(|_| ())
        .map_err(|e| invalid(var, &e.to_string()))
}

fn invalid(var: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        var: var.to_string(),
        reason: reason.to_string(),
    }
}
