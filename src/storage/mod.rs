// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Blob storage for source PDFs

pub mod azure_blob;

use async_trait::async_trait;
use thiserror::Error;

pub use azure_blob::AzureBlobStore;

/// Errors from a blob store
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BlobError {
    /// The store could not be reached or refused the listing
    #[error("Blob store unreachable: {0}")]
    Unreachable(String),

    /// The blob downloaded with zero bytes
    #[error("Blob '{0}' is empty or could not be downloaded.")]
    EmptyBlob(String),

    /// The blob could not be downloaded
    #[error("Failed to retrieve blob '{name}': {reason}")]
    DownloadFailed { name: String, reason: String },

    #[error("Invalid storage connection string: {0}")]
    InvalidConnectionString(String),
}

/// Source of PDF documents for ingestion
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Names of all PDF blobs in the container
    async fn list_pdfs(&self) -> Result<Vec<String>, BlobError>;

    /// Full contents of one blob; never empty on success
    async fn fetch(&self, name: &str) -> Result<Vec<u8>, BlobError>;
}

/// Whether a blob name refers to a PDF
pub fn is_pdf(name: &str) -> bool {
    name.ends_with(".pdf")
}
