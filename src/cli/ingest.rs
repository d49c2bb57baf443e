// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Args;
use std::time::Duration;
use tracing::info;

use crate::config::RagConfig;
use crate::ingest::{IngestOptions, IngestionService};
use crate::storage::{AzureBlobStore, BlobStore};

/// Arguments for the ingest command
#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Comma-separated blob names to ingest (default: every PDF)
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,

    /// Chunk and embed without writing to the search index
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn run(config: &RagConfig, args: IngestArgs) -> Result<()> {
    let service = IngestionService::from_config(config)?;
    let options = IngestOptions {
        only: args.only,
        dry_run: args.dry_run,
    };

    info!("Starting ingestion (dry run: {})", options.dry_run);
    let report = service.run(&options).await?;

    println!(
        "Indexed {} chunks from {}/{} documents in {}ms",
        report.chunks_indexed, report.documents_indexed, report.documents_seen, report.elapsed_ms
    );
    for failure in &report.failures {
        println!("  {} [{}]: {}", failure.filename, failure.error_code, failure.reason);
    }
    Ok(())
}

pub async fn list(config: &RagConfig) -> Result<()> {
    let timeout = Duration::from_secs(config.request_timeout_secs);
    let store = AzureBlobStore::new(config.require_blob()?, timeout)?;

    for name in store.list_pdfs().await? {
        println!("{}", name);
    }
    Ok(())
}
