// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod ask;
pub mod ingest;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::RagConfig;

/// PDF RAG assistant CLI
#[derive(Parser, Debug)]
#[command(name = "pdf-rag")]
#[command(version)]
#[command(about = "Ask questions about PDF documents indexed in Azure Cognitive Search", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a question, or start an interactive session when none is given
    Ask(ask::AskArgs),

    /// Extract, chunk, embed and index PDFs from blob storage
    Ingest(ingest::IngestArgs),

    /// List PDF blobs in the configured container
    List,
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let config = RagConfig::from_env()?;

    match cli.command {
        Commands::Ask(args) => ask::run(&config, args).await,
        Commands::Ingest(args) => ingest::run(&config, args).await,
        Commands::List => ingest::list(&config).await,
    }
}
