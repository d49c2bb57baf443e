// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Args;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::error;

use crate::config::RagConfig;
use crate::rag::{Answer, RagPipeline};

/// Arguments for the ask command
#[derive(Args, Debug)]
pub struct AskArgs {
    /// Question to answer; omit to read questions from stdin
    pub question: Option<String>,

    /// Print the answer as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(config: &RagConfig, args: AskArgs) -> Result<()> {
    let pipeline = RagPipeline::from_config(config)?;

    match args.question {
        Some(question) => {
            let answer = pipeline.answer(&question).await?;
            println!("{}", render(&answer, args.json)?);
            Ok(())
        }
        None => interactive(&pipeline, args.json).await,
    }
}

/// Read questions until EOF or an empty line; failures never end the session
async fn interactive(pipeline: &RagPipeline, json: bool) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("Ask a question about your PDF documents: ");
        std::io::stdout().flush()?;

        let question = match lines.next_line().await? {
            Some(line) if !line.trim().is_empty() => line,
            _ => return Ok(()),
        };

        match pipeline.answer(question.trim()).await {
            Ok(answer) => println!("{}\n", render(&answer, json)?),
            Err(e) => {
                error!("Error processing RAG query: {}", e);
                println!("An error occurred: {}\n", e.user_message());
            }
        }
    }
}

/// Text or JSON rendering of an answer and its numbered chunks
pub fn render(answer: &Answer, json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(answer)?);
    }

    let mut out = format!("Answer:\n{}", answer.text);
    if !answer.source_chunks.is_empty() {
        out.push_str("\n\nRelevant Chunks from the PDF:");
        for (idx, chunk) in answer.source_chunks.iter().enumerate() {
            out.push_str(&format!("\nChunk {}: {}", idx + 1, chunk));
        }
    }
    Ok(out)
}
