// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! PDF text extraction
//!
//! Pages are read independently so a single unreadable page does not cost
//! the rest of the document.

use lopdf::Document;
use std::io::Read;
use tracing::{error, info, warn};

use super::errors::ExtractError;

/// Extract the text of every readable page, in page order
pub fn extract_text(pdf_bytes: &[u8]) -> Result<String, ExtractError> {
    let document = Document::load_mem(pdf_bytes).map_err(|e| {
        error!("Failed to extract text from PDF stream: {}", e);
        ExtractError::UnprocessablePdf(e.to_string())
    })?;

    let mut text = String::new();
    for page_number in document.get_pages().into_keys() {
        match document.extract_text(&[page_number]) {
            Ok(page_text) if !page_text.trim().is_empty() => text.push_str(&page_text),
            Ok(_) => warn!("No text found on page {}.", page_number),
            Err(e) => error!("Error reading page {}: {}", page_number, e),
        }
    }

    if text.trim().is_empty() {
        error!("Extraction error: {}", ExtractError::NoExtractableText);
        return Err(ExtractError::NoExtractableText);
    }

    info!("Text successfully extracted from the PDF stream.");
    Ok(text)
}

/// Buffer a PDF stream and extract its text
pub fn extract_text_from_reader<R: Read>(mut reader: R) -> Result<String, ExtractError> {
    let mut buffer = Vec::new();
    reader.read_to_end(&mut buffer).map_err(|e| {
        error!("Failed to read PDF stream: {}", e);
        ExtractError::UnprocessablePdf(e.to_string())
    })?;
    extract_text(&buffer)
}
