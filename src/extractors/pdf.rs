// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! PDF text extraction

use std::path::Path;
use tracing::debug;

use super::FormatExtractor;
use crate::{DocketError, Result};

/// Extractor for PDF files
pub struct PdfExtractor;

impl PdfExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Text of the first `max_pages` pages via lopdf
    fn extract_pages(bytes: &[u8], max_pages: usize) -> Result<String> {
        let doc = lopdf::Document::load_mem(bytes)
            .map_err(|e| DocketError::Extraction(format!("Failed to load PDF: {}", e)))?;

        let pages: Vec<u32> = doc.get_pages().keys().copied().take(max_pages.max(1)).collect();
        doc.extract_text(&pages)
            .map_err(|e| DocketError::Extraction(format!("Text extraction failed: {}", e)))
    }

    /// Text of the first `max_pages` pages via pdf-extract, for files lopdf reads as empty
    fn extract_fallback(bytes: &[u8], max_pages: usize) -> Result<String> {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
            .map(|pages| first_pages(pages, max_pages))
            .map_err(|e| DocketError::Extraction(format!("Text extraction failed: {}", e)))
    }
}

fn first_pages(pages: Vec<String>, max_pages: usize) -> String {
    pages.into_iter().take(max_pages.max(1)).collect::<Vec<_>>().join("\n")
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatExtractor for PdfExtractor {
    fn name(&self) -> &'static str {
        "pdf"
    }

    fn supported_extensions(&self) -> &[&str] {
        &["pdf"]
    }

    fn priority(&self) -> u8 {
        90
    }

    fn extract_text(&self, path: &Path, max_pages: usize) -> Result<String> {
        let bytes = std::fs::read(path)?;

        match Self::extract_pages(&bytes, max_pages) {
            Ok(text) if !text.trim().is_empty() => Ok(text),
            Ok(_) => {
                debug!("No text layer found by lopdf in {:?}, retrying", path);
                Self::extract_fallback(&bytes, max_pages)
            }
            Err(e) => {
                debug!("{}, retrying {:?} with pdf-extract", e, path);
                Self::extract_fallback(&bytes, max_pages)
            }
        }
    }
}
