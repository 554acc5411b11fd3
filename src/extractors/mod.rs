// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Text extraction for the documents being filed

pub mod pdf;
pub mod text;

use std::path::Path;
use tracing::{debug, warn};

use crate::Result;

/// Source of raw document text for the analysis workers.
///
/// Implementations never fail: anything that goes wrong degrades to empty
/// text, which the pipeline then routes to manual resolution.
pub trait TextExtractor: Send + Sync {
    /// Text of the first `max_pages` pages of `path`
    fn extract(&self, path: &Path, max_pages: usize) -> String;
}

/// Extractor for one family of file formats
pub trait FormatExtractor: Send + Sync {
    /// Name of this extractor
    fn name(&self) -> &'static str;

    /// File extensions this extractor handles
    fn supported_extensions(&self) -> &[&str];

    /// Check if this extractor can handle a file
    fn can_handle(&self, path: &Path) -> bool {
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            self.supported_extensions().iter().any(|e| e.eq_ignore_ascii_case(ext))
        } else {
            false
        }
    }

    /// Extract text from at most `max_pages` pages
    fn extract_text(&self, path: &Path, max_pages: usize) -> Result<String>;

    /// Priority (higher = preferred when multiple extractors match)
    fn priority(&self) -> u8 {
        50
    }
}

/// Registry of format extractors, picked by file extension
pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn FormatExtractor>>,
}

impl ExtractorRegistry {
    /// Create a registry with the built-in extractors
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(pdf::PdfExtractor::new()));
        registry.register(Box::new(text::PlainTextExtractor::new()));
        registry
    }

    pub fn empty() -> Self {
        Self {
            extractors: Vec::new(),
        }
    }

    /// Register a new extractor
    pub fn register(&mut self, extractor: Box<dyn FormatExtractor>) {
        self.extractors.push(extractor);
        self.extractors.sort_by_key(|e| std::cmp::Reverse(e.priority()));
    }

    /// Find the best extractor for a file
    pub fn find_extractor(&self, path: &Path) -> Option<&dyn FormatExtractor> {
        self.extractors
            .iter()
            .find(|e| e.can_handle(path))
            .map(|e| e.as_ref())
    }

    pub fn extractor_names(&self) -> Vec<&'static str> {
        self.extractors.iter().map(|e| e.name()).collect()
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TextExtractor for ExtractorRegistry {
    fn extract(&self, path: &Path, max_pages: usize) -> String {
        let Some(extractor) = self.find_extractor(path) else {
            debug!("No extractor for {:?}", path);
            return String::new();
        };

        match extractor.extract_text(path, max_pages) {
            Ok(text) => {
                debug!("{} extractor read {} chars from {:?}", extractor.name(), text.len(), path);
                text
            }
            Err(e) => {
                warn!("Could not extract text from {:?}: {}", path, e);
                String::new()
            }
        }
    }
}
