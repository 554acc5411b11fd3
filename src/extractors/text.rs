// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Plain text files

use std::path::Path;

use super::FormatExtractor;
use crate::Result;

/// Reads text files as-is. Page limits do not apply.
pub struct PlainTextExtractor;

impl PlainTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PlainTextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatExtractor for PlainTextExtractor {
    fn name(&self) -> &'static str {
        "text"
    }

    fn supported_extensions(&self) -> &[&str] {
        &["txt", "md", "text"]
    }

    fn extract_text(&self, path: &Path, _max_pages: usize) -> Result<String> {
        let bytes = std::fs::read(path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
