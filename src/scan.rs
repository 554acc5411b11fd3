// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Finding the files waiting to be filed

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::Result;

/// Check if a file should be picked up at all
pub fn should_process(path: &Path) -> bool {
    let filename = match path.file_name().and_then(|n| n.to_str()) {
        Some(n) => n,
        None => return false,
    };

    // Hidden files and office lock files
    if filename.starts_with('.') || filename.starts_with("~$") {
        return false;
    }

    let temp_extensions = [".tmp", ".part", ".crdownload", ".partial", ".download"];
    if temp_extensions.iter().any(|ext| filename.to_ascii_lowercase().ends_with(ext)) {
        return false;
    }

    let skip_names = ["desktop.ini", "thumbs.db", ".ds_store"];
    !skip_names.iter().any(|n| filename.eq_ignore_ascii_case(n))
}

/// Files directly inside `dir` with one of `extensions`, sorted by name.
pub fn list_candidates(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() || !should_process(&path) {
            continue;
        }

        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|ext| extensions.iter().any(|want| want.trim_start_matches('.').eq_ignore_ascii_case(ext)))
            .unwrap_or(false);

        if matches {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    debug!("Found {} candidate files in {:?}", files.len(), dir);
    Ok(files)
}
