// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Canonical filenames and collision-free destination paths

use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

/// Extension given to every filed document.
pub const FILED_EXTENSION: &str = "pdf";

/// Key under which two files of one batch count as duplicates.
pub fn destination_key(date: &str, abbreviation: &str) -> String {
    format!("{}_{}", date, abbreviation)
}

/// `{date}_{abbreviation}.pdf`, or `{date}_{abbreviation}_{specific}.pdf`
/// with spaces in `specific` turned into underscores.
pub fn build_name(date: &str, abbreviation: &str, specific: Option<&str>) -> String {
    let name = match specific.map(str::trim).filter(|s| !s.is_empty()) {
        Some(specific) => format!(
            "{}_{}_{}.{}",
            date,
            abbreviation,
            specific.replace(' ', "_"),
            FILED_EXTENSION
        ),
        None => format!("{}_{}.{}", date, abbreviation, FILED_EXTENSION),
    };
    sanitize_filename(&name)
}

/// Replace characters that are not allowed in filenames.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c => c,
        })
        .collect()
}

/// `folder/filename` if free, else the first free `{stem} (n){ext}`.
pub fn resolve_collision(folder: &Path, filename: &str) -> PathBuf {
    let candidate = folder.join(filename);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, ext) = split_name(filename);
    let mut n = 1u32;
    loop {
        let candidate = folder.join(format!("{} ({}){}", stem, n, ext));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

/// Where an original goes in an archive folder: its own name if free,
/// otherwise the name with a `_YYYYMMDDHHMMSS` suffix, then a counter.
pub fn archive_path(folder: &Path, filename: &str, now: NaiveDateTime) -> PathBuf {
    let candidate = folder.join(filename);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, ext) = split_name(filename);
    let stamped = format!("{}_{}{}", stem, now.format("%Y%m%d%H%M%S"), ext);
    resolve_collision(folder, &stamped)
}

/// Split into stem and extension (extension keeps its dot).
fn split_name(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(idx) if idx > 0 => filename.split_at(idx),
        _ => (filename, ""),
    }
}
