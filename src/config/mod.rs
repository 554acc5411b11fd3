// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Configuration management for Docket

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::dates::DateFormat;

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AppConfig {
    /// Order of the 6-digit dates in filenames and manual input
    #[serde(default)]
    pub date_format: DateFormat,

    /// Directory holding the files to be filed
    #[serde(default = "default_inbox")]
    pub inbox: String,

    /// Category registry file
    #[serde(default = "default_categories_path")]
    pub categories_path: String,

    /// Archive folder names, relative to the inbox
    #[serde(default)]
    pub folders: FolderConfig,

    /// Batch analysis settings
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Commit journal settings
    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FolderConfig {
    /// Receives originals that were filed successfully
    #[serde(default = "default_sorted")]
    pub sorted: String,
    /// Receives originals that still need a human
    #[serde(default = "default_needs_processing")]
    pub needs_processing: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Pages of each document handed to the date and keyword search
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    /// Worker count; computed from available parallelism when unset
    #[serde(default)]
    pub workers: Option<usize>,
    /// Capacity of the result channel between workers and the driver
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Extensions picked up from the inbox
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct HistoryConfig {
    #[serde(default = "default_history_path")]
    pub path: String,
}

// Default value functions
fn default_inbox() -> String { ".".to_string() }
fn default_categories_path() -> String { "categories.json".to_string() }
fn default_sorted() -> String { "sorted".to_string() }
fn default_needs_processing() -> String { "needs_further_processing".to_string() }
fn default_max_pages() -> usize { 3 }
fn default_channel_capacity() -> usize { 64 }
fn default_extensions() -> Vec<String> { vec!["pdf".to_string()] }
fn default_history_path() -> String { "docket_history.jsonl".to_string() }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            date_format: DateFormat::default(),
            inbox: default_inbox(),
            categories_path: default_categories_path(),
            folders: FolderConfig::default(),
            analysis: AnalysisConfig::default(),
            history: HistoryConfig::default(),
        }
    }
}

impl Default for FolderConfig {
    fn default() -> Self {
        Self {
            sorted: default_sorted(),
            needs_processing: default_needs_processing(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            workers: None,
            channel_capacity: default_channel_capacity(),
            extensions: default_extensions(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: default_history_path(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| crate::DocketError::Config(format!("Failed to parse config: {}", e)))?;
            Ok(config)
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Problems that would stop a batch from running sensibly
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.analysis.max_pages == 0 {
            issues.push("analysis.max_pages must be at least 1".to_string());
        }
        if self.analysis.channel_capacity == 0 {
            issues.push("analysis.channel_capacity must be at least 1".to_string());
        }
        if self.analysis.workers == Some(0) {
            issues.push("analysis.workers must be at least 1 when set".to_string());
        }
        if self.analysis.extensions.is_empty() {
            issues.push("analysis.extensions is empty, no file would be picked up".to_string());
        }
        if self.folders.sorted.trim().is_empty() || self.folders.needs_processing.trim().is_empty() {
            issues.push("archive folder names must not be empty".to_string());
        }
        if self.folders.sorted.trim() == self.folders.needs_processing.trim() {
            issues.push("folders.sorted and folders.needs_processing must differ".to_string());
        }

        issues
    }

    pub fn inbox_dir(&self) -> PathBuf {
        PathBuf::from(&self.inbox)
    }

    pub fn categories_file(&self) -> PathBuf {
        PathBuf::from(&self.categories_path)
    }

    pub fn history_file(&self) -> PathBuf {
        PathBuf::from(&self.history.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("docket.json")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.analysis.max_pages, 3);
        assert_eq!(config.folders.needs_processing, "needs_further_processing");
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("docket.json");
        std::fs::write(&path, r#"{"date_format": "whatever", "analysis": {"workers": 2}}"#).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.date_format, DateFormat::Ddmmyy);
        assert_eq!(config.analysis.workers, Some(2));
        assert_eq!(config.analysis.extensions, vec!["pdf".to_string()]);
    }

    #[test]
    fn test_save_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("docket.json");
        let mut config = AppConfig::default();
        config.date_format = DateFormat::Yymmdd;
        config.save(&path).unwrap();
        assert_eq!(AppConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_validate_flags_bad_values() {
        let mut config = AppConfig::default();
        config.analysis.workers = Some(0);
        config.folders.sorted = "same".to_string();
        config.folders.needs_processing = "same".to_string();
        assert_eq!(config.validate().len(), 2);
    }
}
