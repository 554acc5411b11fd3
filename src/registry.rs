// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Category registry and its JSON store
//!
//! The registry is an ordered list of categories. Order matters: the
//! classifier breaks ties in favour of the category that comes first, and the
//! store keeps the order the categories were written in.

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

use crate::{DocketError, Result};

/// A filing category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEntry {
    /// Stable identity of the category
    pub name: String,
    /// Folder (relative to the working directory) that receives filed copies
    pub folder: String,
    /// Short code used in filenames, e.g. `INV`
    pub abbreviation: String,
    /// Keywords matched case-insensitively against document text
    pub keywords: Vec<String>,
}

impl CategoryEntry {
    /// Create a category with the default folder and abbreviation for `name`.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            folder: fallback_folder(&name),
            abbreviation: suggest_abbreviation(&name),
            name,
            keywords: Vec::new(),
        }
    }

    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = normalize_folder(&self.name, &folder.into());
        self
    }

    pub fn with_abbreviation(mut self, abbreviation: impl Into<String>) -> Self {
        let abbreviation = abbreviation.into();
        if !abbreviation.trim().is_empty() {
            self.abbreviation = abbreviation.trim().to_string();
        }
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    fn from_stored(name: &str, stored: StoredCategory) -> Self {
        let mut entry = Self::new(name).with_keywords(stored.keywords);
        if let Some(folder) = stored.folder {
            entry = entry.with_folder(folder);
        }
        if let Some(abbreviation) = stored.abbreviation {
            entry = entry.with_abbreviation(abbreviation);
        }
        entry
    }
}

/// On-disk shape of a category; the name is the map key.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredCategory {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    folder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    abbreviation: Option<String>,
    #[serde(default)]
    keywords: Vec<String>,
}

/// Ordered set of categories keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryRegistry {
    entries: Vec<CategoryEntry>,
}

impl CategoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from entries; a later entry with a repeated name
    /// replaces the earlier one in place.
    pub fn from_entries(entries: impl IntoIterator<Item = CategoryEntry>) -> Self {
        let mut registry = Self::new();
        for entry in entries {
            registry.upsert(entry);
        }
        registry
    }

    pub fn get(&self, name: &str) -> Option<&CategoryEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut CategoryEntry> {
        self.entries.iter_mut().find(|e| e.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Categories in registry order
    pub fn iter(&self) -> impl Iterator<Item = &CategoryEntry> {
        self.entries.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert a category, or replace the one with the same name keeping its position.
    pub fn upsert(&mut self, entry: CategoryEntry) {
        match self.entries.iter_mut().find(|e| e.name == entry.name) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<CategoryEntry> {
        let idx = self.entries.iter().position(|e| e.name == name)?;
        Some(self.entries.remove(idx))
    }

    /// Add a keyword to a category. Returns `false` if it was already present.
    pub fn add_keyword(&mut self, name: &str, keyword: &str) -> Result<bool> {
        let entry = self
            .get_mut(name)
            .ok_or_else(|| DocketError::UnknownCategory(name.to_string()))?;
        let keyword = keyword.trim();
        if keyword.is_empty() || entry.keywords.iter().any(|k| k.eq_ignore_ascii_case(keyword)) {
            return Ok(false);
        }
        entry.keywords.push(keyword.to_string());
        Ok(true)
    }

    /// Remove a keyword from a category. Returns `false` if it was not present.
    pub fn remove_keyword(&mut self, name: &str, keyword: &str) -> Result<bool> {
        let entry = self
            .get_mut(name)
            .ok_or_else(|| DocketError::UnknownCategory(name.to_string()))?;
        let before = entry.keywords.len();
        entry.keywords.retain(|k| !k.eq_ignore_ascii_case(keyword.trim()));
        Ok(entry.keywords.len() != before)
    }
}

/// JSON file holding the category registry.
pub struct CategoryStore {
    path: PathBuf,
}

impl CategoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the registry. A missing file is an empty registry.
    pub fn load(&self) -> Result<CategoryRegistry> {
        if !self.path.exists() {
            info!("Category file not found at {:?}, starting with no categories", self.path);
            return Ok(CategoryRegistry::new());
        }

        let content = std::fs::read_to_string(&self.path)?;
        let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&content)
            .map_err(|e| DocketError::Config(format!("Failed to parse categories: {}", e)))?;

        let mut registry = CategoryRegistry::new();
        for (name, value) in map {
            let stored: StoredCategory = serde_json::from_value(value).map_err(|e| {
                DocketError::Config(format!("Invalid category '{}': {}", name, e))
            })?;
            registry.upsert(CategoryEntry::from_stored(&name, stored));
        }

        debug!("Loaded {} categories from {:?}", registry.len(), self.path);
        Ok(registry)
    }

    /// Write the registry, keeping category order.
    pub fn save(&self, registry: &CategoryRegistry) -> Result<()> {
        let mut map = serde_json::Map::new();
        for entry in registry.iter() {
            let stored = StoredCategory {
                folder: Some(entry.folder.clone()),
                abbreviation: Some(entry.abbreviation.clone()),
                keywords: entry.keywords.clone(),
            };
            map.insert(entry.name.clone(), serde_json::to_value(stored)?);
        }
        let content = serde_json::to_string_pretty(&map)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// First character upper-cased, the rest lower-cased.
pub fn capitalize(name: &str) -> String {
    let mut chars = name.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Acronym for multi-word names, otherwise the first four letters upper-cased.
pub fn suggest_abbreviation(name: &str) -> String {
    let words: Vec<&str> = name.split_whitespace().collect();
    if words.len() > 1 {
        let acronym: String = words
            .iter()
            .filter_map(|w| w.chars().next())
            .flat_map(char::to_uppercase)
            .collect();
        if acronym.chars().count() >= 2 {
            return acronym;
        }
    }
    name.trim().to_uppercase().chars().take(4).collect()
}

/// Replace characters that are not allowed in folder names.
pub fn sanitize_folder_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect()
}

/// Folder used when a category has none of its own, or an unusable one.
pub fn fallback_folder(name: &str) -> String {
    let folder = sanitize_folder_name(&capitalize(name.trim()));
    if is_relative_folder(&folder) {
        folder
    } else {
        "Uncategorized".to_string()
    }
}

/// Whether `folder` stays below the directory it is joined onto.
fn is_relative_folder(folder: &str) -> bool {
    let path = Path::new(folder);
    path.components().next().is_some() && path.components().all(|c| matches!(c, Component::Normal(_)))
}

/// Flatten newlines, and fall back to the default folder when the result is
/// empty or would escape the working directory.
fn normalize_folder(name: &str, folder: &str) -> String {
    let folder = folder.replace(['\n', '\r'], " ");
    let folder = folder.trim();
    if folder.is_empty() {
        return fallback_folder(name);
    }
    if !is_relative_folder(folder) || folder.contains('\\') {
        warn!("Folder {:?} of category '{}' leaves the working directory, using the default", folder, name);
        return fallback_folder(name);
    }
    folder.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_resolved_once() {
        let entry = CategoryEntry::new("bank statements");
        assert_eq!(entry.folder, "Bank statements");
        assert_eq!(entry.abbreviation, "BS");
        assert!(entry.keywords.is_empty());

        let entry = CategoryEntry::new("invoices").with_folder("  \n").with_abbreviation(" ");
        assert_eq!(entry.folder, "Invoices");
        assert_eq!(entry.abbreviation, "INVO");
    }

    #[test]
    fn test_suggest_abbreviation() {
        assert_eq!(suggest_abbreviation("tax"), "TAX");
        assert_eq!(suggest_abbreviation("utilities"), "UTIL");
        assert_eq!(suggest_abbreviation("medical bills"), "MB");
    }

    #[test]
    fn test_folders_stay_inside_working_directory() {
        assert_eq!(CategoryEntry::new("tax").with_folder("/etc").folder, "Tax");
        assert_eq!(CategoryEntry::new("tax").with_folder("../outside").folder, "Tax");
        assert_eq!(CategoryEntry::new("tax").with_folder("Finance/../../x").folder, "Tax");
        assert_eq!(CategoryEntry::new("tax").with_folder("..\\up").folder, "Tax");
        assert_eq!(CategoryEntry::new("tax").with_folder("Finance/Tax").folder, "Finance/Tax");
        assert_eq!(CategoryEntry::new("a/b").folder, "A_b");
        assert_eq!(CategoryEntry::new("..").folder, "Uncategorized");
    }

    #[test]
    fn test_sanitize_folder_name() {
        assert_eq!(sanitize_folder_name("a/b:c*d?\"e<f>g|h\\i"), "a_b_c_d__e_f_g_h_i");
    }

    #[test]
    fn test_upsert_keeps_position() {
        let mut registry = CategoryRegistry::from_entries([
            CategoryEntry::new("a"),
            CategoryEntry::new("b"),
            CategoryEntry::new("c"),
        ]);
        registry.upsert(CategoryEntry::new("b").with_abbreviation("BEE"));
        assert_eq!(registry.names(), vec!["a", "b", "c"]);
        assert_eq!(registry.get("b").unwrap().abbreviation, "BEE");

        assert!(registry.remove("a").is_some());
        assert!(registry.remove("a").is_none());
        assert_eq!(registry.names(), vec!["b", "c"]);
    }

    #[test]
    fn test_keyword_edits() {
        let mut registry = CategoryRegistry::from_entries([CategoryEntry::new("bills")]);
        assert!(registry.add_keyword("bills", "electricity").unwrap());
        assert!(!registry.add_keyword("bills", "Electricity").unwrap());
        assert!(registry.remove_keyword("bills", "ELECTRICITY").unwrap());
        assert!(registry.get("bills").unwrap().keywords.is_empty());
        assert!(matches!(
            registry.add_keyword("nope", "x"),
            Err(DocketError::UnknownCategory(_))
        ));
    }

    #[test]
    fn test_store_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = CategoryStore::new(dir.path().join("categories.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_store_preserves_order_and_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("categories.json");
        std::fs::write(
            &path,
            r#"{
                "zeta": {"keywords": ["z"]},
                "Invoices": {"folder": "Invoices 2024", "abbreviation": "INV", "keywords": ["invoice", "amount due"]},
                "alpha": {}
            }"#,
        )
        .unwrap();

        let store = CategoryStore::new(&path);
        let registry = store.load().unwrap();
        assert_eq!(registry.names(), vec!["zeta", "Invoices", "alpha"]);
        assert_eq!(registry.get("zeta").unwrap().folder, "Zeta");
        assert_eq!(registry.get("zeta").unwrap().abbreviation, "ZETA");
        assert_eq!(registry.get("Invoices").unwrap().folder, "Invoices 2024");

        store.save(&registry).unwrap();
        let reloaded = store.load().unwrap();
        assert_eq!(reloaded, registry);
    }

    #[test]
    fn test_store_rejects_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("categories.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(matches!(CategoryStore::new(&path).load(), Err(DocketError::Config(_))));
    }
}
