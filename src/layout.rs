// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Folder layout of a working directory
//!
//! Everything lives under one root: the two archive folders for originals and
//! one folder per category for the filed copies.

use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::config::FolderConfig;
use crate::registry::{fallback_folder, CategoryEntry, CategoryRegistry};
use crate::Result;

/// Folders created by [`FolderLayout::ensure`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EnsureReport {
    /// Folders that did not exist before
    pub created: Vec<PathBuf>,
    /// `(category, folder)` pairs whose declared folder was replaced
    pub substituted: Vec<(String, String)>,
}

impl EnsureReport {
    /// Whether the registry was changed and should be saved
    pub fn registry_changed(&self) -> bool {
        !self.substituted.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct FolderLayout {
    root: PathBuf,
    sorted: PathBuf,
    needs_processing: PathBuf,
}

impl FolderLayout {
    pub fn new(root: impl Into<PathBuf>, folders: &FolderConfig) -> Self {
        let root = root.into();
        Self {
            sorted: root.join(folders.sorted.trim()),
            needs_processing: root.join(folders.needs_processing.trim()),
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Archive folder for originals that were filed
    pub fn sorted(&self) -> &Path {
        &self.sorted
    }

    /// Archive folder for originals that still need a human
    pub fn needs_processing(&self) -> &Path {
        &self.needs_processing
    }

    pub fn category_dir(&self, entry: &CategoryEntry) -> PathBuf {
        self.root.join(&entry.folder)
    }

    /// Create the archive folders and every category folder.
    ///
    /// A category folder that cannot be created is replaced by one named after
    /// the sanitized, capitalized category name, and the registry is updated
    /// to match. Failing that too is an error.
    pub fn ensure(&self, registry: &mut CategoryRegistry) -> Result<EnsureReport> {
        let mut report = EnsureReport::default();

        for dir in [&self.sorted, &self.needs_processing] {
            if create_if_missing(dir)? {
                report.created.push(dir.clone());
            }
        }

        let names: Vec<String> = registry.names().into_iter().map(String::from).collect();
        for name in names {
            let Some(entry) = registry.get_mut(&name) else {
                continue;
            };
            let dir = self.root.join(&entry.folder);

            match create_if_missing(&dir) {
                Ok(true) => report.created.push(dir),
                Ok(false) => {}
                Err(e) => {
                    let fallback = fallback_folder(&name);
                    warn!(
                        "Could not create folder {:?} for category '{}' ({}), using '{}'",
                        dir, name, e, fallback
                    );

                    let fallback_dir = self.root.join(&fallback);
                    match create_if_missing(&fallback_dir) {
                        Ok(created) => {
                            if created {
                                report.created.push(fallback_dir);
                            }
                            entry.folder = fallback.clone();
                            report.substituted.push((name, fallback));
                        }
                        Err(e) => {
                            error!("Could not create fallback folder {:?}: {}", fallback_dir, e);
                            return Err(e);
                        }
                    }
                }
            }
        }

        Ok(report)
    }
}

/// Returns whether the directory had to be created.
fn create_if_missing(dir: &Path) -> Result<bool> {
    if dir.is_dir() {
        return Ok(false);
    }
    std::fs::create_dir_all(dir)?;
    info!("Created folder: {:?}", dir);
    Ok(true)
}
