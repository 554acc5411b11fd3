// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Sequential commit of a resolved batch
//!
//! Files are handled strictly one after another in batch order. A filed file
//! is first copied into its category folder and only then is the original
//! moved into the "sorted" archive, so a failure part-way never loses the
//! document. Every failure is turned into an outcome for that file; nothing
//! aborts the batch.

use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use super::{Batch, BatchEntry, Route};
use crate::dates::DateFormat;
use crate::history::{self, calculate_file_hash, move_file, Journal};
use crate::layout::FolderLayout;
use crate::naming::{archive_path, build_name, destination_key, resolve_collision};
use crate::registry::{CategoryEntry, CategoryRegistry};
use crate::{DocketError, Result};

/// What happened to one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchOutcome {
    Committed {
        destination: PathBuf,
        /// Another file of this batch already went to the same date and category
        duplicate: bool,
        /// Where the original ended up; `None` if it could not be moved
        archived: Option<PathBuf>,
        /// The sorted archive was unusable and the original went to the needs folder
        original_in_needs: bool,
    },
    NeedsManualFolder {
        reason: String,
        archived: PathBuf,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub source: PathBuf,
    #[serde(flatten)]
    pub outcome: BatchOutcome,
}

impl FileReport {
    /// One human-readable line for the processing log
    pub fn log_line(&self) -> String {
        let name = display_name(&self.source);
        match &self.outcome {
            BatchOutcome::Committed {
                destination,
                duplicate,
                archived,
                original_in_needs,
            } => {
                let mut line = format!("{} → {}", name, relative_display(destination));
                if *duplicate {
                    line.push_str(" (duplicate)");
                }
                if archived.is_none() {
                    line.push_str(" (original left in place)");
                } else if *original_in_needs {
                    line.push_str(" (original in needs further processing)");
                }
                line
            }
            BatchOutcome::NeedsManualFolder { reason, .. } => {
                format!("{} → Needs further processing ({})", name, reason)
            }
            BatchOutcome::Failed { error } => format!("{} → Failed: {}", name, error),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub processed: usize,
    pub categorized: usize,
    pub duplicates: usize,
    pub needs_processing: usize,
    pub failed: usize,
    /// Left untouched because analysis was cancelled before reaching them
    pub not_analyzed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub summary: BatchSummary,
    pub files: Vec<FileReport>,
    pub cancelled: bool,
}

impl BatchReport {
    pub fn log_lines(&self) -> Vec<String> {
        self.files.iter().map(FileReport::log_line).collect()
    }

    /// Summary block followed by the per-file log
    pub fn render(&self) -> String {
        let s = &self.summary;
        let mut out = String::new();
        out.push_str("Processing Summary:\n");
        out.push_str(&format!("  Total files processed: {}\n", s.processed));
        out.push_str(&format!("  Successfully categorized: {}\n", s.categorized));
        out.push_str(&format!("  Duplicates detected: {}\n", s.duplicates));
        out.push_str(&format!("  Needs further processing: {}\n", s.needs_processing));
        if s.failed > 0 {
            out.push_str(&format!("  Failed: {}\n", s.failed));
        }
        if self.cancelled {
            out.push_str(&format!("  Cancelled, not analyzed: {}\n", s.not_analyzed));
        }
        out.push_str("\nDetailed Log:\n");
        for line in self.log_lines() {
            out.push_str(&line);
            out.push('\n');
        }
        out
    }

    /// Write the rendered report with a timestamped header.
    pub fn save_log(&self, path: &Path) -> Result<()> {
        let header = format!(
            "Docket processing log - {}\n{}\n\n",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            "=".repeat(40)
        );
        fs::write(path, header + &self.render())?;
        info!("Processing log saved to {:?}", path);
        Ok(())
    }
}

/// A document filed through [`Committer::file_one`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FiledDocument {
    pub destination: PathBuf,
    pub archived: Option<PathBuf>,
}

/// Where an entry is going and under which name
struct Target<'r> {
    category: &'r CategoryEntry,
    date: String,
}

/// Applies batches to the filesystem
pub struct Committer<'a> {
    registry: &'a CategoryRegistry,
    layout: &'a FolderLayout,
    format: DateFormat,
    journal: Option<&'a Journal>,
}

impl<'a> Committer<'a> {
    pub fn new(registry: &'a CategoryRegistry, layout: &'a FolderLayout, format: DateFormat) -> Self {
        Self {
            registry,
            layout,
            format,
            journal: None,
        }
    }

    /// Record every filed document in `journal`
    pub fn with_journal(mut self, journal: &'a Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Commit every entry of `batch` in order.
    pub fn commit(&self, batch: Batch) -> BatchReport {
        let cancelled = batch.cancelled();
        let mut summary = BatchSummary {
            not_analyzed: batch.not_analyzed(),
            ..BatchSummary::default()
        };
        let mut seen_keys = HashSet::new();
        let mut files = Vec::with_capacity(batch.len());
        let now = Local::now().naive_local();

        for entry in batch.into_entries() {
            let source = entry.result.source.clone();
            let outcome = match self.target(&entry) {
                Ok(target) => {
                    let key = destination_key(&target.date, &target.category.abbreviation);
                    let duplicate = !seen_keys.insert(key);
                    self.file_entry(&source, &target, duplicate, now)
                }
                Err(reason) => self.to_needs_folder(&source, reason, now),
            };

            summary.processed += 1;
            match &outcome {
                BatchOutcome::Committed { duplicate, .. } => {
                    summary.categorized += 1;
                    if *duplicate {
                        summary.duplicates += 1;
                    }
                }
                BatchOutcome::NeedsManualFolder { .. } => summary.needs_processing += 1,
                BatchOutcome::Failed { .. } => summary.failed += 1,
            }

            let report = FileReport { source, outcome };
            info!("{}", report.log_line());
            files.push(report);
        }

        BatchReport {
            summary,
            files,
            cancelled,
        }
    }

    /// File a single document by hand, outside of any batch.
    pub fn file_one(
        &self,
        source: &Path,
        category: &str,
        date: &str,
        specific: Option<&str>,
    ) -> Result<FiledDocument> {
        let entry = self
            .registry
            .get(category)
            .ok_or_else(|| DocketError::UnknownCategory(category.to_string()))?;
        let date = date.trim();
        self.format.parse(date)?;

        if !source.is_file() {
            return Err(DocketError::FileSystem(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{:?} does not exist", source),
            )));
        }

        let folder = self.layout.category_dir(entry);
        fs::create_dir_all(&folder)?;
        let destination = resolve_collision(&folder, &build_name(date, &entry.abbreviation, specific));
        fs::copy(source, &destination)?;
        info!("Copied {:?} -> {:?}", source, destination);

        let archived = self.archive(source, self.layout.sorted(), Local::now().naive_local());
        if let Some(archived) = &archived {
            self.record(source, archived, &destination, &entry.name);
        }

        Ok(FiledDocument {
            destination,
            archived,
        })
    }

    /// Category and date to file under, or why the entry goes to the needs folder.
    fn target(&self, entry: &BatchEntry) -> std::result::Result<Target<'a>, String> {
        if entry.overlay.skip {
            return Err(match &entry.result.error {
                Some(error) => format!("skipped, error: {}", error),
                None => "skipped".to_string(),
            });
        }

        let (category, date) = match entry.route {
            Route::Auto => (
                entry.result.detected_category.clone(),
                entry.result.detected_date.map(|d| self.format.render(d)),
            ),
            Route::Manual => (entry.overlay.manual_category.clone(), entry.overlay.manual_date.clone()),
        };

        let (Some(category), Some(date)) = (category, date) else {
            return Err(match &entry.result.error {
                Some(error) => format!("error: {}", error),
                None => "not resolved".to_string(),
            });
        };

        let category = self
            .registry
            .get(&category)
            .ok_or_else(|| format!("unknown category '{}'", category))?;
        Ok(Target { category, date })
    }

    fn file_entry(&self, source: &Path, target: &Target<'_>, duplicate: bool, now: NaiveDateTime) -> BatchOutcome {
        if !source.is_file() {
            return BatchOutcome::Failed {
                error: "source file no longer exists".to_string(),
            };
        }

        let folder = self.layout.category_dir(target.category);
        if let Err(e) = fs::create_dir_all(&folder) {
            return self.to_needs_folder(source, format!("cannot create {:?}: {}", folder, e), now);
        }

        let filename = build_name(&target.date, &target.category.abbreviation, None);
        let destination = resolve_collision(&folder, &filename);
        if let Err(e) = fs::copy(source, &destination) {
            warn!("Copy of {:?} to {:?} failed: {}", source, destination, e);
            return self.to_needs_folder(source, format!("copy failed: {}", e), now);
        }

        // The copy exists from here on; moving the original is best effort.
        let mut original_in_needs = false;
        let archived = self.archive(source, self.layout.sorted(), now).or_else(|| {
            let fallback = self.archive(source, self.layout.needs_processing(), now);
            original_in_needs = fallback.is_some();
            fallback
        });
        if let Some(archived) = &archived {
            self.record(source, archived, &destination, &target.category.name);
        }

        BatchOutcome::Committed {
            destination,
            duplicate,
            archived,
            original_in_needs,
        }
    }

    fn to_needs_folder(&self, source: &Path, reason: String, now: NaiveDateTime) -> BatchOutcome {
        match self.try_archive(source, self.layout.needs_processing(), now) {
            Ok(archived) => BatchOutcome::NeedsManualFolder { reason, archived },
            Err(e) => {
                error!("{:?} stays in place: {}; moving it also failed: {}", source, reason, e);
                BatchOutcome::Failed {
                    error: format!("{}; could not move to needs further processing: {}", reason, e),
                }
            }
        }
    }

    fn archive(&self, source: &Path, folder: &Path, now: NaiveDateTime) -> Option<PathBuf> {
        match self.try_archive(source, folder, now) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Could not move {:?} into {:?}: {}", source, folder, e);
                None
            }
        }
    }

    fn try_archive(&self, source: &Path, folder: &Path, now: NaiveDateTime) -> std::io::Result<PathBuf> {
        fs::create_dir_all(folder)?;
        let filename = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "file has no name"))?;
        let target = archive_path(folder, filename, now);
        move_file(source, &target)?;
        Ok(target)
    }

    fn record(&self, source: &Path, archived: &Path, destination: &Path, category: &str) {
        let Some(journal) = self.journal else {
            return;
        };
        let result = calculate_file_hash(destination).and_then(|hash| {
            journal.append(&history::create_entry(
                source.to_path_buf(),
                archived.to_path_buf(),
                destination.to_path_buf(),
                category.to_string(),
                hash,
            ))
        });
        if let Err(e) = result {
            warn!("Could not record {:?} in the journal: {}", destination, e);
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// `folder/name` of a destination
fn relative_display(path: &Path) -> String {
    match path.parent().and_then(|p| p.file_name()) {
        Some(folder) => format!("{}/{}", folder.to_string_lossy(), display_name(path)),
        None => display_name(path),
    }
}
