// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Commit journal for undo support

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::Result;

/// One filed document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    /// Where the original was picked up
    pub original_path: PathBuf,
    /// Where the original was archived
    pub archived_path: PathBuf,
    /// The renamed copy in the category folder
    pub destination: PathBuf,
    pub category: String,
    /// blake3 of the copied content
    pub file_hash: String,
    pub undone: bool,
}

/// Append-only JSONL journal of commits
pub struct Journal {
    path: PathBuf,
}

impl Journal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Append an entry to the journal
    pub fn append(&self, entry: &JournalEntry) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let json = serde_json::to_string(entry)?;
        writeln!(file, "{}", json)?;

        Ok(())
    }

    /// Read all journal entries, oldest first
    pub fn read_all(&self) -> Result<Vec<JournalEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);

        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    warn!("Failed to parse journal entry: {}", e);
                }
            }
        }

        Ok(entries)
    }

    /// Get the most recent N entries (newest first)
    pub fn get_recent(&self, count: usize) -> Result<Vec<JournalEntry>> {
        let mut entries = self.read_all()?;
        entries.reverse();
        entries.truncate(count);
        Ok(entries)
    }

    /// Mark entries as undone
    pub fn mark_undone(&self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let entries = self.read_all()?;

        // Rewrite the entire file with the updated entries
        let file = File::create(&self.path)?;
        let mut writer = std::io::BufWriter::new(file);

        for mut entry in entries {
            if ids.contains(&entry.id) {
                entry.undone = true;
            }
            let json = serde_json::to_string(&entry)?;
            writeln!(writer, "{}", json)?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Entries that haven't been undone, newest first
    pub fn get_undoable(&self) -> Result<Vec<JournalEntry>> {
        let mut entries = self.read_all()?;
        entries.retain(|e| !e.undone);
        entries.reverse();
        Ok(entries)
    }

    /// Clear the journal
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Create a new journal entry
pub fn create_entry(
    original_path: PathBuf,
    archived_path: PathBuf,
    destination: PathBuf,
    category: String,
    file_hash: String,
) -> JournalEntry {
    JournalEntry {
        id: uuid::Uuid::new_v4().to_string(),
        timestamp: Utc::now(),
        original_path,
        archived_path,
        destination,
        category,
        file_hash,
        undone: false,
    }
}

/// Content hash used to recognize an untouched copy
pub fn calculate_file_hash(path: &Path) -> Result<String> {
    let data = std::fs::read(path)?;
    let hash = blake3::hash(&data);
    Ok(hash.to_hex().to_string())
}

/// What undoing one entry did, or would do on a dry run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoOutcome {
    /// Original restored; `removed_copy` is false when the filed copy was
    /// missing or had been changed since
    Restored { removed_copy: bool },
    Skipped(String),
}

#[derive(Debug, Clone)]
pub struct UndoAction {
    pub entry: JournalEntry,
    pub outcome: UndoOutcome,
}

/// Undo the `count` most recent commits that are not undone yet.
pub fn undo_recent(journal: &Journal, count: usize, dry_run: bool) -> Result<Vec<UndoAction>> {
    let mut actions = Vec::new();
    let mut undone_ids = Vec::new();

    for entry in journal.get_undoable()?.into_iter().take(count) {
        let outcome = undo_entry(&entry, dry_run);
        if matches!(outcome, UndoOutcome::Restored { .. }) && !dry_run {
            undone_ids.push(entry.id.clone());
        }
        actions.push(UndoAction { entry, outcome });
    }

    journal.mark_undone(&undone_ids)?;
    Ok(actions)
}

fn undo_entry(entry: &JournalEntry, dry_run: bool) -> UndoOutcome {
    if entry.original_path.exists() {
        return UndoOutcome::Skipped(format!("{:?} already exists", entry.original_path));
    }
    if !entry.archived_path.exists() {
        return UndoOutcome::Skipped(format!("archived original {:?} is missing", entry.archived_path));
    }

    let copy_matches = calculate_file_hash(&entry.destination)
        .map(|hash| hash == entry.file_hash)
        .unwrap_or(false);

    if dry_run {
        return UndoOutcome::Restored { removed_copy: copy_matches };
    }

    if let Err(e) = move_file(&entry.archived_path, &entry.original_path) {
        return UndoOutcome::Skipped(format!("could not restore original: {}", e));
    }
    info!("Restored {:?} -> {:?}", entry.archived_path, entry.original_path);

    let removed_copy = copy_matches
        && match fs::remove_file(&entry.destination) {
            Ok(()) => true,
            Err(e) => {
                warn!("Could not remove filed copy {:?}: {}", entry.destination, e);
                false
            }
        };
    if !copy_matches {
        warn!("Keeping {:?}, it is missing or was modified after filing", entry.destination);
    }

    UndoOutcome::Restored { removed_copy }
}

/// Rename, falling back to copy and delete across filesystems.
pub(crate) fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to)?;
    if let Err(e) = fs::remove_file(from) {
        // Do not leave two originals behind.
        let _ = fs::remove_file(to);
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    struct Filed {
        original: PathBuf,
        archived: PathBuf,
        copy: PathBuf,
    }

    fn file_one(root: &Path, journal: &Journal, name: &str, content: &[u8]) -> Filed {
        let sorted = root.join("sorted");
        let category = root.join("Invoices");
        fs::create_dir_all(&sorted).unwrap();
        fs::create_dir_all(&category).unwrap();

        let filed = Filed {
            original: root.join(name),
            archived: sorted.join(name),
            copy: category.join(format!("250101_INV_{}", name)),
        };
        fs::write(&filed.copy, content).unwrap();
        fs::write(&filed.archived, content).unwrap();
        let hash = calculate_file_hash(&filed.copy).unwrap();
        journal
            .append(&create_entry(
                filed.original.clone(),
                filed.archived.clone(),
                filed.copy.clone(),
                "invoices".to_string(),
                hash,
            ))
            .unwrap();
        filed
    }

    #[test]
    fn test_append_and_read() {
        let dir = tempdir().unwrap();
        let journal = Journal::new(dir.path().join("journal.jsonl"));
        assert!(journal.read_all().unwrap().is_empty());

        file_one(dir.path(), &journal, "a.pdf", b"a");
        file_one(dir.path(), &journal, "b.pdf", b"b");

        let recent = journal.get_recent(1).unwrap();
        assert_eq!(recent.len(), 1);
        assert!(recent[0].original_path.ends_with("b.pdf"));
        assert_eq!(journal.read_all().unwrap().len(), 2);

        journal.clear().unwrap();
        assert!(journal.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_undo_restores_and_removes_untouched_copy() {
        let dir = tempdir().unwrap();
        let journal = Journal::new(dir.path().join("journal.jsonl"));
        let filed = file_one(dir.path(), &journal, "a.pdf", b"content");

        let actions = undo_recent(&journal, 1, false).unwrap();
        assert_eq!(actions[0].outcome, UndoOutcome::Restored { removed_copy: true });
        assert!(filed.original.exists());
        assert!(!filed.archived.exists());
        assert!(!filed.copy.exists());
        assert!(journal.get_undoable().unwrap().is_empty());
    }

    #[test]
    fn test_undo_keeps_modified_copy() {
        let dir = tempdir().unwrap();
        let journal = Journal::new(dir.path().join("journal.jsonl"));
        let filed = file_one(dir.path(), &journal, "a.pdf", b"content");
        fs::write(&filed.copy, b"annotated").unwrap();

        let actions = undo_recent(&journal, 5, false).unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].outcome, UndoOutcome::Restored { removed_copy: false });
        assert!(filed.original.exists());
        assert!(filed.copy.exists());
    }

    #[test]
    fn test_dry_run_and_occupied_original() {
        let dir = tempdir().unwrap();
        let journal = Journal::new(dir.path().join("journal.jsonl"));
        let filed = file_one(dir.path(), &journal, "a.pdf", b"content");

        let actions = undo_recent(&journal, 1, true).unwrap();
        assert_eq!(actions[0].outcome, UndoOutcome::Restored { removed_copy: true });
        assert!(filed.archived.exists());
        assert_eq!(journal.get_undoable().unwrap().len(), 1);

        fs::write(&filed.original, b"someone else").unwrap();
        let actions = undo_recent(&journal, 1, false).unwrap();
        assert!(matches!(actions[0].outcome, UndoOutcome::Skipped(_)));
        assert_eq!(journal.get_undoable().unwrap().len(), 1);
    }
}
