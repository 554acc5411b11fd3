// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Batch pipeline: concurrent analysis, manual resolution, sequential commit
//!
//! Analysis fans the input out over a fixed pool of blocking workers which
//! push one [`AnalysisResult`] per file into a bounded channel. The driver
//! consumes that channel through an [`AnalysisRun`], either by polling
//! ([`AnalysisRun::drain`]) or by awaiting results one at a time, and gets a
//! [`Batch`] back once every worker is done. Ambiguous files are answered
//! through the batch's [`ManualQueue`] before the batch is handed to a
//! [`Committer`].

pub mod commit;
pub mod resolve;

pub use commit::{BatchOutcome, BatchReport, BatchSummary, Committer, FileReport, FiledDocument};
pub use resolve::{Batch, BatchEntry, Decision, ManualOverlay, ManualQueue, ManualRequest, Route};

use chrono::NaiveDate;
use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{debug, info, warn};

use crate::classify::classify;
use crate::config::AnalysisConfig;
use crate::dates;
use crate::extractors::TextExtractor;
use crate::registry::CategoryRegistry;

/// Upper bound on the analysis pool
pub const MAX_WORKERS: usize = 8;

/// Everything one analysis run needs. Not modified by the run.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub files: Vec<PathBuf>,
    pub registry: Arc<CategoryRegistry>,
    pub max_pages: usize,
    /// Pool size; [`default_worker_count`] when unset
    pub workers: Option<usize>,
    pub channel_capacity: usize,
}

impl AnalysisRequest {
    pub fn new(files: Vec<PathBuf>, registry: Arc<CategoryRegistry>) -> Self {
        Self::from_config(files, registry, &AnalysisConfig::default())
    }

    pub fn from_config(files: Vec<PathBuf>, registry: Arc<CategoryRegistry>, config: &AnalysisConfig) -> Self {
        Self {
            files,
            registry,
            max_pages: config.max_pages,
            workers: config.workers,
            channel_capacity: config.channel_capacity,
        }
    }
}

/// What analysis found out about one file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    /// Position in the request's file list
    pub index: usize,
    pub source: PathBuf,
    #[serde(skip)]
    pub text: String,
    pub detected_date: Option<NaiveDate>,
    pub detected_category: Option<String>,
    /// Number of the category's keywords found in the text
    pub confidence: usize,
    pub error: Option<String>,
}

impl AnalysisResult {
    fn failed(index: usize, source: PathBuf, error: impl Into<String>) -> Self {
        Self {
            index,
            source,
            text: String::new(),
            detected_date: None,
            detected_category: None,
            confidence: 0,
            error: Some(error.into()),
        }
    }

    /// Whether a human has to supply the category or date
    pub fn needs_manual(&self) -> bool {
        self.error.is_some()
            || self.detected_date.is_none()
            || self.detected_category.is_none()
            || self.confidence < 1
    }
}

/// Analyze a single file: extract text, find a date (content first, then
/// the filename) and pick a category.
pub fn analyze_file(
    index: usize,
    path: &Path,
    registry: &CategoryRegistry,
    extractor: &dyn TextExtractor,
    max_pages: usize,
    today: NaiveDate,
) -> AnalysisResult {
    if !path.is_file() {
        return AnalysisResult::failed(index, path.to_path_buf(), "file not found");
    }

    let text = extractor.extract(path, max_pages);
    let detected_date = dates::extract_from_text_on(&text, today).or_else(|| {
        path.file_name()
            .and_then(|n| n.to_str())
            .and_then(dates::extract_from_filename)
    });
    let classification = classify(&text, registry);

    debug!(
        "Analyzed {:?}: date={:?} category={:?} confidence={}",
        path, detected_date, classification.category, classification.confidence
    );

    AnalysisResult {
        index,
        source: path.to_path_buf(),
        text,
        detected_date,
        detected_category: classification.category,
        confidence: classification.confidence,
        error: None,
    }
}

/// One less than the available cores, between 1 and [`MAX_WORKERS`].
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_sub(1)
        .clamp(1, MAX_WORKERS)
}

/// Shared stop flag for a running analysis
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop dispatching new files. Files already being analyzed finish.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs analyses with an injected text extractor
pub struct BatchPipeline {
    extractor: Arc<dyn TextExtractor>,
}

impl BatchPipeline {
    pub fn new(extractor: Arc<dyn TextExtractor>) -> Self {
        Self { extractor }
    }

    /// Start analyzing. Must be called inside a tokio runtime.
    pub fn analyze(&self, request: AnalysisRequest) -> AnalysisRun {
        self.analyze_with_cancel(request, CancelHandle::new())
    }

    /// Start analyzing with a caller-owned cancel flag.
    pub fn analyze_with_cancel(&self, request: AnalysisRequest, cancel: CancelHandle) -> AnalysisRun {
        let total = request.files.len();
        let workers = request
            .workers
            .unwrap_or_else(default_worker_count)
            .clamp(1, MAX_WORKERS)
            .min(total.max(1));
        let (tx, rx) = mpsc::channel(request.channel_capacity.max(1));
        let today = chrono::Local::now().date_naive();

        info!("Analyzing {} files with {} workers", total, workers);

        // Round-robin partition: worker w owns files w, w + n, w + 2n, ...
        let mut shares: Vec<Vec<(usize, PathBuf)>> = vec![Vec::new(); workers];
        for (index, path) in request.files.iter().enumerate() {
            shares[index % workers].push((index, path.clone()));
        }

        for share in shares.into_iter().filter(|s| !s.is_empty()) {
            let tx = tx.clone();
            let cancel = cancel.clone();
            let registry = Arc::clone(&request.registry);
            let extractor = Arc::clone(&self.extractor);
            let max_pages = request.max_pages;

            tokio::task::spawn_blocking(move || {
                for (index, path) in share {
                    if cancel.is_cancelled() {
                        debug!("Worker stopping, analysis cancelled");
                        break;
                    }

                    let result = catch_unwind(AssertUnwindSafe(|| {
                        analyze_file(index, &path, &registry, extractor.as_ref(), max_pages, today)
                    }))
                    .unwrap_or_else(|panic| {
                        let message = panic_message(panic.as_ref());
                        warn!("Analysis of {:?} panicked: {}", path, message);
                        AnalysisResult::failed(index, path.clone(), format!("analysis panicked: {}", message))
                    });

                    // Receiver gone: nobody is listening any more.
                    if tx.blocking_send(result).is_err() {
                        break;
                    }
                }
            });
        }

        AnalysisRun {
            rx,
            cancel,
            total,
            received: Vec::with_capacity(total),
            finished: false,
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Progress of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub done: usize,
    pub total: usize,
}

/// Result of a non-blocking poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainStatus {
    /// Workers are still running; `received` results arrived with this poll
    Pending { received: usize },
    /// Every worker is done and every result has been consumed
    Finished { received: usize },
}

/// A running analysis, consumed by a single driver
pub struct AnalysisRun {
    rx: mpsc::Receiver<AnalysisResult>,
    cancel: CancelHandle,
    total: usize,
    received: Vec<AnalysisResult>,
    finished: bool,
}

impl AnalysisRun {
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn progress(&self) -> Progress {
        Progress {
            done: self.received.len(),
            total: self.total,
        }
    }

    /// Results received so far, in arrival order
    pub fn received(&self) -> &[AnalysisResult] {
        &self.received
    }

    /// Take everything currently queued without waiting.
    pub fn drain(&mut self) -> DrainStatus {
        let mut received = 0;
        loop {
            match self.rx.try_recv() {
                Ok(result) => {
                    self.received.push(result);
                    received += 1;
                }
                Err(TryRecvError::Empty) => return DrainStatus::Pending { received },
                Err(TryRecvError::Disconnected) => {
                    self.finished = true;
                    return DrainStatus::Finished { received };
                }
            }
        }
    }

    /// Wait for the next result. `None` once all workers are done and the
    /// queue is empty.
    pub async fn next(&mut self) -> Option<&AnalysisResult> {
        if self.finished {
            return None;
        }
        match self.rx.recv().await {
            Some(result) => {
                self.received.push(result);
                self.received.last()
            }
            None => {
                self.finished = true;
                None
            }
        }
    }

    /// Wait for the remaining results and build the batch in input order.
    pub async fn finish(mut self) -> Batch {
        while self.next().await.is_some() {}

        let cancelled = self.cancel.is_cancelled();
        let mut results = std::mem::take(&mut self.received);
        results.sort_by_key(|r| r.index);

        info!(
            "Analysis finished: {} of {} files{}",
            results.len(),
            self.total,
            if cancelled { " (cancelled)" } else { "" }
        );
        Batch::from_results(results, self.total, cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::CategoryEntry;
    use std::sync::Mutex;
    use tempfile::{tempdir, TempDir};

    /// Returns the file's own bytes as text.
    struct FileText;

    impl TextExtractor for FileText {
        fn extract(&self, path: &Path, _max_pages: usize) -> String {
            std::fs::read_to_string(path).unwrap_or_default()
        }
    }

    /// Cancels the run while extracting the file at `trigger`.
    struct CancelOn {
        trigger: usize,
        cancel: CancelHandle,
        seen: Mutex<usize>,
    }

    impl TextExtractor for CancelOn {
        fn extract(&self, path: &Path, max_pages: usize) -> String {
            let mut seen = self.seen.lock().unwrap();
            if *seen == self.trigger {
                self.cancel.cancel();
            }
            *seen += 1;
            FileText.extract(path, max_pages)
        }
    }

    struct Panics;

    impl TextExtractor for Panics {
        fn extract(&self, _path: &Path, _max_pages: usize) -> String {
            panic!("corrupt stream");
        }
    }

    fn registry() -> Arc<CategoryRegistry> {
        Arc::new(CategoryRegistry::from_entries([
            CategoryEntry::new("invoices").with_abbreviation("INV").with_keywords(["invoice"]),
            CategoryEntry::new("bank").with_keywords(["statement", "balance"]),
        ]))
    }

    fn inbox(files: &[(&str, &str)]) -> (TempDir, Vec<PathBuf>) {
        let dir = tempdir().unwrap();
        let paths = files
            .iter()
            .map(|(name, text)| {
                let path = dir.path().join(name);
                std::fs::write(&path, text).unwrap();
                path
            })
            .collect();
        (dir, paths)
    }

    #[test]
    fn test_analyze_file_routes() {
        let (_dir, paths) = inbox(&[
            ("a.pdf", "Invoice dated 2023-11-05"),
            ("310125_scan.pdf", "Invoice, no date in here"),
            ("b.pdf", "A letter from grandma"),
        ]);
        let today = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        let reg = registry();

        let a = analyze_file(0, &paths[0], &reg, &FileText, 3, today);
        assert_eq!(a.detected_date, NaiveDate::from_ymd_opt(2023, 11, 5));
        assert_eq!(a.detected_category.as_deref(), Some("invoices"));
        assert!(!a.needs_manual());

        let b = analyze_file(1, &paths[1], &reg, &FileText, 3, today);
        assert_eq!(b.detected_date, NaiveDate::from_ymd_opt(2025, 1, 31));

        let c = analyze_file(2, &paths[2], &reg, &FileText, 3, today);
        assert_eq!(c.confidence, 0);
        assert!(c.needs_manual());

        let missing = analyze_file(3, Path::new("/nonexistent/x.pdf"), &reg, &FileText, 3, today);
        assert!(missing.error.is_some());
        assert!(missing.needs_manual());
    }

    #[test]
    fn test_default_worker_count_bounds() {
        let n = default_worker_count();
        assert!((1..=MAX_WORKERS).contains(&n));
    }

    #[tokio::test]
    async fn test_finish_restores_input_order() {
        let files: Vec<(String, String)> = (0..7)
            .map(|i| (format!("{i}.pdf"), format!("invoice 0{}/01/2024", i + 1)))
            .collect();
        let refs: Vec<(&str, &str)> = files.iter().map(|(a, b)| (a.as_str(), b.as_str())).collect();
        let (_dir, paths) = inbox(&refs);

        let mut request = AnalysisRequest::new(paths.clone(), registry());
        request.workers = Some(3);
        request.channel_capacity = 2;

        let batch = BatchPipeline::new(Arc::new(FileText)).analyze(request).finish().await;
        assert_eq!(batch.len(), 7);
        assert!(!batch.cancelled());
        let sources: Vec<_> = batch.entries().iter().map(|e| e.result.source.clone()).collect();
        assert_eq!(sources, paths);
    }

    #[tokio::test]
    async fn test_next_and_drain_see_every_result() {
        let (_dir, paths) = inbox(&[("a.pdf", "invoice"), ("b.pdf", "statement"), ("c.pdf", "")]);
        let mut run = BatchPipeline::new(Arc::new(FileText)).analyze(AnalysisRequest::new(paths, registry()));

        assert!(run.next().await.is_some());
        loop {
            match run.drain() {
                DrainStatus::Finished { .. } => break,
                DrainStatus::Pending { .. } => tokio::task::yield_now().await,
            }
        }
        assert_eq!(run.progress(), Progress { done: 3, total: 3 });
        assert!(run.next().await.is_none());
        assert_eq!(run.finish().await.len(), 3);
    }

    #[tokio::test]
    async fn test_cancel_stops_dispatch_and_keeps_queued_results() {
        let files: Vec<(String, String)> = (0..5).map(|i| (format!("{i}.pdf"), "invoice".to_string())).collect();
        let refs: Vec<(&str, &str)> = files.iter().map(|(a, b)| (a.as_str(), b.as_str())).collect();
        let (_dir, paths) = inbox(&refs);

        let cancel = CancelHandle::new();
        let extractor = Arc::new(CancelOn {
            trigger: 1,
            cancel: cancel.clone(),
            seen: Mutex::new(0),
        });
        let mut request = AnalysisRequest::new(paths, registry());
        request.workers = Some(1);

        let batch = BatchPipeline::new(extractor)
            .analyze_with_cancel(request, cancel)
            .finish()
            .await;

        assert!(batch.cancelled());
        // The file being analyzed when the flag went up still comes through.
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.not_analyzed(), 3);
    }

    #[tokio::test]
    async fn test_panicking_extractor_becomes_error_record() {
        let (_dir, paths) = inbox(&[("a.pdf", "invoice 01/02/2024")]);
        let batch = BatchPipeline::new(Arc::new(Panics))
            .analyze(AnalysisRequest::new(paths, registry()))
            .finish()
            .await;

        let entry = &batch.entries()[0];
        assert!(entry.result.error.as_deref().unwrap_or("").contains("corrupt stream"));
        assert_eq!(entry.route, Route::Manual);
    }

    #[tokio::test]
    async fn test_empty_request() {
        let batch = BatchPipeline::new(Arc::new(FileText))
            .analyze(AnalysisRequest::new(Vec::new(), registry()))
            .finish()
            .await;
        assert!(batch.is_empty());
    }
}
