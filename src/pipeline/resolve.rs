// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Routing of analyzed files and the manual resolution queue

use serde::Serialize;
use std::collections::VecDeque;
use std::path::PathBuf;

use super::AnalysisResult;
use crate::dates::DateFormat;
use crate::error::ValidationError;
use crate::registry::CategoryRegistry;

/// Characters of extracted text shown alongside a manual request
const PREVIEW_CHARS: usize = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    /// Date and category were found with confidence
    Auto,
    /// A human has to supply the category and date
    Manual,
}

/// Values supplied during manual resolution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ManualOverlay {
    pub manual_category: Option<String>,
    /// Six-digit date in the active format, already validated
    pub manual_date: Option<String>,
    pub skip: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchEntry {
    pub result: AnalysisResult,
    pub route: Route,
    pub overlay: ManualOverlay,
}

impl BatchEntry {
    fn new(result: AnalysisResult) -> Self {
        let route = if result.needs_manual() {
            Route::Manual
        } else {
            Route::Auto
        };
        Self {
            result,
            route,
            overlay: ManualOverlay::default(),
        }
    }

    /// Manual entry that was given a category and a date
    pub fn is_resolved(&self) -> bool {
        !self.overlay.skip && self.overlay.manual_category.is_some() && self.overlay.manual_date.is_some()
    }
}

/// Analyzed files in input order, ready for resolution and commit
#[derive(Debug, Clone)]
pub struct Batch {
    entries: Vec<BatchEntry>,
    total: usize,
    cancelled: bool,
}

impl Batch {
    /// Route each result. `total` is the number of files that were requested.
    pub fn from_results(results: Vec<AnalysisResult>, total: usize, cancelled: bool) -> Self {
        Self {
            entries: results.into_iter().map(BatchEntry::new).collect(),
            total,
            cancelled,
        }
    }

    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    pub(crate) fn into_entries(self) -> Vec<BatchEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cancelled(&self) -> bool {
        self.cancelled
    }

    /// Requested files that were never analyzed because the run was cancelled
    pub fn not_analyzed(&self) -> usize {
        self.total.saturating_sub(self.entries.len())
    }

    pub fn manual_count(&self) -> usize {
        self.entries.iter().filter(|e| e.route == Route::Manual).count()
    }

    pub fn auto_count(&self) -> usize {
        self.entries.len() - self.manual_count()
    }

    /// Queue over the entries routed to manual resolution
    pub fn manual_queue<'a>(&'a mut self, registry: &'a CategoryRegistry, format: DateFormat) -> ManualQueue<'a> {
        let pending = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.route == Route::Manual && !e.overlay.skip && !e.is_resolved())
            .map(|(i, _)| i)
            .collect();
        ManualQueue {
            batch: self,
            registry,
            format,
            pending,
            answered: 0,
        }
    }
}

/// One file waiting for a human decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualRequest {
    /// 1-based position among the manual requests of this batch
    pub position: usize,
    pub total: usize,
    pub source: PathBuf,
    pub suggested_category: Option<String>,
    /// Detected date rendered in the active format
    pub suggested_date: Option<String>,
    pub error: Option<String>,
    pub text_preview: String,
}

/// Answer to a [`ManualRequest`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Process { category: String, date: String },
    Skip,
}

/// Pull-based queue of manual requests.
///
/// The current request stays at the head until it is answered with a valid
/// decision; an invalid one is returned as a [`ValidationError`] for the
/// caller to correct.
pub struct ManualQueue<'a> {
    batch: &'a mut Batch,
    registry: &'a CategoryRegistry,
    format: DateFormat,
    pending: VecDeque<usize>,
    answered: usize,
}

impl ManualQueue<'_> {
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    pub fn next_request(&self) -> Option<ManualRequest> {
        let idx = *self.pending.front()?;
        let result = &self.batch.entries[idx].result;

        Some(ManualRequest {
            position: self.answered + 1,
            total: self.answered + self.pending.len(),
            source: result.source.clone(),
            suggested_category: result.detected_category.clone(),
            suggested_date: result.detected_date.map(|d| self.format.render(d)),
            error: result.error.clone(),
            text_preview: result.text.chars().take(PREVIEW_CHARS).collect(),
        })
    }

    /// Answer the current request.
    pub fn answer(&mut self, decision: Decision) -> Result<(), ValidationError> {
        let Some(&idx) = self.pending.front() else {
            return Ok(());
        };

        let overlay = match decision {
            Decision::Skip => ManualOverlay {
                skip: true,
                ..ManualOverlay::default()
            },
            Decision::Process { category, date } => {
                let category = category.trim();
                if category.is_empty() {
                    return Err(ValidationError::EmptyCategory);
                }
                if !self.registry.contains(category) {
                    return Err(ValidationError::UnknownCategory(category.to_string()));
                }
                let date = date.trim();
                self.format.parse(date)?;

                ManualOverlay {
                    manual_category: Some(category.to_string()),
                    manual_date: Some(date.to_string()),
                    skip: false,
                }
            }
        };

        self.batch.entries[idx].overlay = overlay;
        self.pending.pop_front();
        self.answered += 1;
        Ok(())
    }

    /// Skip every remaining request.
    pub fn decline_all(&mut self) {
        while let Some(idx) = self.pending.pop_front() {
            self.batch.entries[idx].overlay.skip = true;
            self.answered += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::CategoryEntry;
    use chrono::NaiveDate;

    fn result(index: usize, date: Option<NaiveDate>, category: Option<&str>, confidence: usize) -> AnalysisResult {
        AnalysisResult {
            index,
            source: PathBuf::from(format!("/in/{index}.pdf")),
            text: "some text".to_string(),
            detected_date: date,
            detected_category: category.map(String::from),
            confidence,
            error: None,
        }
    }

    fn registry() -> CategoryRegistry {
        CategoryRegistry::from_entries([CategoryEntry::new("invoices"), CategoryEntry::new("tax")])
    }

    fn day() -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2025, 1, 1)
    }

    #[test]
    fn test_routing() {
        let batch = Batch::from_results(
            vec![
                result(0, day(), Some("invoices"), 2),
                result(1, None, Some("invoices"), 2),
                result(2, day(), None, 0),
                result(3, day(), Some("invoices"), 0),
            ],
            4,
            false,
        );
        let routes: Vec<Route> = batch.entries().iter().map(|e| e.route).collect();
        assert_eq!(routes, vec![Route::Auto, Route::Manual, Route::Manual, Route::Manual]);
        assert_eq!(batch.auto_count(), 1);
        assert_eq!(batch.not_analyzed(), 0);
    }

    #[test]
    fn test_queue_validates_and_keeps_current_request() {
        let mut batch = Batch::from_results(
            vec![result(0, day(), None, 0), result(1, None, None, 0)],
            2,
            false,
        );
        let registry = registry();
        let mut queue = batch.manual_queue(&registry, DateFormat::Ddmmyy);

        let first = queue.next_request().unwrap();
        assert_eq!((first.position, first.total), (1, 2));
        assert_eq!(first.suggested_date.as_deref(), Some("010125"));

        let bad_category = Decision::Process { category: "nope".into(), date: "010125".into() };
        assert_eq!(queue.answer(bad_category), Err(ValidationError::UnknownCategory("nope".into())));
        let empty = Decision::Process { category: " ".into(), date: "010125".into() };
        assert_eq!(queue.answer(empty), Err(ValidationError::EmptyCategory));
        let bad_date = Decision::Process { category: "tax".into(), date: "311125".into() };
        assert!(matches!(queue.answer(bad_date), Err(ValidationError::InvalidDay { .. })));
        assert_eq!(queue.next_request().unwrap().source, first.source);

        queue
            .answer(Decision::Process { category: "tax".into(), date: " 150325 ".into() })
            .unwrap();
        assert_eq!(queue.next_request().unwrap().position, 2);
        queue.answer(Decision::Skip).unwrap();
        assert!(queue.next_request().is_none());

        let entries = batch.entries();
        assert!(entries[0].is_resolved());
        assert_eq!(entries[0].overlay.manual_date.as_deref(), Some("150325"));
        assert!(entries[1].overlay.skip);
    }

    #[test]
    fn test_decline_all() {
        let mut batch = Batch::from_results(
            vec![result(0, None, None, 0), result(1, day(), Some("tax"), 1), result(2, None, None, 0)],
            3,
            false,
        );
        let registry = registry();
        let mut queue = batch.manual_queue(&registry, DateFormat::Ddmmyy);
        assert_eq!(queue.remaining(), 2);
        queue.decline_all();
        assert_eq!(queue.remaining(), 0);

        let skipped: Vec<bool> = batch.entries().iter().map(|e| e.overlay.skip).collect();
        assert_eq!(skipped, vec![true, false, true]);
    }
}
