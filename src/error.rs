// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Error types for Docket

use thiserror::Error;

/// Result type alias for Docket operations
pub type Result<T> = std::result::Result<T, DocketError>;

/// Docket error types
#[derive(Error, Debug)]
pub enum DocketError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("Text extraction error: {0}")]
    Extraction(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Prompt error: {0}")]
    Prompt(String),
}

/// Rejections of manually supplied category/date values.
///
/// These are handed back to whoever is resolving the file so the value can be
/// corrected; they never abort a batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("date must be 6 digits (e.g. 311223), got '{0}'")]
    NotSixDigits(String),

    #[error("invalid month: {0}, month must be between 1 and 12")]
    InvalidMonth(u32),

    #[error("invalid day: {day}, for month {month} day must be between 1 and {max}")]
    InvalidDay { day: u32, month: u32, max: u32 },

    #[error("category '{0}' not found")]
    UnknownCategory(String),

    #[error("a category must be selected")]
    EmptyCategory,
}
