// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Docket: date- and keyword-driven document filing
//!
//! Loose documents in a working directory are analyzed in parallel for a
//! filing date and a category, renamed to `{date}_{abbreviation}.pdf`, copied
//! into their category folder and archived. Anything ambiguous is handed to a
//! human first.

pub mod classify;
pub mod config;
pub mod dates;
pub mod error;
pub mod extractors;
pub mod history;
pub mod layout;
pub mod naming;
pub mod pipeline;
pub mod registry;
pub mod scan;

pub use config::AppConfig;
pub use error::{DocketError, Result, ValidationError};
