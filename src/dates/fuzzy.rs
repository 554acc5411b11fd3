// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Lenient date resolution over free text.
//!
//! Words that are not month names are skipped. Numbers of one, two or four
//! digits are collected as year/month/day candidates and resolved the way a
//! person reading a date would: a four-digit number (or anything above 31) is
//! the year, a month name fixes the month, and the remaining order is decided
//! by `day_first`. Components that never appear are taken from `today`.
//! More than three numeric candidates, or two month names, is treated as
//! "not a date".

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use super::{expand_two_digit_year, month_from_name};

static TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+(?:[./:,\-]\d+)*)(?:st|nd|rd|th)?|([A-Za-z]+)").expect("valid token regex")
});

static SEPARATED_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,4})[./\-](\d{1,2})[./\-](\d{1,4})$").expect("valid date regex"));

#[derive(Debug, Clone, Copy)]
struct Number {
    value: u32,
    digits: usize,
}

impl Number {
    fn is_year(&self) -> bool {
        self.digits == 4 || self.value > 31
    }

    fn year(&self) -> i32 {
        if self.digits <= 2 {
            expand_two_digit_year(self.value)
        } else {
            self.value as i32
        }
    }
}

#[derive(Debug, Default)]
struct Parts {
    year: Option<i32>,
    month: Option<u32>,
    day: Option<u32>,
}

/// Resolve the date written somewhere in `text`, if any.
pub(crate) fn parse(text: &str, day_first: bool, today: NaiveDate) -> Option<NaiveDate> {
    let mut numbers: Vec<Number> = Vec::new();
    let mut month_name: Option<u32> = None;

    for caps in TOKEN.captures_iter(text) {
        if let Some(word) = caps.get(2) {
            if let Some(month) = month_from_name(word.as_str()) {
                if month_name.is_some() {
                    return None;
                }
                month_name = Some(month);
            }
            continue;
        }

        let Some(digits) = caps.get(1).map(|m| m.as_str()) else {
            continue;
        };

        if let Some(parts) = SEPARATED_DATE.captures(digits) {
            for i in 1..=3 {
                numbers.push(number(&parts[i])?);
            }
        } else if digits.bytes().all(|b| b.is_ascii_digit()) {
            // Times, amounts and long reference numbers are not date parts.
            if matches!(digits.len(), 1 | 2 | 4) {
                numbers.push(number(digits)?);
            }
        }

        if numbers.len() > 3 {
            return None;
        }
    }

    let parts = match month_name {
        Some(month) => resolve_with_month(&numbers, month)?,
        None => resolve_numeric(&numbers, day_first)?,
    };

    NaiveDate::from_ymd_opt(
        parts.year.unwrap_or_else(|| today.year()),
        parts.month.unwrap_or_else(|| today.month()),
        parts.day.unwrap_or_else(|| today.day()),
    )
}

fn number(digits: &str) -> Option<Number> {
    Some(Number {
        value: digits.parse().ok()?,
        digits: digits.len(),
    })
}

fn resolve_with_month(numbers: &[Number], month: u32) -> Option<Parts> {
    let mut parts = Parts {
        month: Some(month),
        ..Parts::default()
    };

    match numbers {
        [] => {}
        [only] if only.is_year() => parts.year = Some(only.year()),
        [only] => parts.day = Some(only.value),
        [a, b] => match (a.is_year(), b.is_year()) {
            (true, true) => return None,
            (true, false) => {
                parts.year = Some(a.year());
                parts.day = Some(b.value);
            }
            _ => {
                parts.day = Some(a.value);
                parts.year = Some(b.year());
            }
        },
        _ => return None,
    }

    Some(parts)
}

fn resolve_numeric(numbers: &[Number], day_first: bool) -> Option<Parts> {
    let mut parts = Parts::default();

    match numbers {
        [] => return None,
        [only] if only.is_year() => parts.year = Some(only.year()),
        [only] => parts.day = Some(only.value),
        [a, b] => {
            if a.is_year() {
                parts.year = Some(a.year());
                parts.month = Some(b.value);
            } else if b.is_year() {
                parts.month = Some(a.value);
                parts.year = Some(b.year());
            } else if day_first && b.value <= 12 {
                parts.day = Some(a.value);
                parts.month = Some(b.value);
            } else {
                parts.month = Some(a.value);
                parts.day = Some(b.value);
            }
        }
        [a, b, c] => {
            if b.is_year() {
                return None;
            }
            if a.is_year() {
                parts.year = Some(a.year());
                if day_first && c.value <= 12 {
                    parts.day = Some(b.value);
                    parts.month = Some(c.value);
                } else {
                    parts.month = Some(b.value);
                    parts.day = Some(c.value);
                }
            } else if a.value > 12 || (day_first && b.value <= 12) {
                parts.day = Some(a.value);
                parts.month = Some(b.value);
                parts.year = Some(c.year());
            } else {
                parts.month = Some(a.value);
                parts.day = Some(b.value);
                parts.year = Some(c.year());
            }
        }
        _ => return None,
    }

    Some(parts)
}
