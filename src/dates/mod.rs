// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Filing-date inference from document text and filenames
//!
//! Both entry points are pure and never fail: malformed or date-free input
//! yields `None`. Text strategies run from the most to the least reliable and
//! the first hit wins, so an explicit ISO date always beats a looser pattern
//! that happens to match elsewhere in the document.

mod format;
mod fuzzy;

pub use format::DateFormat;

use chrono::{Datelike, Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

/// Earliest year accepted from any strategy.
pub const MIN_YEAR: i32 = 1900;
/// Latest year accepted from any strategy.
pub const MAX_YEAR: i32 = 2100;

const MONTHS: &str = "January|February|March|April|May|June|July|August|September|October|November|December|Jan|Feb|Mar|Apr|Jun|Jul|Aug|Sep|Sept|Oct|Nov|Dec";

/// Month name table used where a name has to be turned into a number.
const MONTH_TABLE: [(&str, u32); 24] = [
    ("jan", 1),
    ("january", 1),
    ("feb", 2),
    ("february", 2),
    ("mar", 3),
    ("march", 3),
    ("apr", 4),
    ("april", 4),
    ("may", 5),
    ("jun", 6),
    ("june", 6),
    ("jul", 7),
    ("july", 7),
    ("aug", 8),
    ("august", 8),
    ("sep", 9),
    ("sept", 9),
    ("september", 9),
    ("oct", 10),
    ("october", 10),
    ("nov", 11),
    ("november", 11),
    ("dec", 12),
    ("december", 12),
];

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("date patterns are valid regexes")
}

static WHITESPACE: Lazy<Regex> = Lazy::new(|| regex(r"\s+"));
static SPLIT_YEAR_TAIL: Lazy<Regex> = Lazy::new(|| regex(r"\b(20\d)\s+(\d)\b"));
static SPLIT_YEAR_HEAD: Lazy<Regex> = Lazy::new(|| regex(r"\b(2)\s+(\d{3})\b"));
static ISO: Lazy<Regex> = Lazy::new(|| regex(r"(\d{4})-(\d{2})-(\d{2})"));
static MONTH_DAY_YEAR: Lazy<Regex> =
    Lazy::new(|| regex(&format!(r"\b(?i:({MONTHS}))\s+(\d{{1,2}})[,\s]+(\d{{4}})")));
static BARE_YEAR: Lazy<Regex> = Lazy::new(|| regex(r"\b(19\d{2}|20\d{2})\b"));

/// A text pattern whose captures are handed to the fuzzy resolver.
struct TextPattern {
    regex: Regex,
    /// The last two captures are halves of one year split by OCR noise.
    split_year: bool,
}

static TEXT_PATTERNS: Lazy<Vec<TextPattern>> = Lazy::new(|| {
    let plain = |p: String| TextPattern { regex: regex(&p), split_year: false };
    vec![
        // 05/11/20 23, ahead of the plain form, which would stop at "20"
        TextPattern {
            regex: regex(r"\b(\d{1,2})[/.\-](\d{1,2})[/.\-](19|20)\s(\d{2})\b"),
            split_year: true,
        },
        // 05/11/2023, 5.11.23, 05-11-2023
        plain(r"\b(\d{1,2})[/.\-](\d{1,2})[/.\-](\d{2,4})\b".to_string()),
        // 2023/11/05
        plain(r"\b(\d{2,4})[/.\-](\d{1,2})[/.\-](\d{1,2})\b".to_string()),
        // 5th of November, 2023
        plain(format!(r"(\d{{1,2}})(?:st|nd|rd|th)?\s+(?:of\s+)?(?i:({MONTHS}))[,\s]+(\d{{2,4}})")),
        // November 5th, 2023
        plain(format!(r"\b(?i:({MONTHS}))\s+(\d{{1,2}})(?:st|nd|rd|th)?[,\s]+(\d{{2,4}})")),
        plain(format!(r"\b(?i:({MONTHS}))\s+(\d{{1,2}})(?:st|nd|rd|th)?[,\s]+(20\d{{2}})")),
        // 5 November 2023
        plain(format!(r"(\d{{1,2}})\s+(?i:({MONTHS}))\s+(\d{{4}})")),
        // 05/11/ 2023
        plain(r"\b(\d{1,2})[/.\-](\d{1,2})[/.\-]\s*(\d{2,4})\b".to_string()),
    ]
});

static FILENAME_ISO: Lazy<Regex> = Lazy::new(|| regex(r"(\d{4})[_\-]?(\d{2})[_\-]?(\d{2})"));

static FILENAME_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // DDMMYY or DDMMYYYY
        regex(r"(\d{2})(\d{2})(\d{2,4})"),
        // YYYYMMDD or YYMMDD
        regex(r"(\d{2,4})(\d{2})(\d{2})"),
        // YYYY-DD-MM, day and month in either order
        regex(r"(\d{4})[_\-](\d{2})[_\-](\d{2})"),
        // DD-MM-YY or DD_MM_YYYY
        regex(r"(\d{2})[_\-](\d{2})[_\-](\d{2,4})"),
        // YY-MM-DD
        regex(r"(\d{2})[_\-](\d{2})[_\-](\d{2})"),
    ]
});

/// Number of days in `month` of `year`, leap-year aware.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        4 | 6 | 9 | 11 => 30,
        2 if (year % 4 == 0 && year % 100 != 0) || year % 400 == 0 => 29,
        2 => 28,
        _ => 31,
    }
}

/// Two-digit year pivot: below 50 is the 2000s, 50 and up is the 1900s.
pub fn expand_two_digit_year(yy: u32) -> i32 {
    if yy < 50 {
        2000 + yy as i32
    } else {
        1900 + yy as i32
    }
}

fn year_in_range(year: i32) -> bool {
    (MIN_YEAR..=MAX_YEAR).contains(&year)
}

/// Exact month-name lookup, case-insensitive.
pub(crate) fn month_from_name(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    MONTH_TABLE
        .iter()
        .find(|(n, _)| *n == lower)
        .map(|(_, m)| *m)
}

/// Lenient month-name lookup: the first table name contained in `name`.
fn month_containing(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    MONTH_TABLE
        .iter()
        .find(|(n, _)| lower.contains(n))
        .map(|(_, m)| *m)
}

/// Collapse whitespace and rejoin years that OCR split apart ("202 5", "2 023").
pub fn clean_text(text: &str) -> String {
    let collapsed = WHITESPACE.replace_all(text, " ");
    let joined = SPLIT_YEAR_TAIL.replace_all(&collapsed, "${1}${2}");
    SPLIT_YEAR_HEAD.replace_all(&joined, "${1}${2}").into_owned()
}

/// Infer a filing date from document text.
pub fn extract_from_text(text: &str) -> Option<NaiveDate> {
    extract_from_text_on(text, Local::now().date_naive())
}

/// [`extract_from_text`] with an explicit "today" for the strategies that
/// fill in missing parts.
pub fn extract_from_text_on(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let clean = clean_text(text);

    if let Some(date) = iso_date(&clean) {
        trace!("ISO date found: {}", date);
        return Some(date);
    }

    if let Some(date) = pattern_date(&clean, today) {
        trace!("Pattern date found: {}", date);
        return Some(date);
    }

    if let Some(date) = fuzzy::parse(&clean, true, today).filter(|d| year_in_range(d.year())) {
        trace!("Fuzzy whole-text date found: {}", date);
        return Some(date);
    }

    if let Some(date) = month_name_date(&clean) {
        trace!("Month-name date found: {}", date);
        return Some(date);
    }

    bare_year_date(&clean, today)
}

fn iso_date(text: &str) -> Option<NaiveDate> {
    ISO.captures_iter(text).find_map(|caps| {
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        if (1..=12).contains(&month) && (1..=31).contains(&day) && year_in_range(year) {
            NaiveDate::from_ymd_opt(year, month, day)
        } else {
            None
        }
    })
}

fn pattern_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    for pattern in TEXT_PATTERNS.iter() {
        for caps in pattern.regex.captures_iter(text) {
            let mut parts: Vec<String> = caps
                .iter()
                .skip(1)
                .flatten()
                .map(|m| m.as_str().to_string())
                .filter(|p| !p.is_empty())
                .collect();

            if pattern.split_year && parts.len() == 4 {
                let tail = parts.pop().unwrap_or_default();
                if let Some(head) = parts.last_mut() {
                    head.push_str(&tail);
                }
            }

            let candidate = parts.join(" ");
            if let Some(date) = fuzzy::parse(&candidate, false, today) {
                if year_in_range(date.year()) {
                    return Some(date);
                }
            }
        }
    }
    None
}

fn month_name_date(text: &str) -> Option<NaiveDate> {
    MONTH_DAY_YEAR.captures_iter(text).find_map(|caps| {
        let month = month_containing(&caps[1])?;
        let day: u32 = caps[2].parse().ok()?;
        let year: i32 = caps[3].parse().ok()?;
        if (1..=31).contains(&day) && year_in_range(year) {
            NaiveDate::from_ymd_opt(year, month, day)
        } else {
            None
        }
    })
}

fn bare_year_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let caps = BARE_YEAR.captures(text)?;
    let year: i32 = caps[1].parse().ok()?;
    if !year_in_range(year) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, today.month(), today.day())
}

/// Infer a filing date from a filename.
///
/// Whitespace is stripped first to undo OCR-style spacing; if nothing in the
/// stripped name resolves, the original name is tried as well.
pub fn extract_from_filename(name: &str) -> Option<NaiveDate> {
    let stripped = WHITESPACE.replace_all(name, "");

    if let Some(date) = filename_iso(&stripped) {
        return Some(date);
    }

    for candidate in [stripped.as_ref(), name] {
        for pattern in FILENAME_PATTERNS.iter() {
            let triads = pattern
                .captures_iter(candidate)
                .map(|caps| (caps[1].to_string(), caps[2].to_string(), caps[3].to_string()));
            for (a, b, c) in triads {
                if let Some(date) = resolve_triad(&a, &b, &c) {
                    return Some(date);
                }
            }
        }
    }

    None
}

fn filename_iso(name: &str) -> Option<NaiveDate> {
    FILENAME_ISO.captures_iter(name).find_map(|caps| {
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        if year_in_range(year) && (1..=12).contains(&month) && (1..=31).contains(&day) {
            NaiveDate::from_ymd_opt(year, month, day)
        } else {
            None
        }
    })
}

/// Decide which of three digit groups is the day, month and year.
///
/// A four-digit group is the year and, of the other two, the one that can
/// only be a month is the month. Otherwise day-first wins whenever it is
/// plausible, then month-first, then year-first.
fn resolve_triad(a: &str, b: &str, c: &str) -> Option<NaiveDate> {
    let (x, y, z): (u32, u32, u32) = (a.parse().ok()?, b.parse().ok()?, c.parse().ok()?);

    let (year, month, day) = if a.len() == 4 {
        if y <= 12 && z <= 31 {
            (x as i32, y, z)
        } else if z <= 12 && y <= 31 {
            (x as i32, z, y)
        } else {
            return None;
        }
    } else if c.len() == 4 {
        if x <= 31 && y <= 12 {
            (z as i32, y, x)
        } else if x <= 12 && y <= 31 {
            (z as i32, x, y)
        } else {
            return None;
        }
    } else if c.len() == 3 || a.len() == 3 {
        return None;
    } else if x <= 31 && y <= 12 {
        (expand_two_digit_year(z), y, x)
    } else if x <= 12 && y <= 31 {
        (expand_two_digit_year(z), x, y)
    } else {
        (expand_two_digit_year(x), y, z)
    };

    if !(1..=12).contains(&month) || day < 1 || day > days_in_month(year, month) {
        return None;
    }
    if !year_in_range(year) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn today() -> NaiveDate {
        ymd(2026, 3, 14)
    }

    #[test]
    fn test_clean_text_repairs_split_years() {
        assert_eq!(clean_text("dated  1 March\n202 5"), "dated 1 March 2025");
        assert_eq!(clean_text("year 2 023 end"), "year 2023 end");
        assert_eq!(clean_text("tabs\t\tand\nlines"), "tabs and lines");
    }

    #[test]
    fn test_iso_wins_over_later_patterns() {
        let text = "Invoice dated 2023-11-05. Payment due 01/02/2024, reminder March 3, 2022";
        assert_eq!(extract_from_text_on(text, today()), Some(ymd(2023, 11, 5)));
    }

    #[test]
    fn test_iso_out_of_range_falls_through() {
        // 2023-13-45 is not ISO-valid, the numeric pattern picks up 05/06/2021.
        let text = "Ref 2023-13-45 issued 05/06/2021";
        assert_eq!(extract_from_text_on(text, today()), Some(ymd(2021, 5, 6)));
    }

    #[test]
    fn test_separator_patterns() {
        assert_eq!(extract_from_text_on("Date: 25/12/2023", today()), Some(ymd(2023, 12, 25)));
        assert_eq!(extract_from_text_on("Date: 2023/12/25", today()), Some(ymd(2023, 12, 25)));
        assert_eq!(extract_from_text_on("Date: 25.12.23", today()), Some(ymd(2023, 12, 25)));
        // Ambiguous numeric dates resolve month-first inside the pattern stage.
        assert_eq!(extract_from_text_on("Date: 05/11/2023", today()), Some(ymd(2023, 5, 11)));
    }

    #[test]
    fn test_month_name_patterns() {
        assert_eq!(
            extract_from_text_on("Statement for 5th of November, 2023", today()),
            Some(ymd(2023, 11, 5))
        );
        assert_eq!(
            extract_from_text_on("Issued November 5th, 2023 to you", today()),
            Some(ymd(2023, 11, 5))
        );
        assert_eq!(
            extract_from_text_on("ISSUED 14 FEB 2024", today()),
            Some(ymd(2024, 2, 14))
        );
        assert_eq!(extract_from_text_on("Sept 9, 2021", today()), Some(ymd(2021, 9, 9)));
    }

    #[test]
    fn test_ocr_damaged_years() {
        assert_eq!(extract_from_text_on("Date 12/03/ 2024", today()), Some(ymd(2024, 12, 3)));
        assert_eq!(extract_from_text_on("Date 1 March 202 5", today()), Some(ymd(2025, 3, 1)));
        assert_eq!(extract_from_text_on("Date 05/11/20 23", today()), Some(ymd(2023, 5, 11)));
        // A time after a complete two-digit year is not a year fragment.
        assert_eq!(extract_from_text_on("Date 05/11/23 10:30", today()), Some(ymd(2023, 5, 11)));
    }

    #[test]
    fn test_whole_text_fallback_is_day_first() {
        assert_eq!(extract_from_text_on("received 7 9 2022", today()), Some(ymd(2022, 9, 7)));
    }

    #[test]
    fn test_bare_year_fallback_uses_today() {
        let text = "Annual report 2019 page 1 of 12 section 4 note 7";
        assert_eq!(extract_from_text_on(text, today()), Some(ymd(2019, 3, 14)));
    }

    #[test]
    fn test_text_without_dates() {
        assert_eq!(extract_from_text_on("", today()), None);
        assert_eq!(extract_from_text_on("hello world, nothing to see", today()), None);
        assert_eq!(extract_from_text_on("Order 1234567 qty 3 4 5 6", today()), None);
        assert_eq!(extract_from_text_on("\u{0}\u{fffd}%%%", today()), None);
    }

    #[test]
    fn test_filename_day_first_triad() {
        assert_eq!(extract_from_filename("310125_INV.pdf"), Some(ymd(2025, 1, 31)));
        assert_eq!(extract_from_filename("010199_BANK.pdf"), Some(ymd(1999, 1, 1)));
    }

    #[test]
    fn test_filename_iso_and_four_digit_years() {
        assert_eq!(extract_from_filename("scan_2024-02-29.pdf"), Some(ymd(2024, 2, 29)));
        assert_eq!(extract_from_filename("scan_20240229.pdf"), Some(ymd(2024, 2, 29)));
        assert_eq!(extract_from_filename("bill 31_12_2023.pdf"), Some(ymd(2023, 12, 31)));
        assert_eq!(extract_from_filename("bill 12-31-2023.pdf"), Some(ymd(2023, 12, 31)));
    }

    #[test]
    fn test_filename_year_first_with_day_before_month() {
        assert_eq!(extract_from_filename("scan_20232512.pdf"), Some(ymd(2023, 12, 25)));
        assert_eq!(extract_from_filename("scan_2023-25-12.pdf"), Some(ymd(2023, 12, 25)));
        assert_eq!(extract_from_filename("scan_2023-45-12.pdf"), None);
    }

    #[test]
    fn test_filename_strips_ocr_spacing() {
        assert_eq!(extract_from_filename("receipt 31 01 25.pdf"), Some(ymd(2025, 1, 31)));
    }

    #[test]
    fn test_filename_rejects_impossible_dates() {
        assert_eq!(extract_from_filename("300223_X.pdf"), None);
        assert_eq!(extract_from_filename("scan-99-99-99.pdf"), None);
        assert_eq!(extract_from_filename("notes.pdf"), None);
        assert_eq!(extract_from_filename(""), None);
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(1900, 2), 28);
        assert_eq!(days_in_month(2000, 2), 29);
        assert_eq!(days_in_month(2023, 4), 30);
        assert_eq!(days_in_month(2023, 12), 31);
    }

    #[test]
    fn test_month_lookups() {
        assert_eq!(month_from_name("SEPT"), Some(9));
        assert_eq!(month_from_name("Mayday"), None);
        assert_eq!(month_containing("December"), Some(12));
    }
}
