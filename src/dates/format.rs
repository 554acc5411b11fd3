// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Six-digit date strings used in filenames and manual input

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{days_in_month, expand_two_digit_year};
use crate::error::ValidationError;

/// Digit order of the 6-digit date strings exchanged with the user and
/// written into filenames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DateFormat {
    #[default]
    Ddmmyy,
    Mmddyy,
    Yymmdd,
}

impl DateFormat {
    pub const ALL: [DateFormat; 3] = [DateFormat::Ddmmyy, DateFormat::Mmddyy, DateFormat::Yymmdd];

    pub fn as_str(&self) -> &'static str {
        match self {
            DateFormat::Ddmmyy => "ddmmyy",
            DateFormat::Mmddyy => "mmddyy",
            DateFormat::Yymmdd => "yymmdd",
        }
    }

    /// Parse a setting value. Anything unrecognized falls back to `ddmmyy`.
    pub fn from_setting(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "mmddyy" => DateFormat::Mmddyy,
            "yymmdd" => DateFormat::Yymmdd,
            _ => DateFormat::Ddmmyy,
        }
    }

    fn pattern(&self) -> &'static str {
        match self {
            DateFormat::Ddmmyy => "%d%m%y",
            DateFormat::Mmddyy => "%m%d%y",
            DateFormat::Yymmdd => "%y%m%d",
        }
    }

    /// Render a date as the 6-digit string used in filenames.
    pub fn render(&self, date: NaiveDate) -> String {
        date.format(self.pattern()).to_string()
    }

    /// Dash-separated rendering for display, e.g. `31-12-23`.
    pub fn example(&self, date: NaiveDate) -> String {
        let pattern = match self {
            DateFormat::Ddmmyy => "%d-%m-%y",
            DateFormat::Mmddyy => "%m-%d-%y",
            DateFormat::Yymmdd => "%y-%m-%d",
        };
        date.format(pattern).to_string()
    }

    /// Today's date in this format.
    pub fn today(&self) -> String {
        self.render(chrono::Local::now().date_naive())
    }

    /// Validate a manually entered 6-digit date string.
    ///
    /// Two-digit years pivot at 50: `00..=49` are 2000s, `50..=99` are 1900s.
    pub fn parse(&self, input: &str) -> Result<NaiveDate, ValidationError> {
        let input = input.trim();
        if input.len() != 6 || !input.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::NotSixDigits(input.to_string()));
        }

        // Six ASCII digits, so every pair parses.
        let pair = |i: usize| input[i..i + 2].parse::<u32>().unwrap_or(0);
        let (day, month, yy) = match self {
            DateFormat::Ddmmyy => (pair(0), pair(2), pair(4)),
            DateFormat::Mmddyy => (pair(2), pair(0), pair(4)),
            DateFormat::Yymmdd => (pair(4), pair(2), pair(0)),
        };
        let year = expand_two_digit_year(yy);

        if !(1..=12).contains(&month) {
            return Err(ValidationError::InvalidMonth(month));
        }
        let max = days_in_month(year, month);
        if !(1..=max).contains(&day) {
            return Err(ValidationError::InvalidDay { day, month, max });
        }

        NaiveDate::from_ymd_opt(year, month, day)
            .ok_or(ValidationError::InvalidDay { day, month, max })
    }
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for DateFormat {
    fn from(value: String) -> Self {
        DateFormat::from_setting(&value)
    }
}

impl From<DateFormat> for String {
    fn from(format: DateFormat) -> Self {
        format.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_render_each_format() {
        let date = ymd(2023, 12, 31);
        assert_eq!(DateFormat::Ddmmyy.render(date), "311223");
        assert_eq!(DateFormat::Mmddyy.render(date), "123123");
        assert_eq!(DateFormat::Yymmdd.render(date), "231231");
        assert_eq!(DateFormat::Ddmmyy.example(date), "31-12-23");
    }

    #[test]
    fn test_parse_render_roundtrip_within_pivot_window() {
        let dates = [
            ymd(2000, 1, 1),
            ymd(2024, 2, 29),
            ymd(2049, 12, 31),
            ymd(1950, 6, 15),
            ymd(1999, 11, 30),
        ];
        for format in DateFormat::ALL {
            for date in dates {
                assert_eq!(format.parse(&format.render(date)), Ok(date), "{format} {date}");
            }
        }
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(
            DateFormat::Ddmmyy.parse("3112"),
            Err(ValidationError::NotSixDigits("3112".to_string()))
        );
        assert_eq!(
            DateFormat::Ddmmyy.parse("31-12-"),
            Err(ValidationError::NotSixDigits("31-12-".to_string()))
        );
        assert_eq!(DateFormat::Ddmmyy.parse("011323"), Err(ValidationError::InvalidMonth(13)));
        assert_eq!(
            DateFormat::Ddmmyy.parse("310423"),
            Err(ValidationError::InvalidDay { day: 31, month: 4, max: 30 })
        );
        // 2023 is not a leap year, 2024 is.
        assert!(DateFormat::Ddmmyy.parse("290223").is_err());
        assert_eq!(DateFormat::Ddmmyy.parse("290224"), Ok(ymd(2024, 2, 29)));
    }

    #[test]
    fn test_unknown_setting_defaults_to_ddmmyy() {
        assert_eq!(DateFormat::from_setting("yymmdd"), DateFormat::Yymmdd);
        assert_eq!(DateFormat::from_setting("MMDDYY"), DateFormat::Mmddyy);
        assert_eq!(DateFormat::from_setting("dd/mm/yyyy"), DateFormat::Ddmmyy);

        let parsed: DateFormat = serde_json::from_str("\"bogus\"").unwrap();
        assert_eq!(parsed, DateFormat::Ddmmyy);
        assert_eq!(serde_json::to_string(&DateFormat::Yymmdd).unwrap(), "\"yymmdd\"");
    }
}
