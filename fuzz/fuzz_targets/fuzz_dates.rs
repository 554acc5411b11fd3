// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

#![no_main]

use arbitrary::Arbitrary;
use chrono::Datelike;
use docket::dates::{self, DateFormat};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct DateInput<'a> {
    text: &'a str,
    filename: &'a str,
    manual: &'a str,
}

fuzz_target!(|input: DateInput<'_>| {
    if let Some(date) = dates::extract_from_text(input.text) {
        assert!((1900..=2100).contains(&date.year()));
    }
    let _ = dates::extract_from_filename(input.filename);

    for format in DateFormat::ALL {
        if let Ok(date) = format.parse(input.manual) {
            assert_eq!(format.parse(&format.render(date)), Ok(date));
        }
    }
});

