//! Numeric ordering of step source files.
//!
//! Step files are ordered by the first integer embedded in the filename,
//! ignoring letters, so `step2.html` sorts before `step10.html`.

use std::cmp::Ordering;

/// First run of ASCII digits in `name`, or 0 when there is none
pub fn numeric_key(name: &str) -> u64 {
    let digits: String = name
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        0
    } else {
        digits.parse().unwrap_or(u64::MAX)
    }
}

/// Compare two filenames by numeric key, falling back to the name itself
pub fn compare_numeric(a: &str, b: &str) -> Ordering {
    numeric_key(a)
        .cmp(&numeric_key(b))
        .then_with(|| a.cmp(b))
}
