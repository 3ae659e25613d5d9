//! Percent text-field input parsing.
//!
//! # Responsibility
//! - Turn raw text-field input into a numeric percent before it reaches the
//!   editor, so the reducer only ever sees parsed numbers.
//!
//! # Invariants
//! - Rejection is expressed as `None`; this module never errors or panics.
//! - Both decimal point and decimal comma forms are accepted.

use once_cell::sync::Lazy;
use regex::Regex;

static PERCENT_INPUT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?\d+(?:[.,]\d+)?$").expect("valid percent input regex"));

/// Parses raw percent input from a text field.
///
/// Accepts optional sign, digits, and one fractional part separated by `.`
/// or `,`. Surrounding whitespace is ignored. Anything else (empty input,
/// letters, grouping characters, trailing symbols) returns `None`.
pub fn parse_percent(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if !PERCENT_INPUT_RE.is_match(trimmed) {
        return None;
    }
    trimmed.replace(',', ".").parse::<f64>().ok()
}
