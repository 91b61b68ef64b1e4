//! Field normalizers applied before records are stored or echoed back.

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Reformat a vehicle passport number: trim, collapse internal whitespace
/// runs to single spaces, uppercase. `"  77 ab   123456 "` → `"77 AB 123456"`.
pub fn normalize_passport_number(raw: &str) -> String {
    WHITESPACE_RUN
        .replace_all(raw.trim(), " ")
        .to_uppercase()
}

/// Reduce an engine volume to its digits. Clients type units and separators
/// (`"1598 см³"`, `"1,598cc"`); only the digits are stored.
pub fn normalize_engine_volume(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Clean a VIN: spaces stripped, truncated to the 17-character standard.
/// Returns `None` when nothing is left.
pub fn clean_vin(raw: &str) -> Option<String> {
    let cleaned: String = raw.chars().filter(|c| !c.is_whitespace()).take(17).collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}
