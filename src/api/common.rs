//! Common API utilities
//!
//! Query strings are parsed leniently: every field arrives as an optional
//! string and is interpreted here, so a bad value degrades to its default
//! instead of rejecting the request.

use std::str::FromStr;

/// Parse a value, falling back to `default` when absent or malformed
pub fn parse_or<T: FromStr>(raw: Option<&str>, default: T) -> T {
    parse_opt(raw).unwrap_or(default)
}

/// Parse a value; absent, blank or malformed input is `None`
pub fn parse_opt<T: FromStr>(raw: Option<&str>) -> Option<T> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse().ok())
}

/// Non-blank trimmed string
pub fn non_blank(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Split a comma-separated list, dropping blank entries
pub fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}
