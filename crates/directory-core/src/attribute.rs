//! Attribute naming and value decoding rules.
//!
//! Directory servers treat attribute names case-insensitively, including names outside the
//! ASCII range. Every case-insensitive lookup in the workspace folds names through
//! [`fold_case`] so that the write side and the read side always agree.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::HashMap;

/// Ordered values of a single attribute.
pub type AttributeValues = Vec<String>;

/// Attribute name to values mapping.
pub type AttributeMap = HashMap<String, AttributeValues>;

const GENERALIZED_TIME: &str = "%Y%m%d%H%M%S";
const GENERALIZED_TIME_FRACTION: &str = "%Y%m%d%H%M%S%.f";
const GENERALIZED_TIME_OFFSET: &str = "%Y%m%d%H%M%S%z";
const GENERALIZED_TIME_FRACTION_OFFSET: &str = "%Y%m%d%H%M%S%.f%z";

/// Folds an attribute name to its case-insensitive key.
///
/// Uses full Unicode lowercasing rather than ASCII-only folding.
///
/// ```
/// use directory_core::fold_case;
///
/// assert_eq!(fold_case("givenName"), "givenname");
/// assert_eq!(fold_case("ÉMAIL"), "émail");
/// ```
#[must_use]
pub fn fold_case(name: &str) -> String {
    name.to_lowercase()
}

/// Interprets a directory boolean (`TRUE`/`true`/`1`).
#[must_use]
pub fn parse_bool(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

/// Decodes an RFC 3339 timestamp or an LDAP `GeneralizedTime` value.
///
/// `GeneralizedTime` values may omit seconds, or minutes and seconds (`YYYYMMDDHH[MM[SS]]`),
/// and end in either a `Z` suffix or a `±HHMM` offset. Fractions are only accepted after
/// the seconds. Returns `None` when the value matches neither syntax.
#[must_use]
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    let expanded = expand_generalized_time(value)?;
    let value = expanded.as_str();

    if let Some(naive) = value.strip_suffix('Z').or_else(|| value.strip_suffix('z')) {
        return NaiveDateTime::parse_from_str(naive, GENERALIZED_TIME)
            .or_else(|_| NaiveDateTime::parse_from_str(naive, GENERALIZED_TIME_FRACTION))
            .ok()
            .map(|dt| dt.and_utc());
    }

    DateTime::parse_from_str(value, GENERALIZED_TIME_OFFSET)
        .or_else(|_| DateTime::parse_from_str(value, GENERALIZED_TIME_FRACTION_OFFSET))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Pads the optional minute and second fields of a `GeneralizedTime` value with zeros.
fn expand_generalized_time(value: &str) -> Option<String> {
    let digits = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (time, zone) = value.split_at(digits);
    let padding = match time.len() {
        10 => "0000",
        12 => "00",
        14 => "",
        _ => return None,
    };
    if !padding.is_empty() && zone.starts_with(['.', ',']) {
        return None;
    }
    Some(format!("{time}{padding}{zone}"))
}
