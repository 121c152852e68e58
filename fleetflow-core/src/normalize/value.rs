//! Value coercion
//!
//! Tolerant parsers for the cell values found in hand-edited spreadsheets.
//! None of these fail: a value that cannot be parsed yields `None` and the
//! caller keeps the cleaned string.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

/// Trim and strip one pair of surrounding single or double quotes
pub fn clean_value(value: &str) -> String {
    let trimmed = value.trim();
    let unquoted = strip_quotes(trimmed);
    unquoted.trim().to_string()
}

fn strip_quotes(value: &str) -> &str {
    let quoted = value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')));
    if quoted {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

/// Parse `true/1/yes/y` and `false/0/no/n`, case-insensitively
pub fn parse_bool(value: &str) -> Option<bool> {
    match clean_value(value).to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Some(true),
        "false" | "0" | "no" | "n" => Some(false),
        _ => None,
    }
}

/// Parse a day-first date (`dd-mm-yyyy`, `dd/mm/yy`, ...) or a common ISO form
///
/// Two-digit years are read as 20xx.
pub fn parse_date_flexible(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    parse_day_first(value).or_else(|| parse_generic(value))
}

fn parse_day_first(value: &str) -> Option<DateTime<Utc>> {
    let parts: Vec<&str> = value.split(['-', '/']).collect();
    if parts.len() != 3 {
        return None;
    }

    let (day, month, year) = (parts[0], parts[1], parts[2]);
    let digits = |s: &str, lens: &[usize]| lens.contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit());
    if !digits(day, &[1, 2]) || !digits(month, &[1, 2]) || !digits(year, &[2, 4]) {
        return None;
    }

    let day: u32 = day.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    let mut year: i32 = year.parse().ok()?;
    if parts[2].len() == 2 {
        year += 2000;
    } else if !(1900..2100).contains(&year) {
        return None;
    }

    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn parse_generic(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.and_utc());
        }
    }

    for format in ["%Y-%m-%d", "%Y/%m/%d", "%d %b %Y", "%b %d %Y", "%B %d, %Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(value, format) {
            return d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }

    None
}

/// Render a timestamp the way normalized date fields are stored
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse the leading integer of a value (`"12.7 km"` -> 12)
pub fn parse_int_lenient(value: &str) -> Option<i32> {
    let value = value.trim();
    let (sign, rest) = match value.strip_prefix('-') {
        Some(rest) => (-1i64, rest),
        None => (1i64, value.strip_prefix('+').unwrap_or(value)),
    };

    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }

    let magnitude: i64 = digits.parse().ok()?;
    i32::try_from(sign * magnitude).ok()
}
