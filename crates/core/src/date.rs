//! Lenient publication-date parsing.
//!
//! Catalog APIs hand back whatever the cataloguer typed: `2013-6`, `2013/06/01`,
//! `2013年6月`, a bare year, or occasionally a full timestamp. [`parse_date`]
//! accepts all of these and never fails; unrecognised input is simply unset.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};

/// Day used when the input only has year/month precision. Mid-month keeps the
/// date inside the right month after any timezone conversion.
const DEFAULT_DAY: u32 = 15;

pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    let (year, month, day) = split_components(raw)?;
    let date = NaiveDate::from_ymd_opt(year, month.unwrap_or(1), day.unwrap_or(DEFAULT_DAY))?;
    let noon = NaiveTime::from_hms_opt(12, 0, 0)?;
    Some(Utc.from_utc_datetime(&date.and_time(noon)))
}

/// Split `raw` into numeric year / month / day parts. Any of `-`, `/`, `.`,
/// whitespace, or the CJK `年`/`月`/`日` markers act as separators.
fn split_components(raw: &str) -> Option<(i32, Option<u32>, Option<u32>)> {
    let parts: Vec<&str> = raw
        .split(|c: char| matches!(c, '-' | '/' | '.' | '年' | '月' | '日') || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();

    if parts.is_empty() || parts.len() > 3 || !parts.iter().all(|p| p.chars().all(|c| c.is_ascii_digit())) {
        return None;
    }

    let year_part = parts[0];
    if year_part.len() != 4 {
        return None;
    }
    let year = year_part.parse().ok()?;
    let month = parts.get(1).map(|m| m.parse()).transpose().ok()?;
    let day = parts.get(2).map(|d| d.parse()).transpose().ok()?;
    Some((year, month, day))
}
