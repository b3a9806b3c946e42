//! Date and month-name parsing for spreadsheet cells.
//!
//! Exports mix American slash dates, European dot dates and whatever the
//! office suite produced for date-formatted cells, so parsing tries the
//! grammars in a fixed order and only then falls back to looser formats.

use chrono::{Datelike, NaiveDate, NaiveDateTime};

pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 2100;

pub const MONTH_NAMES_RU: [&str; 12] = [
    "Январь", "Февраль", "Март", "Апрель", "Май", "Июнь", "Июль", "Август", "Сентябрь", "Октябрь",
    "Ноябрь", "Декабрь",
];

// Three-letter stems cover nominative, genitive and abbreviated forms.
const MONTH_STEMS: &[(&str, u32)] = &[
    ("янв", 1),
    ("фев", 2),
    ("мар", 3),
    ("апр", 4),
    ("май", 5),
    ("мая", 5),
    ("июн", 6),
    ("июл", 7),
    ("авг", 8),
    ("сен", 9),
    ("окт", 10),
    ("ноя", 11),
    ("дек", 12),
    ("jan", 1),
    ("feb", 2),
    ("mar", 3),
    ("apr", 4),
    ("may", 5),
    ("jun", 6),
    ("jul", 7),
    ("aug", 8),
    ("sep", 9),
    ("oct", 10),
    ("nov", 11),
    ("dec", 12),
];

const GENERIC_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d-%m-%Y",
    "%d %B %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %b %Y",
];

const GENERIC_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Parse a free-text date.
///
/// Tried in order: `M/D/YY[YY]` (month first), `D.M.YY[YY]` (day first), then
/// ISO and a few textual forms. Two-digit years always mean 20YY. Returns
/// `None` for impossible calendar dates and years outside `MIN_YEAR..=MAX_YEAR`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    // "15.03.2024 0:00:00" style cells carry a time we don't need.
    let head = raw.split_whitespace().next()?;

    let date = if let Some([m, d, y]) = split_numeric(head, '/') {
        build_date(y, m, d)
    } else if let Some([d, m, y]) = split_numeric(head, '.') {
        build_date(y, m, d)
    } else {
        parse_generic(raw)
    }?;

    (MIN_YEAR..=MAX_YEAR).contains(&date.year()).then_some(date)
}

/// Split `a<sep>b<sep>c` where a and b have one or two digits and c has two or four.
fn split_numeric(s: &str, sep: char) -> Option<[u32; 3]> {
    let parts: Vec<&str> = s.split(sep).collect();
    if parts.len() != 3 || !parts.iter().all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit())) {
        return None;
    }
    if parts[0].len() > 2 || parts[1].len() > 2 || !matches!(parts[2].len(), 2 | 4) {
        return None;
    }
    Some([parts[0].parse().ok()?, parts[1].parse().ok()?, parts[2].parse().ok()?])
}

fn build_date(year: u32, month: u32, day: u32) -> Option<NaiveDate> {
    let year = if year < 100 { 2000 + year } else { year };
    NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, day)
}

fn parse_generic(raw: &str) -> Option<NaiveDate> {
    for fmt in GENERIC_DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(d);
        }
    }
    for fmt in GENERIC_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    parse_russian_long(raw)
}

/// "15 марта 2024" / "1 янв. 2023 г."
fn parse_russian_long(raw: &str) -> Option<NaiveDate> {
    let mut parts = raw.split_whitespace();
    let day: u32 = parts.next()?.parse().ok()?;
    let month = month_from_name(parts.next()?)?;
    let year: i32 = parts.next()?.trim_end_matches(['г', '.']).parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Resolve a month given as a number ("3", "03") or a name ("март", "марта", "Mar").
pub fn resolve_month(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<u32>() {
        return (1..=12).contains(&n).then_some(n);
    }
    // Excel sometimes stores month numbers as floats.
    if let Ok(f) = raw.parse::<f64>() {
        if f.fract() == 0.0 && (1.0..=12.0).contains(&f) {
            return Some(f as u32);
        }
        return None;
    }
    month_from_name(raw)
}

pub fn month_from_name(raw: &str) -> Option<u32> {
    let lower = raw.trim().trim_end_matches('.').to_lowercase();
    if !lower.chars().all(char::is_alphabetic) {
        return None;
    }
    let stem: String = lower.chars().take(3).collect();
    if stem.chars().count() < 3 {
        return None;
    }
    MONTH_STEMS.iter().find(|(s, _)| *s == stem).map(|(_, m)| *m)
}

pub fn month_name_ru(month: u32) -> Option<&'static str> {
    MONTH_NAMES_RU.get(month.checked_sub(1)? as usize).copied()
}

pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    if !(0.0..=2_958_465.0).contains(&serial) {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(chrono::Duration::days(serial.trunc() as i64))
}
