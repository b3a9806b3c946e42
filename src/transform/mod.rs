//! Raw sheet rows to normalized records, one module per sheet kind.
//!
//! Every kind returns a [`TransformOutcome`]. Blank rows and rows without a
//! date are benign gaps and only bump `skipped_empty`; rows whose date (or
//! year/month) is present but unreadable land in `errors`. Nothing here
//! fails: the worst case is an outcome with no records.

pub mod analytics;
pub mod evacuations;
pub mod fines;
pub mod traffic_lights;
pub mod transport;

use chrono::NaiveDate;

use crate::classifier::SheetKind;
use crate::dates::parse_date;
use crate::loader::{RawRow, Sheet};
use crate::models::NormalizedRecord;

pub(crate) const DISTRICT_ALIASES: &[&str] = &["район", "district"];

#[derive(Debug, Clone, PartialEq)]
pub struct RowIssue {
    pub row_number: usize,
    pub message: String,
}

impl RowIssue {
    pub fn new(row_number: usize, message: impl Into<String>) -> Self {
        Self {
            row_number,
            message: message.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct TransformOutcome {
    /// Rows below the header, blank ones included.
    pub rows_seen: usize,
    pub records: Vec<NormalizedRecord>,
    /// Rows with data we could not read. Counted as errors in the report.
    pub errors: Vec<RowIssue>,
    /// Rows dropped for incomplete data that is not a parse failure.
    pub warnings: Vec<RowIssue>,
    pub skipped_empty: usize,
    /// Rows after the last dated row.
    pub trimmed_tail: usize,
}

impl TransformOutcome {
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}

#[derive(Debug, Clone)]
pub struct TransformOptions {
    pub default_district: String,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            default_district: "Не указан".to_string(),
        }
    }
}

impl TransformOptions {
    pub(crate) fn district(&self, raw: &str) -> String {
        let raw = raw.trim();
        if raw.is_empty() {
            self.default_district.clone()
        } else {
            raw.to_string()
        }
    }
}

/// Pick the header row for `kind` and run its transformer.
pub fn transform_sheet(kind: SheetKind, sheet: &Sheet, opts: &TransformOptions) -> TransformOutcome {
    let header = match kind {
        SheetKind::FinesAnalytics | SheetKind::EvacuationAnalytics => analytics::locate_header(sheet),
        _ => sheet.first_non_blank(),
    };
    let Some(header) = header else {
        log::info!("sheet {:?} is empty", sheet.name);
        return TransformOutcome::default();
    };
    let rows = sheet.records(header);

    let mut outcome = match kind {
        SheetKind::Fines => fines::transform(&rows, opts),
        SheetKind::Evacuations => evacuations::transform(&rows, opts),
        SheetKind::TrafficLights => traffic_lights::transform(&rows, opts),
        SheetKind::Transport => transport::transform(&rows, opts),
        SheetKind::FinesAnalytics => analytics::transform(&rows, analytics::Totals::Fines, opts),
        SheetKind::EvacuationAnalytics => {
            analytics::transform(&rows, analytics::Totals::Evacuations, opts)
        }
        SheetKind::Unknown => TransformOutcome::default(),
    };
    outcome.rows_seen = rows.len();

    log::info!(
        "sheet {:?} ({kind}): {} records, {} errors, {} empty, {} trailing rows trimmed",
        sheet.name,
        outcome.records.len(),
        outcome.error_count(),
        outcome.skipped_empty,
        outcome.trimmed_tail,
    );
    for issue in &outcome.errors {
        log::debug!("sheet {:?} row {}: {}", sheet.name, issue.row_number, issue.message);
    }
    for issue in &outcome.warnings {
        log::warn!("sheet {:?} row {}: {}", sheet.name, issue.row_number, issue.message);
    }
    outcome
}

// ---------------------------------------------------------------------------
// Column resolution
// ---------------------------------------------------------------------------

/// Claims header names for fields. Each alias is tried as an exact
/// (case-insensitive) name before any alias is tried as a substring, and a
/// claimed header is never handed out twice.
pub(crate) struct ColumnResolver {
    headers: Vec<String>,
    claimed: Vec<bool>,
}

impl ColumnResolver {
    pub(crate) fn new(rows: &[RawRow]) -> Self {
        let headers: Vec<String> = rows
            .first()
            .map(|r| r.cells.iter().map(|(h, _)| h.clone()).collect())
            .unwrap_or_default();
        let claimed = vec![false; headers.len()];
        Self { headers, claimed }
    }

    pub(crate) fn take(&mut self, aliases: &[&str]) -> Option<String> {
        let lower: Vec<String> = self.headers.iter().map(|h| h.trim().to_lowercase()).collect();
        let free = |i: &usize| !self.claimed[*i];

        let exact = aliases
            .iter()
            .find_map(|a| (0..lower.len()).filter(free).find(|&i| lower[i] == *a));
        let index = exact.or_else(|| {
            aliases
                .iter()
                .find_map(|a| (0..lower.len()).filter(free).find(|&i| lower[i].contains(a)))
        })?;

        self.claimed[index] = true;
        Some(self.headers[index].clone())
    }

    pub(crate) fn first(&self) -> Option<String> {
        self.headers.first().cloned()
    }
}

pub(crate) fn cell<'a>(row: &'a RawRow, column: &Option<String>) -> &'a str {
    column.as_deref().map(|c| row.get(c).trim()).unwrap_or("")
}

// ---------------------------------------------------------------------------
// Coercion
// ---------------------------------------------------------------------------

/// Integer-prefix parse with a zero default: separators and spaces are
/// dropped, then the leading digits are read. "1 234,50" is 1234.
pub fn parse_count(raw: &str) -> u64 {
    let cleaned: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let cleaned = cleaned.strip_prefix('+').unwrap_or(&cleaned);
    let digits: String = cleaned.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Dated rows (fines, evacuations)
// ---------------------------------------------------------------------------

/// Rows that carry a readable date, after trimming the trailing blank tail.
///
/// The tail starts after the last row that has content and a parseable date;
/// everything from there on is spreadsheet padding. Within the kept range
/// blank rows and empty date cells are benign gaps, unreadable dates are
/// errors.
pub(crate) fn dated_rows<'a>(
    rows: &'a [RawRow],
    date_column: &Option<String>,
    outcome: &mut TransformOutcome,
) -> Vec<(&'a RawRow, NaiveDate)> {
    if date_column.is_none() {
        if let Some(first) = rows.iter().find(|r| !r.is_blank()) {
            outcome
                .warnings
                .push(RowIssue::new(first.row_number, "no date column found, sheet ignored"));
        }
        outcome.trimmed_tail = rows.len();
        return Vec::new();
    }

    let last_dated = rows
        .iter()
        .rposition(|r| !r.is_blank() && parse_date(cell(r, date_column)).is_some());
    let keep = last_dated.map_or(0, |i| i + 1);
    outcome.trimmed_tail = rows.len() - keep;

    if keep == 0 {
        if let Some(first) = rows.iter().find(|r| !r.is_blank()) {
            outcome
                .warnings
                .push(RowIssue::new(first.row_number, "no row has a readable date, sheet ignored"));
        }
    }

    let mut dated = Vec::new();
    for row in &rows[..keep] {
        if row.is_blank() {
            outcome.skipped_empty += 1;
            continue;
        }
        let raw = cell(row, date_column);
        if raw.is_empty() {
            outcome.skipped_empty += 1;
            continue;
        }
        match parse_date(raw) {
            Some(date) => dated.push((row, date)),
            None => outcome
                .errors
                .push(RowIssue::new(row.row_number, format!("unreadable date {raw:?}"))),
        }
    }
    dated
}


#[cfg(test)]
mod tests {
    use super::test_support::{rows, sheet};
    use super::*;

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("1500"), 1500);
        assert_eq!(parse_count("1 234 567"), 1234567);
        assert_eq!(parse_count("12\u{a0}500,75"), 12500);
        assert_eq!(parse_count("12.9"), 12);
        assert_eq!(parse_count("+7"), 7);
        assert_eq!(parse_count("-40"), 0);
        assert_eq!(parse_count("н/д"), 0);
        assert_eq!(parse_count(""), 0);
    }

    #[test]
    fn test_resolver_prefers_exact_then_substring() {
        let r = rows(&[&["Дата отчёта", "Дата", "Район"], &["x", "y", "z"]]);
        let mut cols = ColumnResolver::new(&r);
        assert_eq!(cols.take(&["дата"]).as_deref(), Some("Дата"));
        assert_eq!(cols.take(&["дата"]).as_deref(), Some("Дата отчёта"));
        assert_eq!(cols.take(&["дата"]), None);
        assert_eq!(cols.take(DISTRICT_ALIASES).as_deref(), Some("Район"));
    }

    #[test]
    fn test_dated_rows_trims_trailing_blank_tail() {
        let r = rows(&[
            &["Дата", "Кол-во"],
            &["01.01.2024", "1"],
            &["02.01.2024", "2"],
            &["", ""],
            &["", ""],
            &["", ""],
            &["", ""],
            &["", ""],
        ]);
        let mut outcome = TransformOutcome::default();
        let kept = dated_rows(&r, &Some("Дата".to_string()), &mut outcome);
        assert_eq!(kept.len(), 2);
        assert_eq!(outcome.trimmed_tail, 5);
        assert_eq!(outcome.skipped_empty, 0);
        assert_eq!(outcome.error_count(), 0);
    }

    #[test]
    fn test_dated_rows_drops_tail_even_with_content() {
        let r = rows(&[
            &["Дата", "Кол-во"],
            &["01.01.2024", "1"],
            &["Итого", "1"],
            &["", "примечание"],
        ]);
        let mut outcome = TransformOutcome::default();
        let kept = dated_rows(&r, &Some("Дата".to_string()), &mut outcome);
        assert_eq!(kept.len(), 1);
        assert_eq!(outcome.trimmed_tail, 2);
        assert_eq!(outcome.error_count(), 0);
    }

    #[test]
    fn test_dated_rows_classifies_gaps_and_errors() {
        let r = rows(&[
            &["Дата", "Кол-во"],
            &["", ""],
            &["", "5"],
            &["32.01.2024", "3"],
            &["01.02.2024", "4"],
        ]);
        let mut outcome = TransformOutcome::default();
        let kept = dated_rows(&r, &Some("Дата".to_string()), &mut outcome);
        assert_eq!(kept.len(), 1);
        assert_eq!(outcome.skipped_empty, 2);
        assert_eq!(outcome.error_count(), 1);
        assert_eq!(outcome.errors[0].row_number, 4);
    }

    #[test]
    fn test_dated_rows_without_date_column_warns() {
        let r = rows(&[&["Кол-во"], &["5"]]);
        let mut outcome = TransformOutcome::default();
        assert!(dated_rows(&r, &None, &mut outcome).is_empty());
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.error_count(), 0);
    }

    #[test]
    fn test_transform_sheet_unknown_and_empty() {
        let opts = TransformOptions::default();
        let s = sheet(&[&["a"], &["b"]]);
        assert!(transform_sheet(SheetKind::Unknown, &s, &opts).records.is_empty());
        let empty = sheet(&[&["", ""]]);
        assert!(transform_sheet(SheetKind::Fines, &empty, &opts).records.is_empty());
    }

    #[test]
    fn test_transform_sheet_skips_leading_blank_rows() {
        let opts = TransformOptions::default();
        let s = sheet(&[&["", ""], &["Дата", "Выявлено нарушений"], &["15.03.24", "7"]]);
        let outcome = transform_sheet(SheetKind::Fines, &s, &opts);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.rows_seen, 1);
    }
}
