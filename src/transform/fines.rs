use chrono::Datelike;

use super::{cell, dated_rows, parse_count, ColumnResolver, TransformOptions, TransformOutcome, DISTRICT_ALIASES};
use crate::loader::RawRow;
use crate::models::{FineRecord, NormalizedRecord};

pub(crate) const DATE_ALIASES: &[&str] = &["дата", "date", "период"];
pub(crate) const VIOLATIONS_ALIASES: &[&str] = &["нарушени", "violations"];
pub(crate) const RESOLUTIONS_ALIASES: &[&str] = &["постановлени", "resolutions"];
pub(crate) const IMPOSED_ALIASES: &[&str] = &["наложен", "imposed"];
pub(crate) const COLLECTED_ALIASES: &[&str] = &["взыскан", "collected"];

pub fn transform(rows: &[RawRow], opts: &TransformOptions) -> TransformOutcome {
    let mut cols = ColumnResolver::new(rows);
    let date = cols.take(DATE_ALIASES);
    // "Вынесено постановлений по нарушениям" must not be taken as violations.
    let resolutions = cols.take(RESOLUTIONS_ALIASES);
    let violations = cols.take(VIOLATIONS_ALIASES);
    let imposed = cols.take(IMPOSED_ALIASES);
    let collected = cols.take(COLLECTED_ALIASES);
    let district = cols.take(DISTRICT_ALIASES);

    let mut outcome = TransformOutcome::default();
    for (row, d) in dated_rows(rows, &date, &mut outcome) {
        outcome.records.push(NormalizedRecord::Fine(FineRecord {
            date: d,
            year: d.year(),
            month: d.month(),
            violations_count: parse_count(cell(row, &violations)),
            resolutions_count: parse_count(cell(row, &resolutions)),
            imposed_amount: parse_count(cell(row, &imposed)),
            collected_amount: parse_count(cell(row, &collected)),
            district: opts.district(cell(row, &district)),
        }));
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::test_support::rows;

    const HEADER: &[&str] = &[
        "Дата",
        "Выявлено нарушений",
        "Вынесено постановлений по нарушениям",
        "Наложено штрафов, руб.",
        "Взыскано штрафов, руб.",
        "Район",
    ];

    fn only_fine(outcome: &TransformOutcome, i: usize) -> &FineRecord {
        match &outcome.records[i] {
            NormalizedRecord::Fine(f) => f,
            other => panic!("expected fine, got {other:?}"),
        }
    }

    #[test]
    fn test_maps_columns_and_date() {
        let r = rows(&[
            HEADER,
            &["15.03.24", "120", "98", "150 000", "90 000", "Северный"],
        ]);
        let outcome = transform(&r, &TransformOptions::default());
        assert_eq!(outcome.records.len(), 1);
        let f = only_fine(&outcome, 0);
        assert_eq!((f.year, f.month), (2024, 3));
        assert_eq!(f.date.to_string(), "2024-03-15");
        assert_eq!(f.violations_count, 120);
        assert_eq!(f.resolutions_count, 98);
        assert_eq!(f.imposed_amount, 150000);
        assert_eq!(f.collected_amount, 90000);
        assert_eq!(f.district, "Северный");
    }

    #[test]
    fn test_missing_values_default_to_zero_and_district() {
        let r = rows(&[HEADER, &["01.04.2024", "", "н/д", "", "", ""]]);
        let opts = TransformOptions {
            default_district: "Город".to_string(),
        };
        let outcome = transform(&r, &opts);
        let f = only_fine(&outcome, 0);
        assert_eq!(f.violations_count, 0);
        assert_eq!(f.resolutions_count, 0);
        assert_eq!(f.district, "Город");
    }

    #[test]
    fn test_all_empty_rows_are_not_errors() {
        let r = rows(&[
            HEADER,
            &["01.01.2024", "1", "1", "1", "1", ""],
            &["", "", "", "", "", ""],
            &["", "", "", "", "", ""],
            &["02.01.2024", "2", "2", "2", "2", ""],
        ]);
        let outcome = transform(&r, &TransformOptions::default());
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.skipped_empty, 2);
        assert_eq!(outcome.error_count(), 0);
    }

    #[test]
    fn test_unreadable_date_counts_as_error() {
        let r = rows(&[
            HEADER,
            &["31.02.2024", "5", "", "", "", ""],
            &["01.03.2024", "6", "", "", "", ""],
        ]);
        let outcome = transform(&r, &TransformOptions::default());
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.error_count(), 1);
        assert_eq!(outcome.errors[0].row_number, 2);
    }

    #[test]
    fn test_five_trailing_blank_rows_are_excluded() {
        let mut grid: Vec<&[&str]> = vec![
            HEADER,
            &["01.01.2024", "1", "", "", "", ""],
            &["01.02.2024", "2", "", "", "", ""],
            &["01.03.2024", "3", "", "", "", ""],
        ];
        for _ in 0..5 {
            grid.push(&["", "", "", "", "", ""]);
        }
        let outcome = transform(&rows(&grid), &TransformOptions::default());
        assert_eq!(outcome.records.len(), 3);
        assert_eq!(outcome.trimmed_tail, 5);
        assert_eq!(outcome.skipped_empty, 0);
        assert_eq!(outcome.error_count(), 0);
    }
}
