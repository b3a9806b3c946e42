//! Yearly rollup sheets. These carry a title block of varying height above
//! the header, and a free-text period label ("2023 год", "за 2022 г.")
//! instead of a date.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use super::evacuations::{EVACUATIONS_ALIASES, RECEIPTS_ALIASES, TRIPS_ALIASES};
use super::fines::{COLLECTED_ALIASES, IMPOSED_ALIASES, RESOLUTIONS_ALIASES, VIOLATIONS_ALIASES};
use super::{cell, parse_count, ColumnResolver, RowIssue, TransformOptions, TransformOutcome, DISTRICT_ALIASES};
use crate::loader::{RawRow, Sheet};
use crate::models::{
    AnalyticsSnapshot, EvacuationTotals, FineTotals, NormalizedRecord, SnapshotTotals, WHOLE_YEAR_MONTH,
};

/// How many leading rows may hold the title block.
pub const HEADER_SCAN_ROWS: usize = 5;

const PERIOD_ALIASES: &[&str] = &["период", "год", "period", "year"];
const SUMMARY_PREFIXES: &[&str] = &["итог", "всего", "total"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Totals {
    Fines,
    Evacuations,
}

fn year_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:^|\D)((?:19|20)\d{2})(?:\D|$)").expect("year pattern is valid"))
}

pub fn year_from_period(period: &str) -> Option<i32> {
    year_pattern()
        .captures(period)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// First of the leading rows with at least two filled cells. A title block is
/// usually one merged cell per row, so it never qualifies.
pub fn locate_header(sheet: &Sheet) -> Option<usize> {
    sheet
        .rows
        .iter()
        .take(HEADER_SCAN_ROWS)
        .position(|row| row.iter().filter(|c| !c.trim().is_empty()).count() >= 2)
        .or_else(|| sheet.first_non_blank())
}

enum TotalColumns {
    Fines {
        violations: Option<String>,
        resolutions: Option<String>,
        imposed: Option<String>,
        collected: Option<String>,
    },
    Evacuations {
        trips: Option<String>,
        evacuations: Option<String>,
        receipts: Option<String>,
    },
}

impl TotalColumns {
    fn resolve(totals: Totals, cols: &mut ColumnResolver) -> Self {
        match totals {
            Totals::Fines => {
                let resolutions = cols.take(RESOLUTIONS_ALIASES);
                Self::Fines {
                    violations: cols.take(VIOLATIONS_ALIASES),
                    resolutions,
                    imposed: cols.take(IMPOSED_ALIASES),
                    collected: cols.take(COLLECTED_ALIASES),
                }
            }
            Totals::Evacuations => {
                let receipts = cols.take(RECEIPTS_ALIASES);
                Self::Evacuations {
                    trips: cols.take(TRIPS_ALIASES),
                    evacuations: cols.take(EVACUATIONS_ALIASES),
                    receipts,
                }
            }
        }
    }

    fn read(&self, row: &RawRow) -> SnapshotTotals {
        match self {
            Self::Fines {
                violations,
                resolutions,
                imposed,
                collected,
            } => SnapshotTotals::Fines(FineTotals {
                violations_count: parse_count(cell(row, violations)),
                resolutions_count: parse_count(cell(row, resolutions)),
                imposed_amount: parse_count(cell(row, imposed)),
                collected_amount: parse_count(cell(row, collected)),
            }),
            Self::Evacuations {
                trips,
                evacuations,
                receipts,
            } => SnapshotTotals::Evacuations(EvacuationTotals {
                trips_count: parse_count(cell(row, trips)),
                evacuations_count: parse_count(cell(row, evacuations)),
                receipts_amount: parse_count(cell(row, receipts)),
            }),
        }
    }
}

pub fn transform(rows: &[RawRow], totals: Totals, opts: &TransformOptions) -> TransformOutcome {
    let mut cols = ColumnResolver::new(rows);
    let period = cols.take(PERIOD_ALIASES).or_else(|| cols.first());
    let district = cols.take(DISTRICT_ALIASES);
    let columns = TotalColumns::resolve(totals, &mut cols);

    let mut outcome = TransformOutcome::default();
    for row in rows {
        if row.is_blank() {
            outcome.skipped_empty += 1;
            continue;
        }
        let label = cell(row, &period);
        if label.is_empty() {
            outcome.skipped_empty += 1;
            continue;
        }
        let lower = label.to_lowercase();
        if SUMMARY_PREFIXES.iter().any(|p| lower.starts_with(p)) {
            log::debug!("row {}: summary line {label:?} skipped", row.row_number);
            outcome.skipped_empty += 1;
            continue;
        }

        let Some((year, date)) = year_from_period(label)
            .and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1).map(|d| (y, d)))
        else {
            outcome
                .errors
                .push(RowIssue::new(row.row_number, format!("no year in period {label:?}")));
            continue;
        };

        outcome.records.push(NormalizedRecord::Snapshot(AnalyticsSnapshot {
            period: label.to_string(),
            date,
            year,
            month: WHOLE_YEAR_MONTH,
            district: opts.district(cell(row, &district)),
            totals: columns.read(row),
        }));
    }
    outcome
}
