use chrono::Datelike;

use super::fines::DATE_ALIASES;
use super::{cell, dated_rows, parse_count, ColumnResolver, TransformOptions, TransformOutcome, DISTRICT_ALIASES};
use crate::loader::RawRow;
use crate::models::{EvacuationRecord, NormalizedRecord};

pub(crate) const RECEIPTS_ALIASES: &[&str] = &["поступлен", "оплат", "сумм", "receipts"];
pub(crate) const TRIPS_ALIASES: &[&str] = &["рейс", "выезд", "trips"];
pub(crate) const EVACUATIONS_ALIASES: &[&str] = &["эвакуир", "эвакуац", "перемещ", "evacuations"];

pub fn transform(rows: &[RawRow], opts: &TransformOptions) -> TransformOutcome {
    let mut cols = ColumnResolver::new(rows);
    let date = cols.take(DATE_ALIASES);
    // Claimed first: "Сумма поступлений за эвакуацию" also matches the evacuation stems.
    let receipts = cols.take(RECEIPTS_ALIASES);
    let trips = cols.take(TRIPS_ALIASES);
    let evacuations = cols.take(EVACUATIONS_ALIASES);
    let district = cols.take(DISTRICT_ALIASES);

    let mut outcome = TransformOutcome::default();
    for (row, d) in dated_rows(rows, &date, &mut outcome) {
        outcome.records.push(NormalizedRecord::Evacuation(EvacuationRecord {
            date: d,
            year: d.year(),
            month: d.month(),
            trips_count: parse_count(cell(row, &trips)),
            evacuations_count: parse_count(cell(row, &evacuations)),
            receipts_amount: parse_count(cell(row, &receipts)),
            district: opts.district(cell(row, &district)),
        }));
    }
    outcome
}
