use chrono::NaiveDate;

use super::{parse_count, RowIssue, TransformOptions, TransformOutcome};
use crate::dates::{MAX_YEAR, MIN_YEAR};
use crate::loader::RawRow;
use crate::models::{NormalizedRecord, TrafficLightRecord};

// Fixed positions; these exports have no stable header text.
const COL_ADDRESS: usize = 0;
const COL_TYPE: usize = 1;
const COL_YEAR: usize = 2;
const COL_DISTRICT: usize = 3;

pub fn transform(rows: &[RawRow], opts: &TransformOptions) -> TransformOutcome {
    let mut outcome = TransformOutcome::default();

    for row in rows {
        if row.is_blank() {
            outcome.skipped_empty += 1;
            continue;
        }
        let address = row.at(COL_ADDRESS).trim();
        let light_type = row.at(COL_TYPE).trim();
        if address.is_empty() || light_type.is_empty() {
            outcome.warnings.push(RowIssue::new(
                row.row_number,
                "missing address or type, row skipped",
            ));
            continue;
        }

        let year_raw = row.at(COL_YEAR).trim();
        let installation_year = installation_year(year_raw);
        if installation_year.is_none() && !year_raw.is_empty() {
            outcome.warnings.push(RowIssue::new(
                row.row_number,
                format!("installation year {year_raw:?} not understood, left blank"),
            ));
        }

        outcome.records.push(NormalizedRecord::TrafficLight(TrafficLightRecord {
            address: address.to_string(),
            light_type: light_type.to_string(),
            installation_year,
            installation_date: installation_year.and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1)),
            district: opts.district(row.at(COL_DISTRICT)),
        }));
    }
    outcome
}

fn installation_year(raw: &str) -> Option<i32> {
    let year = i32::try_from(parse_count(raw)).ok()?;
    (MIN_YEAR..=MAX_YEAR).contains(&year).then_some(year)
}
