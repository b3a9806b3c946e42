use std::sync::OnceLock;

use regex::Regex;

use super::{cell, parse_count, ColumnResolver, RowIssue, TransformOptions, TransformOutcome};
use crate::dates::{month_name_ru, resolve_month, MAX_YEAR, MIN_YEAR};
use crate::loader::RawRow;
use crate::models::{NormalizedRecord, RouteStop, TransportRouteRecord};

pub const WAYPOINT_DELIMITER: &str = "→";
const DELIMITER_VARIANTS: &[&str] = &["->", "=>", "⇒", "—>"];

fn stop_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<street>.+?)\s*\(\s*(?:д\.|дд\.|дом[аи]?\.?|houses?)?\s*(?P<houses>[^()]*?)\s*\)$")
            .expect("route stop pattern is valid")
    })
}

/// Split a waypoint chain into stops. "ул. Ленина (д.10-40)" keeps the house
/// range; anything not in that shape becomes a street-only stop.
pub fn parse_route(text: &str) -> Vec<RouteStop> {
    let mut normalized = text.to_string();
    for variant in DELIMITER_VARIANTS {
        normalized = normalized.replace(variant, WAYPOINT_DELIMITER);
    }

    normalized
        .split(WAYPOINT_DELIMITER)
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .map(|waypoint| match stop_pattern().captures(waypoint) {
            Some(caps) if !caps["houses"].is_empty() => RouteStop {
                street: caps["street"].trim().to_string(),
                houses: Some(caps["houses"].to_string()),
            },
            _ => RouteStop {
                street: waypoint.to_string(),
                houses: None,
            },
        })
        .collect()
}

fn parse_active(raw: &str) -> bool {
    let v = raw.trim().to_lowercase();
    !matches!(
        v.as_str(),
        "нет" | "false" | "0" | "неактивен" | "не активен" | "закрыт" | "no"
    )
}

pub fn transform(rows: &[RawRow], _opts: &TransformOptions) -> TransformOutcome {
    let mut cols = ColumnResolver::new(rows);
    let route = cols.take(&["маршрут", "route"]);
    let month = cols.take(&["месяц", "month"]);
    let year = cols.take(&["год", "year"]);
    let active = cols.take(&["актив", "статус", "active"]);

    let mut outcome = TransformOutcome::default();
    for row in rows {
        if row.is_blank() {
            outcome.skipped_empty += 1;
            continue;
        }
        let route_text = cell(row, &route);
        if route_text.is_empty() {
            outcome.skipped_empty += 1;
            continue;
        }

        let year_raw = cell(row, &year);
        let year_value = i32::try_from(parse_count(year_raw)).unwrap_or(0);
        if !(MIN_YEAR..=MAX_YEAR).contains(&year_value) {
            outcome
                .errors
                .push(RowIssue::new(row.row_number, format!("unreadable year {year_raw:?}")));
            continue;
        }

        let month_raw = cell(row, &month);
        let Some(month_value) = resolve_month(month_raw) else {
            outcome
                .errors
                .push(RowIssue::new(row.row_number, format!("unreadable month {month_raw:?}")));
            continue;
        };

        outcome.records.push(NormalizedRecord::Transport(TransportRouteRecord {
            year: year_value,
            month: month_value,
            month_name: month_name_ru(month_value).unwrap_or_default().to_string(),
            route: route_text.to_string(),
            route_stops: parse_route(route_text),
            is_active: parse_active(cell(row, &active)),
        }));
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::test_support::rows;

    #[test]
    fn test_parse_route_with_and_without_houses() {
        let stops = parse_route("ул. Ленина (д.10-40) → ул. Мира");
        assert_eq!(
            stops,
            vec![
                RouteStop {
                    street: "ул. Ленина".to_string(),
                    houses: Some("10-40".to_string()),
                },
                RouteStop {
                    street: "ул. Мира".to_string(),
                    houses: None,
                },
            ]
        );
    }

    #[test]
    fn test_parse_route_delimiter_variants_and_noise() {
        let stops = parse_route("пл. Победы -> ул. Гагарина (дома 1–15)  →  → пр. Мира ()");
        assert_eq!(stops.len(), 3);
        assert_eq!(stops[0].street, "пл. Победы");
        assert_eq!(stops[1].street, "ул. Гагарина");
        assert_eq!(stops[1].houses.as_deref(), Some("1–15"));
        assert_eq!(stops[2].street, "пр. Мира ()");
        assert_eq!(stops[2].houses, None);
    }

    #[test]
    fn test_route_stops_serialize_with_null_houses() {
        let json = serde_json::to_value(parse_route("ул. Мира")).unwrap();
        assert_eq!(json, serde_json::json!([{"street": "ул. Мира", "houses": null}]));
    }

    #[test]
    fn test_month_name_or_number() {
        let r = rows(&[
            &["Год", "Месяц", "Маршрут", "Активен"],
            &["2024", "Март", "ул. Ленина → ул. Мира", ""],
            &["2024", "11", "ул. Мира", "нет"],
        ]);
        let outcome = transform(&r, &TransformOptions::default());
        assert_eq!(outcome.records.len(), 2);
        let NormalizedRecord::Transport(first) = &outcome.records[0] else {
            panic!("expected transport record");
        };
        assert_eq!((first.year, first.month), (2024, 3));
        assert_eq!(first.month_name, "Март");
        assert_eq!(first.route_stops.len(), 2);
        assert!(first.is_active);
        let NormalizedRecord::Transport(second) = &outcome.records[1] else {
            panic!("expected transport record");
        };
        assert_eq!(second.month, 11);
        assert_eq!(second.month_name, "Ноябрь");
        assert!(!second.is_active);
    }

    #[test]
    fn test_gaps_and_errors() {
        let r = rows(&[
            &["Год", "Месяц", "Маршрут"],
            &["2024", "Май", ""],
            &["", "", ""],
            &["2024", "Тринадцатябрь", "ул. Мира"],
            &["24", "Май", "ул. Мира"],
        ]);
        let outcome = transform(&r, &TransformOptions::default());
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.skipped_empty, 2);
        assert_eq!(outcome.error_count(), 2);
    }
}
