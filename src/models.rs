use chrono::NaiveDate;
use serde::Serialize;

/// Month value carried by yearly rollups in place of a calendar month.
pub const WHOLE_YEAR_MONTH: u32 = 0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FineRecord {
    pub date: NaiveDate,
    pub year: i32,
    pub month: u32,
    pub violations_count: u64,
    pub resolutions_count: u64,
    pub imposed_amount: u64,
    pub collected_amount: u64,
    pub district: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvacuationRecord {
    pub date: NaiveDate,
    pub year: i32,
    pub month: u32,
    pub trips_count: u64,
    pub evacuations_count: u64,
    pub receipts_amount: u64,
    pub district: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficLightRecord {
    pub address: String,
    #[serde(rename = "type")]
    pub light_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installation_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installation_date: Option<NaiveDate>,
    pub district: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteStop {
    pub street: String,
    pub houses: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportRouteRecord {
    pub year: i32,
    pub month: u32,
    pub month_name: String,
    pub route: String,
    pub route_stops: Vec<RouteStop>,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FineTotals {
    pub violations_count: u64,
    pub resolutions_count: u64,
    pub imposed_amount: u64,
    pub collected_amount: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvacuationTotals {
    pub trips_count: u64,
    pub evacuations_count: u64,
    pub receipts_amount: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SnapshotTotals {
    Fines(FineTotals),
    Evacuations(EvacuationTotals),
}

/// Yearly rollup row from an analytics sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSnapshot {
    pub period: String,
    pub date: NaiveDate,
    pub year: i32,
    pub month: u32,
    pub district: String,
    #[serde(flatten)]
    pub totals: SnapshotTotals,
}

/// REST collection a record is created in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Fines,
    Evacuations,
    TrafficLights,
    Transport,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Fines => "/fines",
            Self::Evacuations => "/evacuations",
            Self::TrafficLights => "/traffic-lights",
            Self::Transport => "/transport",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NormalizedRecord {
    Fine(FineRecord),
    Evacuation(EvacuationRecord),
    TrafficLight(TrafficLightRecord),
    Transport(TransportRouteRecord),
    Snapshot(AnalyticsSnapshot),
}

impl NormalizedRecord {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            Self::Fine(_) => Endpoint::Fines,
            Self::Evacuation(_) => Endpoint::Evacuations,
            Self::TrafficLight(_) => Endpoint::TrafficLights,
            Self::Transport(_) => Endpoint::Transport,
            Self::Snapshot(s) => match s.totals {
                SnapshotTotals::Fines(_) => Endpoint::Fines,
                SnapshotTotals::Evacuations(_) => Endpoint::Evacuations,
            },
        }
    }

    /// Year the record belongs to, if it has one.
    pub fn year(&self) -> Option<i32> {
        match self {
            Self::Fine(r) => Some(r.year),
            Self::Evacuation(r) => Some(r.year),
            Self::TrafficLight(r) => r.installation_year,
            Self::Transport(r) => Some(r.year),
            Self::Snapshot(r) => Some(r.year),
        }
    }

    /// Natural key used to recognise a record the API already holds.
    pub fn identity(&self) -> String {
        match self {
            Self::Fine(r) => format!("{}|{}|{}", r.date, r.month, r.district.to_lowercase()),
            Self::Evacuation(r) => format!("{}|{}|{}", r.date, r.month, r.district.to_lowercase()),
            Self::TrafficLight(r) => r.address.to_lowercase(),
            Self::Transport(r) => format!("{}|{}|{}", r.year, r.month, r.route.to_lowercase()),
            Self::Snapshot(r) => format!("{}|{}|{}", r.date, r.month, r.district.to_lowercase()),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        // Serializing plain structs of strings and integers cannot fail.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Identity key of a record as returned by the API's list endpoint.
pub fn identity_from_json(endpoint: Endpoint, value: &serde_json::Value) -> Option<String> {
    let text = |key: &str| value.get(key).and_then(|v| v.as_str()).map(str::to_string);
    let int = |key: &str| {
        value.get(key).and_then(|v| {
            v.as_i64()
                .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
        })
    };
    match endpoint {
        Endpoint::Fines | Endpoint::Evacuations => {
            // Servers commonly return full timestamps; the date part is what we key on.
            let date = text("date")?;
            let date = date.get(..10).unwrap_or(&date).to_string();
            let month = int("month")?;
            let district = text("district").unwrap_or_default();
            Some(format!("{date}|{month}|{}", district.to_lowercase()))
        }
        Endpoint::TrafficLights => text("address").map(|a| a.to_lowercase()),
        Endpoint::Transport => {
            let year = int("year")?;
            let month = int("month")?;
            let route = text("route")?;
            Some(format!("{year}|{month}|{}", route.to_lowercase()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fine() -> FineRecord {
        FineRecord {
            date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            year: 2024,
            month: 3,
            violations_count: 120,
            resolutions_count: 98,
            imposed_amount: 150000,
            collected_amount: 90000,
            district: "Центральный".to_string(),
        }
    }

    #[test]
    fn test_fine_serializes_camel_case() {
        let json = NormalizedRecord::Fine(fine()).to_json();
        assert_eq!(json["date"], "2024-03-15");
        assert_eq!(json["violationsCount"], 120);
        assert_eq!(json["collectedAmount"], 90000);
        assert_eq!(json["district"], "Центральный");
    }

    #[test]
    fn test_snapshot_flattens_totals_and_targets_collection() {
        let snap = AnalyticsSnapshot {
            period: "2023 год".to_string(),
            date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            year: 2023,
            month: WHOLE_YEAR_MONTH,
            district: "Не указан".to_string(),
            totals: SnapshotTotals::Evacuations(EvacuationTotals {
                trips_count: 10,
                evacuations_count: 8,
                receipts_amount: 24000,
            }),
        };
        let record = NormalizedRecord::Snapshot(snap);
        assert_eq!(record.endpoint(), Endpoint::Evacuations);
        let json = record.to_json();
        assert_eq!(json["month"], 0);
        assert_eq!(json["tripsCount"], 10);
        assert_eq!(json["period"], "2023 год");
    }

    #[test]
    fn test_traffic_light_type_field_name() {
        let record = NormalizedRecord::TrafficLight(TrafficLightRecord {
            address: "пр. Мира, 5".to_string(),
            light_type: "Т.1".to_string(),
            installation_year: None,
            installation_date: None,
            district: "Не указан".to_string(),
        });
        let json = record.to_json();
        assert_eq!(json["type"], "Т.1");
        assert!(json.get("installationDate").is_none());
    }

    #[test]
    fn test_identity_matches_api_shape() {
        let record = NormalizedRecord::Fine(fine());
        let api = serde_json::json!({
            "id": 7,
            "date": "2024-03-15T00:00:00.000Z",
            "month": 3,
            "district": "ЦЕНТРАЛЬНЫЙ",
        });
        assert_eq!(identity_from_json(Endpoint::Fines, &api), Some(record.identity()));
    }

    #[test]
    fn test_snapshot_identity_differs_from_january_row() {
        let mut january = fine();
        january.date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        january.month = 1;
        let snapshot = AnalyticsSnapshot {
            period: "2024".to_string(),
            date: january.date,
            year: 2024,
            month: WHOLE_YEAR_MONTH,
            district: january.district.clone(),
            totals: SnapshotTotals::Fines(FineTotals {
                violations_count: 0,
                resolutions_count: 0,
                imposed_amount: 0,
                collected_amount: 0,
            }),
        };
        assert_ne!(
            NormalizedRecord::Fine(january).identity(),
            NormalizedRecord::Snapshot(snapshot).identity()
        );
    }

    #[test]
    fn test_transport_identity_accepts_string_numbers() {
        let api = serde_json::json!({"year": "2024", "month": 5, "route": "ул. Мира"});
        assert_eq!(
            identity_from_json(Endpoint::Transport, &api).as_deref(),
            Some("2024|5|ул. мира")
        );
    }
}
