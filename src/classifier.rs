//! Sheet-name classification.
//!
//! Exact names are looked up first; only names missing from the table go
//! through the substring rules. `SheetKind::Unknown` is a regular outcome:
//! such sheets are listed in the report and left out of the import.

use std::fmt;

use crate::error::{Result, RoadstatError};

/// Bump when entries are added, removed or reordered.
pub const TABLE_VERSION: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SheetKind {
    Fines,
    Evacuations,
    TrafficLights,
    Transport,
    FinesAnalytics,
    EvacuationAnalytics,
    Unknown,
}

impl SheetKind {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Fines => "fines",
            Self::Evacuations => "evacuations",
            Self::TrafficLights => "traffic-lights",
            Self::Transport => "transport",
            Self::FinesAnalytics => "fines-analytics",
            Self::EvacuationAnalytics => "evacuation-analytics",
            Self::Unknown => "unknown",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Fines => "Fines",
            Self::Evacuations => "Evacuations",
            Self::TrafficLights => "Traffic lights",
            Self::Transport => "Transport routes",
            Self::FinesAnalytics => "Fines analytics",
            Self::EvacuationAnalytics => "Evacuation analytics",
            Self::Unknown => "Unknown",
        }
    }

    pub fn is_importable(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl fmt::Display for SheetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

const ALL_KINDS: &[SheetKind] = &[
    SheetKind::Fines,
    SheetKind::Evacuations,
    SheetKind::TrafficLights,
    SheetKind::Transport,
    SheetKind::FinesAnalytics,
    SheetKind::EvacuationAnalytics,
];

/// Look up a kind by its `--kind` key.
pub fn get_by_key(key: &str) -> Result<SheetKind> {
    ALL_KINDS
        .iter()
        .find(|k| k.key() == key.trim())
        .copied()
        .ok_or_else(|| RoadstatError::UnknownKind(key.to_string()))
}

// Compared case-insensitively after trimming.
const EXACT_NAMES: &[(&str, SheetKind)] = &[
    ("Штрафы", SheetKind::Fines),
    ("Штрафы 2023", SheetKind::Fines),
    ("Штрафы 2024", SheetKind::Fines),
    ("Штрафы 2025", SheetKind::Fines),
    ("Эвакуация", SheetKind::Evacuations),
    ("Эвакуация 2023", SheetKind::Evacuations),
    ("Эвакуация 2024", SheetKind::Evacuations),
    ("Эвакуация 2025", SheetKind::Evacuations),
    ("Эвакуатор", SheetKind::Evacuations),
    ("Маршруты эвакуаторов", SheetKind::Evacuations),
    ("Светофоры", SheetKind::TrafficLights),
    ("Светофорные объекты", SheetKind::TrafficLights),
    ("Маршруты", SheetKind::Transport),
    ("Транспорт", SheetKind::Transport),
    ("Общественный транспорт", SheetKind::Transport),
    ("Аналитика штрафов", SheetKind::FinesAnalytics),
    ("Штрафы (аналитика)", SheetKind::FinesAnalytics),
    ("Штрафы по годам", SheetKind::FinesAnalytics),
    ("Аналитика эвакуации", SheetKind::EvacuationAnalytics),
    ("Эвакуация (аналитика)", SheetKind::EvacuationAnalytics),
    ("Эвакуация по годам", SheetKind::EvacuationAnalytics),
    ("fines", SheetKind::Fines),
    ("evacuations", SheetKind::Evacuations),
    ("traffic_lights", SheetKind::TrafficLights),
    ("transport", SheetKind::Transport),
];

/// Substring rules, first match wins. Rollup rules sit above their
/// monthly counterparts so "Аналитика штрафов" never lands on fines.
const SUBSTRING_RULES: &[(&[&str], &[&str], SheetKind)] = &[
    (&["штраф"], &["аналит", "по годам", "итог"], SheetKind::FinesAnalytics),
    (&["эваку"], &["аналит", "по годам", "итог"], SheetKind::EvacuationAnalytics),
    (&["маршрут", "транспорт"], &[], SheetKind::Transport),
    (&["светофор"], &[], SheetKind::TrafficLights),
    (&["эваку"], &[], SheetKind::Evacuations),
    (&["штраф"], &[], SheetKind::Fines),
];

/// Classify a sheet by its display name.
pub fn classify(sheet_name: &str) -> SheetKind {
    let name = sheet_name.trim().to_lowercase();
    if name.is_empty() {
        return SheetKind::Unknown;
    }

    if let Some((_, kind)) = EXACT_NAMES.iter().find(|(n, _)| n.to_lowercase() == name) {
        log::debug!("sheet {sheet_name:?}: exact match -> {kind}");
        return *kind;
    }

    for (any_of, also_any_of, kind) in SUBSTRING_RULES {
        let subject = any_of.iter().any(|s| name.contains(s));
        let qualifier = also_any_of.is_empty() || also_any_of.iter().any(|s| name.contains(s));
        if subject && qualifier {
            log::debug!("sheet {sheet_name:?}: substring rule -> {kind}");
            return *kind;
        }
    }

    SheetKind::Unknown
}
