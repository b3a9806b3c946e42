use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Local};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::classifier::{classify, SheetKind, TABLE_VERSION};
use crate::error::Result;
use crate::loader::{load_file, Sheet};
use crate::models::{identity_from_json, Endpoint, NormalizedRecord};
use crate::report::{ImportReport, SheetReport};
use crate::transform::{transform_sheet, TransformOptions, TransformOutcome};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn compute_checksum(file_path: &Path) -> Result<String> {
    let data = std::fs::read(file_path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{cut}…")
    }
}

// ---------------------------------------------------------------------------
// Record sinks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CreateError {
    #[error("HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("request failed: {0}")]
    Transport(String),
}

impl CreateError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            Self::Transport(_) => None,
        }
    }
}

/// Where normalized records go. One call per record, each finished before
/// the next one starts.
pub trait RecordSink {
    fn create(&mut self, endpoint: Endpoint, body: &Value) -> std::result::Result<(), CreateError>;

    /// Existing rows of a collection, used to skip records already present.
    fn list(&mut self, endpoint: Endpoint) -> std::result::Result<Vec<Value>, CreateError>;
}

pub struct ApiClient {
    client: reqwest::blocking::Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    pub fn new(base_url: &str, token: &str, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn url(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }
}

impl RecordSink for ApiClient {
    fn create(&mut self, endpoint: Endpoint, body: &Value) -> std::result::Result<(), CreateError> {
        let resp = self
            .client
            .post(self.url(endpoint))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .map_err(|e| CreateError::Transport(e.to_string()))?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().unwrap_or_default();
        Err(CreateError::Rejected {
            status: status.as_u16(),
            body: truncate(body.trim(), 200),
        })
    }

    fn list(&mut self, endpoint: Endpoint) -> std::result::Result<Vec<Value>, CreateError> {
        let resp = self
            .client
            .get(self.url(endpoint))
            .bearer_auth(&self.token)
            .send()
            .map_err(|e| CreateError::Transport(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(CreateError::Rejected {
                status: status.as_u16(),
                body: truncate(resp.text().unwrap_or_default().trim(), 200),
            });
        }
        let value: Value = resp.json().map_err(|e| CreateError::Transport(e.to_string()))?;
        Ok(unwrap_collection(value))
    }
}

/// Accept a bare array or the usual `{"data": [...]}` / `{"items": [...]}` envelopes.
fn unwrap_collection(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(mut map) => ["data", "items", "rows", "results"]
            .iter()
            .find_map(|k| match map.remove(*k) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Accepts everything without sending it anywhere.
#[derive(Debug, Default)]
pub struct DryRunSink {
    pub accepted: usize,
}

impl RecordSink for DryRunSink {
    fn create(&mut self, endpoint: Endpoint, body: &Value) -> std::result::Result<(), CreateError> {
        log::debug!("dry run: POST {} {body}", endpoint.path());
        self.accepted += 1;
        Ok(())
    }

    fn list(&mut self, _endpoint: Endpoint) -> std::result::Result<Vec<Value>, CreateError> {
        Ok(Vec::new())
    }
}

// ---------------------------------------------------------------------------
// Existing-record cache
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub endpoint: Endpoint,
    /// Sorted, comma-joined years the batch covers; empty for "all".
    pub filter: String,
}

impl CacheKey {
    pub fn for_batch(endpoint: Endpoint, records: &[NormalizedRecord]) -> Self {
        let years: BTreeSet<i32> = records.iter().filter_map(NormalizedRecord::year).collect();
        let filter = years
            .iter()
            .map(i32::to_string)
            .collect::<Vec<_>>()
            .join(",");
        Self { endpoint, filter }
    }

    fn years(&self) -> HashSet<i32> {
        self.filter.split(',').filter_map(|y| y.parse().ok()).collect()
    }
}

#[derive(Debug)]
struct CacheEntry {
    fetched_at: DateTime<Local>,
    keys: HashSet<String>,
}

/// Identity keys of records the API already holds, per collection and year filter.
/// Lives for one import run and is passed down explicitly.
#[derive(Debug, Default)]
pub struct ExistingCache {
    entries: HashMap<CacheKey, CacheEntry>,
}

impl ExistingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch `key`'s collection unless it is already cached. Returns false
    /// when the fetch failed; callers then import without de-duplication.
    pub fn ensure(&mut self, sink: &mut dyn RecordSink, key: &CacheKey) -> bool {
        if let Some(at) = self.fetched_at(key) {
            log::debug!("{}: reusing list fetched at {}", key.endpoint.path(), at.format("%H:%M:%S"));
            return true;
        }
        match sink.list(key.endpoint) {
            Ok(items) => {
                let years = key.years();
                let keys: HashSet<String> = items
                    .iter()
                    .filter(|item| years.is_empty() || json_year(item).map_or(true, |y| years.contains(&y)))
                    .filter_map(|item| identity_from_json(key.endpoint, item))
                    .collect();
                log::info!(
                    "{}: {} existing records for years [{}]",
                    key.endpoint.path(),
                    keys.len(),
                    key.filter
                );
                self.entries.insert(
                    key.clone(),
                    CacheEntry {
                        fetched_at: Local::now(),
                        keys,
                    },
                );
                true
            }
            Err(e) => {
                log::warn!("could not list {}: {e}; importing without duplicate check", key.endpoint.path());
                self.invalidate(key);
                false
            }
        }
    }

    pub fn contains(&self, key: &CacheKey, identity: &str) -> bool {
        self.entries.get(key).is_some_and(|e| e.keys.contains(identity))
    }

    pub fn insert(&mut self, key: &CacheKey, identity: String) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.keys.insert(identity);
        }
    }

    pub fn invalidate(&mut self, key: &CacheKey) {
        self.entries.remove(key);
    }

    pub fn fetched_at(&self, key: &CacheKey) -> Option<DateTime<Local>> {
        self.entries.get(key).map(|e| e.fetched_at)
    }
}

fn json_year(item: &Value) -> Option<i32> {
    if let Some(y) = item.get("year").and_then(Value::as_i64) {
        return i32::try_from(y).ok();
    }
    item.get("date")
        .and_then(Value::as_str)
        .and_then(|d| d.get(..4))
        .and_then(|y| y.parse().ok())
}

// ---------------------------------------------------------------------------
// Posting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub index: usize,
    pub error: CreateError,
}

#[derive(Debug, Default)]
pub struct BatchResult {
    pub imported: usize,
    pub already_present: usize,
    pub rejected: Vec<Rejection>,
}

/// Post `records` one at a time. A rejected record is logged and counted and
/// the batch carries on.
pub fn import_records(
    sink: &mut dyn RecordSink,
    records: &[NormalizedRecord],
    mut cache: Option<&mut ExistingCache>,
    progress: &mut dyn FnMut(usize),
) -> BatchResult {
    let mut result = BatchResult::default();

    let mut keys: HashMap<Endpoint, CacheKey> = HashMap::new();
    if let Some(cache) = cache.as_deref_mut() {
        let mut by_endpoint: HashMap<Endpoint, Vec<NormalizedRecord>> = HashMap::new();
        for record in records {
            by_endpoint.entry(record.endpoint()).or_default().push(record.clone());
        }
        for (endpoint, batch) in by_endpoint {
            let key = CacheKey::for_batch(endpoint, &batch);
            if cache.ensure(sink, &key) {
                keys.insert(endpoint, key);
            }
        }
    }

    for (index, record) in records.iter().enumerate() {
        let endpoint = record.endpoint();
        let identity = record.identity();
        let key = keys.get(&endpoint);

        if let (Some(cache), Some(key)) = (cache.as_deref(), key) {
            if cache.contains(key, &identity) {
                log::debug!("{} {identity}: already present", endpoint.path());
                result.already_present += 1;
                progress(index + 1);
                continue;
            }
        }

        match sink.create(endpoint, &record.to_json()) {
            Ok(()) => {
                result.imported += 1;
                if let (Some(cache), Some(key)) = (cache.as_deref_mut(), key) {
                    cache.insert(key, identity);
                }
            }
            Err(error) => {
                match error.status() {
                    Some(status) => log::warn!("POST {} rejected with HTTP {status}: {error}", endpoint.path()),
                    None => log::warn!("POST {} failed: {error}", endpoint.path()),
                }
                result.rejected.push(Rejection { index, error });
            }
        }
        progress(index + 1);
    }
    result
}

// ---------------------------------------------------------------------------
// Planning and the full run
// ---------------------------------------------------------------------------

/// A loaded sheet, its kind and the transformer's output.
#[derive(Debug)]
pub struct SheetPlan {
    pub name: String,
    pub kind: SheetKind,
    pub outcome: TransformOutcome,
}

#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    /// Force every sheet to this kind instead of classifying by name.
    pub kind: Option<SheetKind>,
    /// Only process the sheet with this display name.
    pub sheet: Option<String>,
    pub transform: TransformOptions,
}

pub fn plan_sheets(sheets: &[Sheet], opts: &PlanOptions) -> Vec<SheetPlan> {
    log::debug!("planning {} sheets (name table v{TABLE_VERSION})", sheets.len());
    sheets
        .iter()
        .filter(|s| {
            opts.sheet
                .as_deref()
                .map_or(true, |wanted| s.name.trim() == wanted.trim())
        })
        .map(|sheet| {
            let kind = opts.kind.unwrap_or_else(|| classify(&sheet.name));
            if kind.is_importable() {
                log::info!("sheet {:?} classified as {kind}", sheet.name);
            } else {
                log::info!("sheet {:?} not recognised, skipped", sheet.name);
            }
            SheetPlan {
                name: sheet.name.clone(),
                kind,
                outcome: transform_sheet(kind, sheet, &opts.transform),
            }
        })
        .collect()
}

pub fn plan_file(file_path: &Path, opts: &PlanOptions) -> Result<Vec<SheetPlan>> {
    let sheets = load_file(file_path)?;
    Ok(plan_sheets(&sheets, opts))
}

/// Post every planned record and collect the per-sheet report.
/// `progress` receives (processed, total) across all sheets.
pub fn run_import(
    file_name: &str,
    plans: &[SheetPlan],
    sink: &mut dyn RecordSink,
    skip_existing: bool,
    progress: &mut dyn FnMut(usize, usize),
) -> ImportReport {
    let total: usize = plans
        .iter()
        .filter(|p| p.kind.is_importable())
        .map(|p| p.outcome.records.len())
        .sum();
    let mut cache = ExistingCache::new();
    let mut report = ImportReport::new(file_name);
    let mut done = 0usize;

    for plan in plans {
        if !plan.kind.is_importable() {
            report.unknown_sheets.push(plan.name.clone());
            continue;
        }
        let cache_arg = if skip_existing { Some(&mut cache) } else { None };
        let batch = import_records(sink, &plan.outcome.records, cache_arg, &mut |n| {
            progress(done + n, total)
        });
        done += plan.outcome.records.len();

        log::info!(
            "sheet {:?}: {} imported, {} rejected, {} already present",
            plan.name,
            batch.imported,
            batch.rejected.len(),
            batch.already_present
        );
        report.sheets.push(SheetReport::from_parts(plan, &batch));
    }
    report
}
