use std::path::PathBuf;

use serde_json::{json, Value};

use crate::cli::plan_options;
use crate::error::Result;
use crate::importer::{plan_file, SheetPlan};
use crate::settings::load_settings;
use crate::transform::RowIssue;

fn issues_json(issues: &[RowIssue]) -> Value {
    issues
        .iter()
        .map(|i| json!({"row": i.row_number, "message": i.message}))
        .collect()
}

fn plan_json(plan: &SheetPlan) -> Value {
    let records: Vec<Value> = plan
        .outcome
        .records
        .iter()
        .map(|r| json!({"endpoint": r.endpoint().path(), "body": r.to_json()}))
        .collect();
    json!({
        "sheet": plan.name,
        "kind": plan.kind.key(),
        "rowsSeen": plan.outcome.rows_seen,
        "records": records,
        "errors": issues_json(&plan.outcome.errors),
        "warnings": issues_json(&plan.outcome.warnings),
        "skippedEmpty": plan.outcome.skipped_empty,
        "trimmedTail": plan.outcome.trimmed_tail,
    })
}

pub fn run(file: &str, kind: Option<&str>, sheet: Option<String>, output: Option<String>) -> Result<()> {
    let settings = load_settings();
    let opts = plan_options(&settings, kind, sheet)?;
    let plans = plan_file(&PathBuf::from(file), &opts)?;

    let doc: Value = plans.iter().map(plan_json).collect();
    let text = serde_json::to_string_pretty(&doc)?;

    match output {
        Some(path) => {
            std::fs::write(&path, format!("{text}\n"))?;
            let records: usize = plans.iter().map(|p| p.outcome.records.len()).sum();
            println!("Wrote {records} records from {} sheets to {path}", plans.len());
        }
        None => println!("{text}"),
    }
    Ok(())
}
