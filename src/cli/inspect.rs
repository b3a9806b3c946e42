use std::path::PathBuf;

use colored::Colorize;
use comfy_table::{Cell, Color, Table};

use crate::cli::plan_options;
use crate::error::Result;
use crate::importer::plan_file;
use crate::settings::load_settings;

pub fn run(file: &str, kind: Option<&str>) -> Result<()> {
    let settings = load_settings();
    let opts = plan_options(&settings, kind, None)?;
    let file_path = PathBuf::from(file);
    let plans = plan_file(&file_path, &opts)?;

    let mut table = Table::new();
    table.set_header(vec!["Sheet", "Kind", "Rows", "Records", "Errors", "Warnings", "Empty", "Tail"]);
    for plan in &plans {
        let kind_cell = if plan.kind.is_importable() {
            Cell::new(format!("{} [{}]", plan.kind.name(), plan.kind.key()))
        } else {
            Cell::new(plan.kind.name()).fg(Color::Yellow)
        };
        let errors = plan.outcome.error_count();
        let errors_cell = if errors > 0 {
            Cell::new(errors).fg(Color::Red)
        } else {
            Cell::new(errors)
        };
        table.add_row(vec![
            Cell::new(&plan.name),
            kind_cell,
            Cell::new(plan.outcome.rows_seen),
            Cell::new(plan.outcome.records.len()),
            errors_cell,
            Cell::new(plan.outcome.warnings.len()),
            Cell::new(plan.outcome.skipped_empty),
            Cell::new(plan.outcome.trimmed_tail),
        ]);
    }
    println!("{}\n{table}", file_path.display().to_string().bold());

    let importable = plans.iter().filter(|p| p.kind.is_importable()).count();
    let records: usize = plans.iter().map(|p| p.outcome.records.len()).sum();
    println!("{importable} of {} sheets importable, {records} records", plans.len());
    if importable < plans.len() {
        println!(
            "{} unrecognised sheets are skipped on import; use --kind to force one.",
            "note:".cyan()
        );
    }
    Ok(())
}
