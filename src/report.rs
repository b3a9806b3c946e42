use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::classifier::SheetKind;
use crate::importer::{BatchResult, SheetPlan};
use crate::transform::RowIssue;

pub const PARSE_ERROR_CAVEAT: &str = "Rows with unreadable dates were left out. In historical exports \
this usually means the source data is genuinely missing for those rows, not that the import is broken.";

#[derive(Debug, Clone)]
pub struct SheetReport {
    pub name: String,
    pub kind: SheetKind,
    pub rows_seen: usize,
    pub records: usize,
    pub imported: usize,
    pub rejected: usize,
    pub already_present: usize,
    pub parse_errors: Vec<RowIssue>,
    pub warnings: Vec<RowIssue>,
    pub skipped_empty: usize,
    pub trimmed_tail: usize,
}

impl SheetReport {
    pub fn from_parts(plan: &SheetPlan, batch: &BatchResult) -> Self {
        Self {
            name: plan.name.clone(),
            kind: plan.kind,
            rows_seen: plan.outcome.rows_seen,
            records: plan.outcome.records.len(),
            imported: batch.imported,
            rejected: batch.rejected.len(),
            already_present: batch.already_present,
            parse_errors: plan.outcome.errors.clone(),
            warnings: plan.outcome.warnings.clone(),
            skipped_empty: plan.outcome.skipped_empty,
            trimmed_tail: plan.outcome.trimmed_tail,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    pub file_name: String,
    pub sheets: Vec<SheetReport>,
    pub unknown_sheets: Vec<String>,
}

impl ImportReport {
    pub fn new(file_name: &str) -> Self {
        Self {
            file_name: file_name.to_string(),
            ..Self::default()
        }
    }

    pub fn total_rows(&self) -> usize {
        self.sheets.iter().map(|s| s.rows_seen).sum()
    }

    pub fn total_records(&self) -> usize {
        self.sheets.iter().map(|s| s.records).sum()
    }

    pub fn total_imported(&self) -> usize {
        self.sheets.iter().map(|s| s.imported).sum()
    }

    pub fn total_rejected(&self) -> usize {
        self.sheets.iter().map(|s| s.rejected).sum()
    }

    pub fn total_already_present(&self) -> usize {
        self.sheets.iter().map(|s| s.already_present).sum()
    }

    pub fn total_parse_errors(&self) -> usize {
        self.sheets.iter().map(|s| s.parse_errors.len()).sum()
    }

    pub fn total_warnings(&self) -> usize {
        self.sheets.iter().map(|s| s.warnings.len()).sum()
    }

    pub fn total_skipped_empty(&self) -> usize {
        self.sheets.iter().map(|s| s.skipped_empty).sum()
    }
}

pub fn sheet_table(report: &ImportReport) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        "Sheet", "Kind", "Rows", "Records", "Imported", "Rejected", "Present", "Errors", "Warnings",
        "Empty", "Tail",
    ]);
    for s in &report.sheets {
        table.add_row(vec![
            Cell::new(&s.name),
            Cell::new(s.kind.key()),
            Cell::new(s.rows_seen),
            Cell::new(s.records),
            Cell::new(s.imported),
            Cell::new(s.rejected),
            Cell::new(s.already_present),
            Cell::new(s.parse_errors.len()),
            Cell::new(s.warnings.len()),
            Cell::new(s.skipped_empty),
            Cell::new(s.trimmed_tail),
        ]);
    }
    table
}

/// Summary text shown after an import. `dry_run` changes the wording only.
pub fn render(report: &ImportReport, dry_run: bool) -> String {
    let mut out = String::new();
    let title = if dry_run {
        format!("Dry run: {}", report.file_name)
    } else {
        format!("Import: {}", report.file_name)
    };
    out.push_str(&format!("{}\n", title.bold()));

    if !report.sheets.is_empty() {
        out.push_str(&format!("{}\n", sheet_table(report)));
    }
    for name in &report.unknown_sheets {
        out.push_str(&format!("{} sheet {name:?}: not recognised, not imported\n", "skip".yellow()));
    }

    let imported_label = if dry_run { "would import" } else { "imported" };
    let rejected = report.total_rejected();
    let errors = report.total_parse_errors();
    let warnings = report.total_warnings();
    out.push_str(&format!(
        "{} rows seen, {} {imported_label}, {} rejected, {} already present, {} parse errors, {} warnings, {} empty rows skipped\n",
        report.total_rows(),
        report.total_imported().to_string().green().bold(),
        if rejected > 0 {
            rejected.to_string().red().bold()
        } else {
            rejected.to_string().normal()
        },
        report.total_already_present(),
        if errors > 0 {
            errors.to_string().yellow().bold()
        } else {
            errors.to_string().normal()
        },
        warnings,
        report.total_skipped_empty(),
    ));

    // Warned rows were still imported.
    for s in &report.sheets {
        for issue in &s.warnings {
            out.push_str(&format!(
                "  {} {} row {}: {}\n",
                "warn".yellow(),
                s.name,
                issue.row_number,
                issue.message
            ));
        }
    }

    if errors > 0 {
        for s in &report.sheets {
            for issue in &s.parse_errors {
                out.push_str(&format!("  {} row {}: {}\n", s.name, issue.row_number, issue.message));
            }
        }
        out.push_str(&format!("{} {PARSE_ERROR_CAVEAT}\n", "note:".cyan()));
    }
    if rejected > 0 {
        out.push_str(&format!(
            "{} {rejected} records were refused by the API; see the log for status codes.\n",
            "note:".cyan()
        ));
    }
    out
}
