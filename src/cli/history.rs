use comfy_table::{Cell, Color, Table};

use crate::db::{get_connection, init_db, list_runs};
use crate::error::Result;
use crate::fmt::thousands;
use crate::settings::load_settings;

pub fn run(limit: usize) -> Result<()> {
    let settings = load_settings();
    let db_path = settings.journal_path();
    if !db_path.exists() {
        println!("No imports yet. Run `roadstat init` to set up.");
        return Ok(());
    }
    let conn = get_connection(&db_path)?;
    init_db(&conn)?;
    let runs = list_runs(&conn, limit)?;
    if runs.is_empty() {
        println!("No imports yet.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "When", "File", "Sheets", "Records", "Imported", "Rejected", "Errors", "API"]);
    for run in runs {
        let rejected = if run.rejected > 0 {
            Cell::new(thousands(run.rejected as u64)).fg(Color::Red)
        } else {
            Cell::new(0)
        };
        table.add_row(vec![
            Cell::new(run.id),
            Cell::new(run.started_at),
            Cell::new(run.filename),
            Cell::new(run.sheets),
            Cell::new(thousands(run.records as u64)),
            Cell::new(thousands(run.imported as u64)),
            rejected,
            Cell::new(run.parse_errors),
            Cell::new(run.api_url.unwrap_or_default()),
        ]);
    }
    println!("Import history\n{table}");
    Ok(())
}
