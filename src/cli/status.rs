use crate::db::{count_runs, get_connection, init_db, list_runs};
use crate::error::Result;
use crate::fmt::{format_bytes, thousands};
use crate::settings::{load_settings, settings_file_exists, API_URL_ENV, TOKEN_ENV};

pub fn run() -> Result<()> {
    let settings = load_settings();
    let db_path = settings.journal_path();
    let token = settings.resolve_token(None).ok();

    println!("Settings:   {}", if settings_file_exists() { "saved" } else { "(defaults)" });
    println!("Data dir:   {}", settings.data_dir);
    println!("API:        {}", settings.resolve_api_url(None));
    println!("District:   {}", settings.default_district);
    println!("Timeout:    {}s", settings.timeout_secs);
    println!("Token:      {}", if token.is_some() { "set" } else { "(not set)" });
    if std::env::var(API_URL_ENV).is_ok() || std::env::var(TOKEN_ENV).is_ok() {
        println!("            environment overrides active ({API_URL_ENV}/{TOKEN_ENV})");
    }
    println!("Journal:    {}", db_path.display());

    if db_path.exists() {
        let size = std::fs::metadata(&db_path)?.len();
        println!("Size:       {}", format_bytes(size));

        let conn = get_connection(&db_path)?;
        init_db(&conn)?;
        let runs = count_runs(&conn)?;
        println!();
        println!("Imports:    {runs}");
        if let Some(last) = list_runs(&conn, 1)?.into_iter().next() {
            println!(
                "Last:       {} at {} ({} imported, {} rejected)",
                last.filename,
                last.started_at,
                thousands(last.imported as u64),
                last.rejected
            );
        }
    } else {
        println!();
        println!("Journal not found. Run `roadstat init` to set up.");
    }
    Ok(())
}
