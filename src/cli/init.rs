use std::path::PathBuf;

use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::settings::{load_settings, save_settings, shellexpand_path};

pub fn run(data_dir: Option<String>, api_url: Option<String>, district: Option<String>) -> Result<()> {
    let mut settings = load_settings();

    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    }
    if let Some(url) = api_url {
        settings.api_url = url.trim().trim_end_matches('/').to_string();
    }
    if let Some(name) = district {
        let name = name.trim();
        if !name.is_empty() {
            settings.default_district = name.to_string();
        }
    }

    save_settings(&settings)?;

    let resolved = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(&resolved)?;
    let conn = get_connection(&settings.journal_path())?;
    init_db(&conn)?;

    println!("Initialized roadstat at {}", resolved.display());
    println!("API:       {}", settings.api_url);
    println!("District:  {}", settings.default_district);
    if settings.token.is_none() {
        println!();
        println!("No API token stored yet. Run `roadstat token` to add one.");
    }
    Ok(())
}
