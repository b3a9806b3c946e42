use crate::error::{Result, RoadstatError};
use crate::settings::{load_settings, save_settings};

pub fn run(clear: bool) -> Result<()> {
    let mut settings = load_settings();

    if clear {
        settings.token = None;
        save_settings(&settings)?;
        println!("Stored token removed.");
        return Ok(());
    }

    let token = rpassword::prompt_password("API token: ")?;
    let token = token.trim();
    if token.is_empty() {
        return Err(RoadstatError::Settings("token must not be empty".to_string()));
    }
    settings.token = Some(token.to_string());
    save_settings(&settings)?;
    println!("Token saved. It is sent as `Authorization: Bearer …` on every request.");
    Ok(())
}
