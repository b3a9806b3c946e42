use std::io::{IsTerminal, Write};
use std::path::PathBuf;

use crate::cli::plan_options;
use crate::db::{find_by_checksum, get_connection, init_db, record_run};
use crate::error::Result;
use crate::importer::{compute_checksum, plan_file, run_import, ApiClient, DryRunSink, RecordSink};
use crate::report::render;
use crate::settings::load_settings;

pub struct ImportArgs {
    pub file: String,
    pub kind: Option<String>,
    pub sheet: Option<String>,
    pub api_url: Option<String>,
    pub token: Option<String>,
    pub skip_existing: bool,
    pub force: bool,
    pub dry_run: bool,
}

/// Renders `[n/total]` on stderr when it is a terminal.
fn progress_printer() -> impl FnMut(usize, usize) {
    let show = std::io::stderr().is_terminal();
    move |done, total| {
        if show {
            eprint!("\r[{done}/{total}]");
            let _ = std::io::stderr().flush();
            if done == total {
                eprintln!();
            }
        }
    }
}

pub fn run(args: ImportArgs) -> Result<()> {
    let settings = load_settings();
    let opts = plan_options(&settings, args.kind.as_deref(), args.sheet.clone())?;
    let file_path = PathBuf::from(&args.file);
    let file_name = file_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| args.file.clone());

    if args.dry_run {
        let plans = plan_file(&file_path, &opts)?;
        let mut sink = DryRunSink::default();
        let report = run_import(&file_name, &plans, &mut sink, false, &mut |_, _| {});
        log::info!("dry run: {} records accepted, nothing sent", sink.accepted);
        print!("{}", render(&report, true));
        return Ok(());
    }

    let token = settings.resolve_token(args.token.as_deref())?;
    let api_url = settings.resolve_api_url(args.api_url.as_deref());

    let checksum = compute_checksum(&file_path)?;
    let conn = get_connection(&settings.journal_path())?;
    init_db(&conn)?;
    if !args.force {
        if let Some(when) = find_by_checksum(&conn, &checksum)? {
            println!("This file was already imported on {when} (same checksum). Use --force to import it again.");
            return Ok(());
        }
    }

    let plans = plan_file(&file_path, &opts)?;
    log::info!("importing {file_name} into {api_url}");
    let mut client = ApiClient::new(&api_url, &token, settings.timeout_secs)?;
    let sink: &mut dyn RecordSink = &mut client;
    let mut progress = progress_printer();
    let report = run_import(&file_name, &plans, sink, args.skip_existing, &mut progress);

    record_run(&conn, &checksum, &api_url, &report)?;
    print!("{}", render(&report, false));
    Ok(())
}
