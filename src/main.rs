mod classifier;
mod cli;
mod dates;
mod db;
mod error;
mod fmt;
mod importer;
mod loader;
mod logging;
mod models;
mod report;
mod settings;
mod transform;

use clap::Parser;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    logging::init_logger(cli.verbose);

    let result = match cli.command {
        Commands::Init {
            data_dir,
            api_url,
            district,
        } => cli::init::run(data_dir, api_url, district),
        Commands::Token { clear } => cli::token::run(clear),
        Commands::Inspect { file, kind } => cli::inspect::run(&file, kind.as_deref()),
        Commands::Preview {
            file,
            kind,
            sheet,
            output,
        } => cli::preview::run(&file, kind.as_deref(), sheet, output),
        Commands::Import {
            file,
            kind,
            sheet,
            api_url,
            token,
            skip_existing,
            force,
            dry_run,
        } => cli::import::run(cli::import::ImportArgs {
            file,
            kind,
            sheet,
            api_url,
            token,
            skip_existing,
            force,
            dry_run,
        }),
        Commands::History { limit } => cli::history::run(limit),
        Commands::Status => cli::status::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
