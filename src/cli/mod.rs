pub mod history;
pub mod import;
pub mod init;
pub mod inspect;
pub mod preview;
pub mod status;
pub mod token;

use clap::{Parser, Subcommand};

use crate::classifier::{get_by_key, SheetKind};
use crate::error::Result;
use crate::importer::PlanOptions;
use crate::settings::Settings;
use crate::transform::TransformOptions;

/// Resolve an optional `--kind` flag to a sheet kind.
pub(crate) fn parse_kind_opt(kind: Option<&str>) -> Result<Option<SheetKind>> {
    kind.map(get_by_key).transpose()
}

pub(crate) fn plan_options(
    settings: &Settings,
    kind: Option<&str>,
    sheet: Option<String>,
) -> Result<PlanOptions> {
    Ok(PlanOptions {
        kind: parse_kind_opt(kind)?,
        sheet,
        transform: TransformOptions {
            default_district: settings.default_district.clone(),
        },
    })
}

#[derive(Parser)]
#[command(
    name = "roadstat",
    version,
    about = "Bulk import of traffic-authority statistics from spreadsheets into the admin API."
)]
pub struct Cli {
    /// Log debug detail to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write settings and create the data directory and import journal.
    Init {
        /// Path for roadstat data (default: ~/Documents/roadstat)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Base URL of the admin API (default: http://localhost:3000/api)
        #[arg(long = "api-url")]
        api_url: Option<String>,
        /// District used when a row names none
        #[arg(long)]
        district: Option<String>,
    },
    /// Store the API bearer token (prompted, not echoed).
    Token {
        /// Remove the stored token instead
        #[arg(long)]
        clear: bool,
    },
    /// Classify the sheets of a file and count what each would produce.
    Inspect {
        /// Path to an XLSX/XLS/ODS workbook or a CSV file
        file: String,
        /// Treat every sheet as this kind (e.g. fines, traffic-lights)
        #[arg(long)]
        kind: Option<String>,
    },
    /// Print the normalized records a file would produce, as JSON.
    Preview {
        file: String,
        #[arg(long)]
        kind: Option<String>,
        /// Only this sheet
        #[arg(long)]
        sheet: Option<String>,
        /// Write JSON here instead of stdout
        #[arg(long)]
        output: Option<String>,
    },
    /// Import a file into the admin API.
    Import {
        file: String,
        #[arg(long)]
        kind: Option<String>,
        #[arg(long)]
        sheet: Option<String>,
        /// Override the configured API URL
        #[arg(long = "api-url")]
        api_url: Option<String>,
        /// Override the stored bearer token
        #[arg(long)]
        token: Option<String>,
        /// Skip records the API already holds
        #[arg(long = "skip-existing")]
        skip_existing: bool,
        /// Import even if this exact file was imported before
        #[arg(long)]
        force: bool,
        /// Parse and report without contacting the API
        #[arg(long = "dry-run")]
        dry_run: bool,
    },
    /// List previous import runs.
    History {
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Show settings, journal location and run counts.
    Status,
}
