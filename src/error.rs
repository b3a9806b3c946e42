use thiserror::Error;

#[derive(Error, Debug)]
pub enum RoadstatError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[cfg(feature = "xlsx")]
    #[error("Workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown sheet kind: {0}")]
    UnknownKind(String),

    #[error("No sheets found in {0}")]
    NoSheets(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFile(String),

    #[error("No API token configured (run `roadstat token` or set ROADSTAT_TOKEN)")]
    MissingToken,

    #[error("Settings error: {0}")]
    Settings(String),
}

pub type Result<T> = std::result::Result<T, RoadstatError>;
