use std::path::Path;

use rusqlite::{Connection, OptionalExtension};

use crate::error::Result;
use crate::report::ImportReport;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS imports (
    id INTEGER PRIMARY KEY,
    filename TEXT NOT NULL,
    checksum TEXT NOT NULL,
    started_at TEXT DEFAULT (datetime('now')),
    api_url TEXT,
    sheets INTEGER NOT NULL DEFAULT 0,
    records INTEGER NOT NULL DEFAULT 0,
    imported INTEGER NOT NULL DEFAULT 0,
    rejected INTEGER NOT NULL DEFAULT 0,
    already_present INTEGER NOT NULL DEFAULT 0,
    parse_errors INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_imports_checksum ON imports(checksum);

CREATE TABLE IF NOT EXISTS import_sheets (
    id INTEGER PRIMARY KEY,
    import_id INTEGER NOT NULL,
    sheet_name TEXT NOT NULL,
    kind TEXT NOT NULL,
    rows_seen INTEGER NOT NULL DEFAULT 0,
    records INTEGER NOT NULL DEFAULT 0,
    imported INTEGER NOT NULL DEFAULT 0,
    rejected INTEGER NOT NULL DEFAULT 0,
    parse_errors INTEGER NOT NULL DEFAULT 0,
    skipped_empty INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY (import_id) REFERENCES imports(id)
);
";

#[derive(Debug, Clone)]
pub struct ImportRun {
    pub id: i64,
    pub filename: String,
    pub started_at: String,
    pub api_url: Option<String>,
    pub sheets: i64,
    pub records: i64,
    pub imported: i64,
    pub rejected: i64,
    pub parse_errors: i64,
}

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// When a file with this checksum was last imported, if ever.
pub fn find_by_checksum(conn: &Connection, checksum: &str) -> Result<Option<String>> {
    let started = conn
        .query_row(
            "SELECT started_at FROM imports WHERE checksum = ?1 ORDER BY id DESC LIMIT 1",
            [checksum],
            |row| row.get(0),
        )
        .optional()?;
    Ok(started)
}

pub fn record_run(conn: &Connection, checksum: &str, api_url: &str, report: &ImportReport) -> Result<i64> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO imports (filename, checksum, api_url, sheets, records, imported, rejected, already_present, parse_errors) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        rusqlite::params![
            report.file_name,
            checksum,
            api_url,
            report.sheets.len() as i64,
            report.total_records() as i64,
            report.total_imported() as i64,
            report.total_rejected() as i64,
            report.total_already_present() as i64,
            report.total_parse_errors() as i64,
        ],
    )?;
    let import_id = tx.last_insert_rowid();
    for s in &report.sheets {
        tx.execute(
            "INSERT INTO import_sheets (import_id, sheet_name, kind, rows_seen, records, imported, rejected, parse_errors, skipped_empty) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            rusqlite::params![
                import_id,
                s.name,
                s.kind.key(),
                s.rows_seen as i64,
                s.records as i64,
                s.imported as i64,
                s.rejected as i64,
                s.parse_errors.len() as i64,
                s.skipped_empty as i64,
            ],
        )?;
    }
    tx.commit()?;
    Ok(import_id)
}

pub fn list_runs(conn: &Connection, limit: usize) -> Result<Vec<ImportRun>> {
    let mut stmt = conn.prepare(
        "SELECT id, filename, started_at, api_url, sheets, records, imported, rejected, parse_errors \
         FROM imports ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt
        .query_map([limit as i64], |row| {
            Ok(ImportRun {
                id: row.get(0)?,
                filename: row.get(1)?,
                started_at: row.get(2)?,
                api_url: row.get(3)?,
                sheets: row.get(4)?,
                records: row.get(5)?,
                imported: row.get(6)?,
                rejected: row.get(7)?,
                parse_errors: row.get(8)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn count_runs(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT count(*) FROM imports", [], |r| r.get(0))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::SheetKind;
    use crate::report::SheetReport;
    use crate::transform::RowIssue;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("journal").join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn report() -> ImportReport {
        let mut report = ImportReport::new("Штрафы.xlsx");
        report.sheets.push(SheetReport {
            name: "Штрафы 2024".to_string(),
            kind: SheetKind::Fines,
            rows_seen: 14,
            records: 12,
            imported: 11,
            rejected: 1,
            already_present: 0,
            parse_errors: vec![RowIssue::new(5, "unreadable date")],
            warnings: Vec::new(),
            skipped_empty: 1,
            trimmed_tail: 0,
        });
        report
    }

    #[test]
    fn test_init_db_creates_tables() {
        let (_dir, conn) = test_db();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &["imports", "import_sheets"] {
            assert!(tables.contains(&expected.to_string()), "missing table: {expected}");
        }
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let (_dir, conn) = test_db();
        init_db(&conn).unwrap();
    }

    #[test]
    fn test_record_and_find_run() {
        let (_dir, conn) = test_db();
        assert!(find_by_checksum(&conn, "abc").unwrap().is_none());
        let id = record_run(&conn, "abc", "http://localhost:3000/api", &report()).unwrap();
        assert!(id > 0);
        assert!(find_by_checksum(&conn, "abc").unwrap().is_some());

        let runs = list_runs(&conn, 10).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].imported, 11);
        assert_eq!(runs[0].rejected, 1);
        assert_eq!(runs[0].parse_errors, 1);
        assert_eq!(runs[0].api_url.as_deref(), Some("http://localhost:3000/api"));

        let sheet_rows: i64 = conn
            .query_row("SELECT count(*) FROM import_sheets WHERE import_id = ?1", [id], |r| r.get(0))
            .unwrap();
        assert_eq!(sheet_rows, 1);
        assert_eq!(count_runs(&conn).unwrap(), 1);
    }

    #[test]
    fn test_list_runs_newest_first_with_limit() {
        let (_dir, conn) = test_db();
        for checksum in ["a", "b", "c"] {
            record_run(&conn, checksum, "http://x", &report()).unwrap();
        }
        let runs = list_runs(&conn, 2).unwrap();
        assert_eq!(runs.len(), 2);
        assert!(runs[0].id > runs[1].id);
    }
}
