use std::path::Path;

use crate::error::{Result, RoadstatError};

/// One tab of a workbook (or the whole of a delimited text file).
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    /// 1-based spreadsheet row number of `rows[0]`.
    pub first_row: usize,
    pub rows: Vec<Vec<String>>,
}

/// A data row keyed by column header.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub row_number: usize,
    pub cells: Vec<(String, String)>,
}

impl RawRow {
    pub fn get(&self, column: &str) -> &str {
        self.cells
            .iter()
            .find(|(h, _)| h == column)
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }

    pub fn at(&self, index: usize) -> &str {
        self.cells.get(index).map(|(_, v)| v.as_str()).unwrap_or("")
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, v)| v.trim().is_empty())
    }
}

pub fn is_blank_row(row: &[String]) -> bool {
    row.iter().all(|c| c.trim().is_empty())
}

impl Sheet {
    /// Number of non-blank rows, header included.
    pub fn non_blank_rows(&self) -> usize {
        self.rows.iter().filter(|r| !is_blank_row(r)).count()
    }

    /// Index of the first row with any content.
    pub fn first_non_blank(&self) -> Option<usize> {
        self.rows.iter().position(|r| !is_blank_row(r))
    }

    /// Header names at `header_index`. Blank headers become `column_N`;
    /// repeated ones get a `_N` suffix so every key stays unique.
    pub fn headers(&self, header_index: usize) -> Vec<String> {
        let Some(row) = self.rows.get(header_index) else {
            return Vec::new();
        };
        let width = self.rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut headers: Vec<String> = Vec::with_capacity(width);
        for i in 0..width {
            let raw = row.get(i).map(|s| s.trim()).unwrap_or("");
            let mut name = if raw.is_empty() {
                format!("column_{}", i + 1)
            } else {
                raw.to_string()
            };
            if headers.contains(&name) {
                name = format!("{name}_{}", i + 1);
            }
            headers.push(name);
        }
        headers
    }

    /// Rows after `header_index`, keyed by that row's headers.
    pub fn records(&self, header_index: usize) -> Vec<RawRow> {
        let headers = self.headers(header_index);
        self.rows
            .iter()
            .enumerate()
            .skip(header_index + 1)
            .map(|(i, row)| RawRow {
                row_number: self.first_row + i,
                cells: headers
                    .iter()
                    .enumerate()
                    .map(|(c, h)| (h.clone(), row.get(c).cloned().unwrap_or_default()))
                    .collect(),
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn load_file(file_path: &Path) -> Result<Vec<Sheet>> {
    let ext = file_path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let sheets = match ext.as_str() {
        "csv" | "tsv" | "txt" => vec![load_delimited(file_path, ext == "tsv")?],
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => load_workbook(file_path)?,
        _ => return Err(RoadstatError::UnsupportedFile(file_path.display().to_string())),
    };

    if sheets.is_empty() {
        return Err(RoadstatError::NoSheets(file_path.display().to_string()));
    }
    for sheet in &sheets {
        log::debug!(
            "loaded sheet {:?}: {} rows, {} non-blank",
            sheet.name,
            sheet.rows.len(),
            sheet.non_blank_rows()
        );
    }
    Ok(sheets)
}

// ---------------------------------------------------------------------------
// Delimited text
// ---------------------------------------------------------------------------

/// Most frequent of `;`, `,` and tab in the header line. Ties go to the
/// earlier candidate, so `Дата;Наложено, руб.` stays semicolon-separated.
fn sniff_delimiter(first_line: &str) -> u8 {
    let count = |d: u8| first_line.bytes().filter(|b| *b == d).count();
    [b',', b'\t']
        .into_iter()
        .fold((b';', count(b';')), |best, d| {
            let n = count(d);
            if n > best.1 {
                (d, n)
            } else {
                best
            }
        })
        .0
}

fn load_delimited(file_path: &Path, is_tsv: bool) -> Result<Sheet> {
    let bytes = std::fs::read(file_path)?;
    let text = String::from_utf8_lossy(&bytes);
    let content: &str = text.strip_prefix('\u{feff}').unwrap_or(&text);

    let delimiter = if is_tsv {
        b'\t'
    } else {
        sniff_delimiter(content.lines().next().unwrap_or(""))
    };

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(content.as_bytes());

    // The reader skips empty lines; they are put back as blank rows so that
    // rows[i] is always line i + 1 of the file.
    let mut rows: Vec<Vec<String>> = Vec::new();
    for result in rdr.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                log::warn!("{}: skipping unreadable line: {e}", file_path.display());
                continue;
            }
        };
        if let Some(line) = record.position().map(|p| p.line() as usize) {
            while rows.len() + 1 < line {
                rows.push(Vec::new());
            }
        }
        rows.push(record.iter().map(|f| f.trim().to_string()).collect());
    }
    let trailing_empty = content.lines().rev().take_while(|l| l.is_empty()).count();
    rows.extend(std::iter::repeat_with(Vec::new).take(trailing_empty));

    let name = file_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_string();
    Ok(Sheet {
        name,
        first_row: 1,
        rows,
    })
}

// ---------------------------------------------------------------------------
// Workbooks (feature-gated)
// ---------------------------------------------------------------------------

#[cfg(feature = "xlsx")]
fn load_workbook(file_path: &Path) -> Result<Vec<Sheet>> {
    use calamine::Reader;

    let mut workbook = calamine::open_workbook_auto(file_path)?;
    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = match workbook.worksheet_range(&name) {
            Ok(range) => range,
            Err(e) => {
                log::warn!("sheet {name:?} could not be read: {e}");
                continue;
            }
        };
        let first_row = range.start().map(|(r, _)| r as usize + 1).unwrap_or(1);
        let rows = range
            .rows()
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect();
        sheets.push(Sheet {
            name,
            first_row,
            rows,
        });
    }
    Ok(sheets)
}

#[cfg(not(feature = "xlsx"))]
fn load_workbook(file_path: &Path) -> Result<Vec<Sheet>> {
    Err(RoadstatError::UnsupportedFile(format!(
        "{} (built without the xlsx feature)",
        file_path.display()
    )))
}

#[cfg(feature = "xlsx")]
fn cell_to_string(cell: &calamine::Data) -> String {
    use calamine::Data;

    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => format_float(*f),
        Data::Bool(b) => b.to_string(),
        // Date cells are rendered day-first so they take the dot grammar.
        Data::DateTime(dt) if !dt.is_duration() => crate::dates::excel_serial_to_date(dt.as_f64())
            .map(|d| d.format("%d.%m.%Y").to_string())
            .unwrap_or_default(),
        Data::DateTime(dt) => format_float(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
    }
}

pub fn format_float(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(rows: &[&[&str]]) -> Sheet {
        Sheet {
            name: "test".to_string(),
            first_row: 1,
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn test_records_keyed_by_header() {
        let s = sheet(&[&["Дата", "Район"], &["01.02.2024", "Северный"], &["02.02.2024"]]);
        let rows = s.records(0);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("Район"), "Северный");
        assert_eq!(rows[0].row_number, 2);
        assert_eq!(rows[1].get("Район"), "");
        assert_eq!(rows[1].get("missing"), "");
    }

    #[test]
    fn test_headers_fill_blank_and_duplicate_names() {
        let s = sheet(&[&["Дата", "", "Дата"], &["a", "b", "c", "d"]]);
        assert_eq!(s.headers(0), vec!["Дата", "column_2", "Дата_3", "column_4"]);
    }

    #[test]
    fn test_blank_row_detection() {
        let s = sheet(&[&["h"], &["  ", ""], &["x"]]);
        let rows = s.records(0);
        assert!(rows[0].is_blank());
        assert!(!rows[1].is_blank());
        assert_eq!(s.non_blank_rows(), 2);
    }

    #[test]
    fn test_sniff_delimiter() {
        assert_eq!(sniff_delimiter("Дата;Район;Нарушения"), b';');
        assert_eq!(sniff_delimiter("date,district"), b',');
        assert_eq!(sniff_delimiter("a\tb\tc"), b'\t');
        assert_eq!(sniff_delimiter("Дата;Наложено, руб."), b';');
        assert_eq!(sniff_delimiter("Дата"), b';');
    }

    #[test]
    fn test_load_semicolon_csv_with_comma_in_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Штрафы.csv");
        std::fs::write(&path, "Дата;Наложено, руб.\n15.03.2024;1500\n").unwrap();
        let sheets = load_file(&path).unwrap();
        assert_eq!(sheets[0].rows[0], vec!["Дата", "Наложено, руб."]);
        assert_eq!(sheets[0].rows[1], vec!["15.03.2024", "1500"]);
    }

    #[test]
    fn test_csv_row_numbers_follow_file_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Штрафы.csv");
        std::fs::write(&path, "Дата;X\n\n15.03.2024;1\nbad;1\n\n\n").unwrap();
        let sheets = load_file(&path).unwrap();
        let rows = sheets[0].records(0);
        let numbers: Vec<usize> = rows.iter().map(|r| r.row_number).collect();
        assert_eq!(numbers, vec![2, 3, 4, 5, 6]);
        assert!(rows[0].is_blank());
        assert_eq!(rows[2].get("Дата"), "bad");
        assert!(rows[3].is_blank() && rows[4].is_blank());
    }

    #[cfg(feature = "xlsx")]
    #[test]
    fn test_cell_to_string() {
        use calamine::{Data, ExcelDateTime, ExcelDateTimeType};

        let date = ExcelDateTime::new(45366.75, ExcelDateTimeType::DateTime, false);
        assert_eq!(cell_to_string(&Data::DateTime(date)), "15.03.2024");
        assert_eq!(cell_to_string(&Data::Float(1500.0)), "1500");
        assert_eq!(cell_to_string(&Data::Float(12.5)), "12.5");
        assert_eq!(cell_to_string(&Data::Int(42)), "42");
        assert_eq!(cell_to_string(&Data::Bool(true)), "true");
        assert_eq!(cell_to_string(&Data::String("  Центральный ".to_string())), "Центральный");
        assert_eq!(cell_to_string(&Data::Empty), "");
        assert_eq!(cell_to_string(&Data::Error(calamine::CellErrorType::Div0)), "");
        assert_eq!(cell_to_string(&Data::DateTimeIso("2024-03-15".to_string())), "2024-03-15");
    }

    #[cfg(feature = "xlsx")]
    #[test]
    fn test_duration_cell_is_not_a_date() {
        use calamine::{Data, ExcelDateTime, ExcelDateTimeType};

        let span = ExcelDateTime::new(1.5, ExcelDateTimeType::TimeDelta, false);
        assert_eq!(cell_to_string(&Data::DateTime(span)), "1.5");
    }

    #[test]
    fn test_load_semicolon_csv_with_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Штрафы 2024.csv");
        std::fs::write(&path, "\u{feff}Дата;Район\n15.03.24; Центральный \n").unwrap();
        let sheets = load_file(&path).unwrap();
        assert_eq!(sheets.len(), 1);
        assert_eq!(sheets[0].name, "Штрафы 2024");
        assert_eq!(sheets[0].rows[0], vec!["Дата", "Район"]);
        assert_eq!(sheets[0].rows[1], vec!["15.03.24", "Центральный"]);
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.pdf");
        std::fs::write(&path, "x").unwrap();
        assert!(matches!(load_file(&path), Err(RoadstatError::UnsupportedFile(_))));
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(1500.0), "1500");
        assert_eq!(format_float(12.5), "12.5");
    }
}
