use std::path::Path;

use log::{debug, info};

use crate::error::{PaysheetError, Result};
use crate::models::{RawCell, RawTable};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// UTF-8 when valid, otherwise Windows-1252, which is what Excel writes for
/// Portuguese-locale CSV exports.
fn decode(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            let bytes = e.into_bytes();
            debug!("input is not UTF-8, decoding as Windows-1252");
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            decoded.into_owned()
        }
    }
}

/// `;` when the header line has more semicolons than commas.
pub fn detect_delimiter(content: &str) -> u8 {
    let header = content.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    let semicolons = header.matches(';').count();
    let commas = header.matches(',').count();
    if semicolons > commas {
        b';'
    } else {
        b','
    }
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| extensions.iter().any(|x| e.eq_ignore_ascii_case(x)))
}

/// Drop blank rows and pad headers to the widest row. Each row comes paired
/// with the 1-based source row it was read from.
fn finish_table(headers: Vec<String>, numbered: Vec<(usize, Vec<RawCell>)>) -> RawTable {
    let (row_numbers, rows): (Vec<usize>, Vec<Vec<RawCell>>) = numbered
        .into_iter()
        .filter(|(_, r)| !r.iter().all(RawCell::is_empty))
        .unzip();
    let width = rows.iter().map(Vec::len).max().unwrap_or(0).max(headers.len());
    let mut headers = headers;
    headers.resize(width, String::new());
    RawTable {
        headers,
        rows,
        row_numbers,
    }
}

// ---------------------------------------------------------------------------
// Importer kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImporterKind {
    Csv,
    #[cfg(feature = "xlsx")]
    Workbook,
}

impl ImporterKind {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            #[cfg(feature = "xlsx")]
            Self::Workbook => "workbook",
        }
    }

    pub fn extensions(&self) -> &[&str] {
        match self {
            Self::Csv => &["csv", "txt"],
            #[cfg(feature = "xlsx")]
            Self::Workbook => &["xlsx", "xlsm", "xlsb", "xls", "ods"],
        }
    }

    pub fn detect(&self, file_path: &Path) -> bool {
        has_extension(file_path, self.extensions())
    }

    pub fn read(&self, file_path: &Path, sheet: Option<&str>) -> Result<RawTable> {
        match self {
            Self::Csv => read_csv(file_path),
            #[cfg(feature = "xlsx")]
            Self::Workbook => read_workbook(file_path, sheet),
        }
    }
}

const ALL_IMPORTERS: &[ImporterKind] = &[
    ImporterKind::Csv,
    #[cfg(feature = "xlsx")]
    ImporterKind::Workbook,
];

pub fn get_for_file(file_path: &Path) -> Option<ImporterKind> {
    ALL_IMPORTERS.iter().find(|i| i.detect(file_path)).copied()
}

/// Read the payroll table from a CSV file or a workbook sheet.
pub fn read_table(file_path: &Path, sheet: Option<&str>) -> Result<RawTable> {
    let importer = get_for_file(file_path).ok_or_else(|| {
        PaysheetError::Read(format!("unsupported file type: {}", file_path.display()))
    })?;
    if importer == ImporterKind::Csv && sheet.is_some() {
        debug!("--sheet ignored for CSV input");
    }
    let table = importer.read(file_path, sheet)?;
    info!(
        "read {} rows x {} columns from {} ({})",
        table.rows.len(),
        table.column_count(),
        file_path.display(),
        importer.key()
    );
    Ok(table)
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

fn read_csv(file_path: &Path) -> Result<RawTable> {
    let decoded = decode(std::fs::read(file_path)?);
    let content = decoded.strip_prefix('\u{feff}').unwrap_or(&decoded);

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(detect_delimiter(content))
        .from_reader(content.as_bytes());

    let mut records = rdr.records();
    let headers: Vec<String> = loop {
        match records.next() {
            Some(record) => {
                let record = record?;
                if record.iter().any(|f| !f.trim().is_empty()) {
                    break record.iter().map(|f| f.trim().to_string()).collect();
                }
            }
            None => {
                return Err(PaysheetError::Read(format!(
                    "{} has no header row",
                    file_path.display()
                )))
            }
        }
    };

    let mut rows = Vec::new();
    for record in records {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line() as usize);
        let cells: Vec<RawCell> = record
            .iter()
            .map(|f| {
                if f.trim().is_empty() {
                    RawCell::Empty
                } else {
                    RawCell::Text(f.to_string())
                }
            })
            .collect();
        rows.push((line, cells));
    }
    Ok(finish_table(headers, rows))
}

// ---------------------------------------------------------------------------
// Workbook (feature-gated)
// ---------------------------------------------------------------------------

#[cfg(feature = "xlsx")]
fn read_workbook(file_path: &Path, sheet: Option<&str>) -> Result<RawTable> {
    use calamine::{Data, Reader};

    let mut workbook = calamine::open_workbook_auto(file_path)
        .map_err(|e| PaysheetError::Read(format!("failed to open workbook: {e}")))?;

    let range = match sheet {
        Some(name) => {
            if !workbook.sheet_names().iter().any(|n| n == name) {
                return Err(PaysheetError::Read(format!("sheet not found: {name}")));
            }
            workbook
                .worksheet_range(name)
                .map_err(|e| PaysheetError::Read(format!("failed to read sheet {name}: {e}")))?
        }
        None => workbook
            .worksheet_range_at(0)
            .ok_or_else(|| PaysheetError::Read("workbook has no sheets".to_string()))?
            .map_err(|e| PaysheetError::Read(format!("failed to read first sheet: {e}")))?,
    };

    let to_cell = |d: &Data| match d {
        Data::Empty => RawCell::Empty,
        Data::String(s) if s.trim().is_empty() => RawCell::Empty,
        Data::String(s) => RawCell::Text(s.clone()),
        Data::Float(f) => RawCell::Number(*f),
        Data::Int(i) => RawCell::Number(*i as f64),
        Data::Bool(b) => RawCell::Bool(*b),
        other => RawCell::Text(other.to_string()),
    };

    // The range starts at the first used cell, not necessarily at A1.
    let first_row = range.start().map_or(0, |(r, _)| r as usize) + 1;
    let mut iter = range.rows().enumerate();
    let headers: Vec<String> = loop {
        match iter.next() {
            Some((_, row)) if row.iter().all(|d| matches!(to_cell(d), RawCell::Empty)) => continue,
            Some((_, row)) => break row.iter().map(|d| to_cell(d).as_text().trim().to_string()).collect(),
            None => {
                return Err(PaysheetError::Read(format!(
                    "{} has no header row",
                    file_path.display()
                )))
            }
        }
    };
    let rows = iter
        .map(|(i, row)| (first_row + i, row.iter().map(&to_cell).collect()))
        .collect();
    Ok(finish_table(headers, rows))
}
