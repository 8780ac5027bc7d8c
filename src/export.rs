use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};

use crate::assembler::{Report, Sheet, SheetKind, Value};
use crate::error::{PaysheetError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// One workbook, one worksheet per table.
    #[default]
    Xlsx,
    /// One directory, one CSV file per table.
    Csv,
}

impl ExportFormat {
    pub fn from_key(key: &str) -> Option<Self> {
        match key.to_ascii_lowercase().as_str() {
            "xlsx" => Some(Self::Xlsx),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }
}

/// `<dir>/payroll-summary-YYYY-MM-DD.xlsx`, or the same name without an
/// extension for the CSV directory.
pub fn default_path(dir: &Path, format: ExportFormat) -> PathBuf {
    let date = chrono::Local::now().format("%Y-%m-%d").to_string();
    let stem = format!("payroll-summary-{date}");
    match format {
        ExportFormat::Xlsx => dir.join(format!("{stem}.xlsx")),
        ExportFormat::Csv => dir.join(stem),
    }
}

/// Write the whole report or nothing.
pub fn export_report(report: &Report, path: &Path, format: ExportFormat) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    match format {
        ExportFormat::Xlsx => write_xlsx(report, path)?,
        ExportFormat::Csv => write_csv_dir(report, path)?,
    }
    info!("wrote {} sheet(s) to {}", report.sheets.len(), path.display());
    Ok(())
}

fn money_text(v: f64) -> String {
    format!("{v:.2}")
}

// ---------------------------------------------------------------------------
// xlsx
// ---------------------------------------------------------------------------

#[cfg(feature = "xlsx")]
fn write_xlsx(report: &Report, path: &Path) -> Result<()> {
    use rust_xlsxwriter::{Format, Workbook};

    let err = |e: rust_xlsxwriter::XlsxError| PaysheetError::Export(e.to_string());
    let header = Format::new().set_bold();
    let money = Format::new().set_num_format("#,##0.00");

    let mut workbook = Workbook::new();
    for sheet in &report.sheets {
        let worksheet = workbook.add_worksheet().set_name(sheet.name()).map_err(err)?;
        for (col, name) in sheet.columns.iter().enumerate() {
            worksheet
                .write_string_with_format(0, col as u16, name, &header)
                .map_err(err)?;
        }
        for (r, row) in sheet.rows.iter().enumerate() {
            let row_idx = (r + 1) as u32;
            for (col, value) in row.iter().enumerate() {
                let written = match value {
                    Value::Text(s) => worksheet.write_string(row_idx, col as u16, s),
                    Value::Number(n) => worksheet.write_number_with_format(row_idx, col as u16, *n, &money),
                };
                written.map_err(err)?;
            }
        }
        worksheet.set_freeze_panes(1, 0).map_err(err)?;
        worksheet.autofit();
    }

    // Built in memory, then moved into place in one step.
    let bytes = workbook.save_to_buffer().map_err(err)?;
    let tmp = path.with_extension("xlsx.partial");
    std::fs::write(&tmp, bytes).map_err(|e| PaysheetError::Export(format!("{}: {e}", tmp.display())))?;
    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        PaysheetError::Export(format!("{}: {e}", path.display()))
    })?;
    Ok(())
}

#[cfg(not(feature = "xlsx"))]
fn write_xlsx(_report: &Report, _path: &Path) -> Result<()> {
    Err(PaysheetError::Export(
        "xlsx support not compiled in; use --format csv".to_string(),
    ))
}

// ---------------------------------------------------------------------------
// CSV directory
// ---------------------------------------------------------------------------

fn write_sheet_csv(sheet: &Sheet, path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(&sheet.columns)?;
    for row in &sheet.rows {
        wtr.write_record(row.iter().map(|v| match v {
            Value::Text(s) => s.clone(),
            Value::Number(n) => money_text(*n),
        }))?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_csv_dir(report: &Report, dir: &Path) -> Result<()> {
    if dir.is_file() {
        return Err(PaysheetError::Export(format!(
            "{} is a file; CSV export needs a directory",
            dir.display()
        )));
    }
    let staging = dir.with_extension("partial");
    if staging.exists() {
        std::fs::remove_dir_all(&staging)?;
    }
    std::fs::create_dir_all(&staging)?;

    let written: Result<Vec<PathBuf>> = report
        .sheets
        .iter()
        .map(|sheet| -> Result<PathBuf> {
            let file = staging.join(format!("{}.csv", sheet.kind.file_stem()));
            write_sheet_csv(sheet, &file)?;
            Ok(file)
        })
        .collect();
    let written = match written {
        Ok(files) => files,
        Err(e) => {
            let _ = std::fs::remove_dir_all(&staging);
            return Err(PaysheetError::Export(e.to_string()));
        }
    };

    // Drop sheets an earlier export left behind.
    std::fs::create_dir_all(dir)?;
    for kind in SheetKind::ALL {
        let stale = dir.join(format!("{}.csv", kind.file_stem()));
        if stale.is_file() {
            std::fs::remove_file(&stale)
                .map_err(|e| PaysheetError::Export(format!("{}: {e}", stale.display())))?;
        }
    }
    for file in &written {
        if let Some(name) = file.file_name() {
            std::fs::rename(file, dir.join(name))
                .map_err(|e| PaysheetError::Export(format!("{}: {e}", dir.display())))?;
        }
    }
    std::fs::remove_dir_all(&staging)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> Report {
        Report {
            sheets: vec![
                Sheet {
                    kind: SheetKind::PayrollSummary,
                    columns: vec!["Funding Source".into(), "Earnings".into()],
                    rows: vec![vec![Value::Text("12345678".into()), Value::Number(1000.0)]],
                    total_row: false,
                },
                Sheet {
                    kind: SheetKind::Withholdings,
                    columns: vec!["Event Description".into(), "12345678".into()],
                    rows: vec![vec![Value::Text("I.R.R.F.".into()), Value::Number(0.1 + 0.2)]],
                    total_row: false,
                },
            ],
        }
    }

    #[test]
    fn test_format_from_key() {
        assert_eq!(ExportFormat::from_key("XLSX"), Some(ExportFormat::Xlsx));
        assert_eq!(ExportFormat::from_key("csv"), Some(ExportFormat::Csv));
        assert_eq!(ExportFormat::from_key("pdf"), None);
    }

    #[test]
    fn test_default_path() {
        let p = default_path(Path::new("/tmp/out"), ExportFormat::Xlsx);
        let name = p.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("payroll-summary-"));
        assert!(name.ends_with(".xlsx"));
        let p = default_path(Path::new("/tmp/out"), ExportFormat::Csv);
        assert!(p.extension().is_none());
    }

    #[test]
    fn test_csv_export_writes_one_file_per_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("result");
        export_report(&sample_report(), &out, ExportFormat::Csv).unwrap();

        let summary = std::fs::read_to_string(out.join("payroll-summary.csv")).unwrap();
        assert_eq!(summary, "Funding Source,Earnings\n12345678,1000.00\n");
        let w = std::fs::read_to_string(out.join("withholdings.csv")).unwrap();
        assert!(w.ends_with("I.R.R.F.,0.30\n"));
        assert!(!dir.path().join("result.partial").exists());
    }

    #[test]
    fn test_csv_reexport_drops_sheets_from_earlier_run() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("result");
        let mut report = sample_report();
        report.sheets[1].kind = SheetKind::Reconciliation;
        export_report(&report, &out, ExportFormat::Csv).unwrap();
        assert!(out.join("reconciliation.csv").exists());
        std::fs::write(out.join("notes.txt"), "keep").unwrap();

        report.sheets.truncate(1);
        export_report(&report, &out, ExportFormat::Csv).unwrap();
        assert!(out.join("payroll-summary.csv").exists());
        assert!(!out.join("reconciliation.csv").exists());
        assert!(out.join("notes.txt").exists());
    }

    #[test]
    fn test_csv_export_into_file_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("taken");
        std::fs::write(&file, "x").unwrap();
        let err = export_report(&sample_report(), &file, ExportFormat::Csv).unwrap_err();
        assert!(matches!(err, PaysheetError::Export(_)));
    }

    #[cfg(feature = "xlsx")]
    #[test]
    fn test_xlsx_export_reads_back() {
        use calamine::{Data, Reader};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("result.xlsx");
        export_report(&sample_report(), &path, ExportFormat::Xlsx).unwrap();
        assert!(!path.with_extension("xlsx.partial").exists());

        let mut wb = calamine::open_workbook_auto(&path).unwrap();
        assert_eq!(wb.sheet_names(), vec!["Payroll Summary", "Withholdings"]);
        let range = wb.worksheet_range("Payroll Summary").unwrap();
        assert_eq!(range.get_value((0, 0)), Some(&Data::String("Funding Source".into())));
        assert_eq!(range.get_value((1, 1)), Some(&Data::Float(1000.0)));
    }
}
