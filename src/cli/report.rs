use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use crate::assembler::{Sheet, SheetKind, Value};
use crate::cli::{resolve_settings, InputArgs};
use crate::error::Result;
use crate::fmt::amount;
use crate::normalizer::NormalizeStats;
use crate::pipeline::Pipeline;

pub fn run(config: Option<&str>, input: &InputArgs, table: Option<&str>) -> Result<()> {
    let settings = resolve_settings(config, input)?;
    let out = Pipeline::new(&settings)?.run_file(&input.path(), input.sheet.as_deref())?;

    let only = table.and_then(SheetKind::from_key);
    for sheet in &out.report.sheets {
        if only.map_or(true, |k| k == sheet.kind) {
            println!("{}\n{}\n", sheet.name().bold(), format_sheet(sheet));
        }
    }
    if only == Some(SheetKind::Reconciliation) && out.report.sheet(SheetKind::Reconciliation).is_none() {
        println!("Reconciliation is disabled in settings.");
    }
    println!("{}", format_stats(&out.stats));
    Ok(())
}

// ---------------------------------------------------------------------------
// Pure formatting functions (sheet → String)
// ---------------------------------------------------------------------------

fn value_cell(value: &Value, total: bool) -> Cell {
    match value {
        Value::Text(s) if total => Cell::new(s.as_str().bold()),
        Value::Text(s) => Cell::new(s),
        Value::Number(n) if *n < 0.0 => {
            Cell::new(amount(*n).red().to_string()).set_alignment(CellAlignment::Right)
        }
        Value::Number(n) => Cell::new(amount(*n)).set_alignment(CellAlignment::Right),
    }
}

pub fn format_sheet(sheet: &Sheet) -> String {
    if sheet.rows.is_empty() {
        return "(no lines)".to_string();
    }
    let mut table = Table::new();
    table.set_header(sheet.columns.clone());
    for (idx, row) in sheet.rows.iter().enumerate() {
        let total = sheet.is_total_row(idx);
        table.add_row(row.iter().map(|v| value_cell(v, total)).collect::<Vec<_>>());
    }
    table.to_string()
}

pub fn format_stats(stats: &NormalizeStats) -> String {
    let mut s = format!("{} payroll line(s)", stats.lines);
    if stats.coerced_amounts > 0 {
        s.push_str(&format!(
            ", {} non-numeric amount(s) counted as 0.00",
            stats.coerced_amounts
        ));
    }
    if stats.unrecognized_flags > 0 {
        s.push_str(&format!(
            ", {} line(s) with a flag other than P/D",
            stats.unrecognized_flags
        ));
    }
    s
}
