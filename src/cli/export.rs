use std::path::PathBuf;

use crate::cli::report::format_stats;
use crate::cli::{resolve_settings, InputArgs};
use crate::error::Result;
use crate::export::{default_path, export_report, ExportFormat};
use crate::pipeline::Pipeline;
use crate::settings::shellexpand_path;

pub fn run(
    config: Option<&str>,
    input: &InputArgs,
    output: Option<String>,
    format: Option<&str>,
    no_reconciliation: bool,
) -> Result<()> {
    let mut settings = resolve_settings(config, input)?;
    if no_reconciliation {
        settings.include_reconciliation = false;
    }
    let format = format
        .and_then(ExportFormat::from_key)
        .unwrap_or(settings.export_format);

    let out = Pipeline::new(&settings)?.run_file(&input.path(), input.sheet.as_deref())?;

    let path = output
        .map(|o| PathBuf::from(shellexpand_path(&o)))
        .unwrap_or_else(|| default_path(&settings.output_dir(), format));
    export_report(&out.report, &path, format)?;

    println!("{}", format_stats(&out.stats));
    println!("Wrote {} sheet(s) to {}", out.report.sheets.len(), path.display());
    Ok(())
}
