use std::collections::HashSet;

use crate::cli::report::format_stats;
use crate::cli::{resolve_settings, InputArgs};
use crate::error::Result;
use crate::importer::read_table;
use crate::normalizer::ColumnBinding;
use crate::pipeline::Pipeline;

pub fn run(config: Option<&str>, input: &InputArgs) -> Result<()> {
    let settings = resolve_settings(config, input)?;
    let pipeline = Pipeline::new(&settings)?;
    let table = read_table(&input.path(), input.sheet.as_deref())?;
    let normalized = pipeline.normalize(&table)?;

    let mode = match settings.binding {
        ColumnBinding::ByName => "by name",
        ColumnBinding::ByPosition => "by position",
    };
    let sources: HashSet<&str> = normalized
        .lines
        .iter()
        .map(|l| l.funding_source_key.as_str())
        .collect();

    println!("Columns OK ({mode}, {} column(s) in file)", table.column_count());
    println!("{} funding source(s)", sources.len());
    println!("{}", format_stats(&normalized.stats));
    Ok(())
}
