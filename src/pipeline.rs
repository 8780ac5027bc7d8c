use std::path::Path;

use log::info;

use crate::assembler::{assemble, AssembleOptions, Report};
use crate::classifier::Classifier;
use crate::error::Result;
use crate::importer::read_table;
use crate::models::RawTable;
use crate::normalizer::{normalize, ColumnBinding, NormalizeStats, Normalized};
use crate::reports::aggregate;
use crate::settings::Settings;

/// One configured run: raw table in, assembled report out. Holds no state
/// between runs.
pub struct Pipeline {
    binding: ColumnBinding,
    classifier: Classifier,
    assemble: AssembleOptions,
}

pub struct RunOutput {
    pub report: Report,
    pub stats: NormalizeStats,
}

impl Pipeline {
    /// Compiles the label sets up front, so a bad regex fails before any
    /// input is read.
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self {
            binding: settings.binding,
            classifier: Classifier::new(&settings.labels)?,
            assemble: settings.assemble_options(),
        })
    }

    pub fn normalize(&self, table: &RawTable) -> Result<Normalized> {
        normalize(table, self.binding, &self.classifier)
    }

    pub fn run(&self, table: &RawTable) -> Result<RunOutput> {
        let Normalized { lines, stats } = self.normalize(table)?;
        let aggregates = aggregate(&lines);
        info!(
            "{} lines -> {} funding source(s), {} withholding event(s), {} pension event(s)",
            stats.lines,
            aggregates.summary.rows.len(),
            aggregates.withholdings.row_keys.len(),
            aggregates.pension.row_keys.len()
        );
        Ok(RunOutput {
            report: assemble(&aggregates, &self.assemble),
            stats,
        })
    }

    pub fn run_file(&self, file_path: &Path, sheet: Option<&str>) -> Result<RunOutput> {
        let table = read_table(file_path, sheet)?;
        self.run(&table)
    }
}
