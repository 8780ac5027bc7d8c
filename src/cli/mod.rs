pub mod check;
pub mod export;
pub mod init;
pub mod report;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::assembler::RowOrder;
use crate::error::Result;
use crate::normalizer::ColumnBinding;
use crate::settings::{load_settings, shellexpand_path, Settings};

#[derive(Parser)]
#[command(name = "paysheet", about = "Payroll summaries by funding source, withholding and pension.")]
pub struct Cli {
    /// Settings file (default: ~/.config/paysheet/settings.json)
    #[arg(long, global = true)]
    pub config: Option<String>,
    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the summary tables.
    Report {
        #[command(flatten)]
        input: InputArgs,
        /// Only this table: summary, withholdings, pension, reconciliation
        #[arg(long, value_parser = ["summary", "withholdings", "pension", "reconciliation"])]
        table: Option<String>,
    },
    /// Write the summary tables to a spreadsheet.
    Export {
        #[command(flatten)]
        input: InputArgs,
        /// Output path (default: <output_dir>/payroll-summary-YYYY-MM-DD.xlsx)
        #[arg(long, short)]
        output: Option<String>,
        /// Output format: xlsx, or csv for a directory of CSV files
        #[arg(long, value_parser = ["xlsx", "csv"])]
        format: Option<String>,
        /// Leave out the Reconciliation sheet
        #[arg(long = "no-reconciliation")]
        no_reconciliation: bool,
    },
    /// Validate the input layout and report data-quality counts.
    Check {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Write a settings file with the default labels.
    Init {
        /// Overwrite an existing settings file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Clone)]
pub struct InputArgs {
    /// Payroll file (.xlsx, .xls, .ods or .csv)
    pub file: String,
    /// Bind the first eight columns by position instead of by header
    #[arg(long = "by-position")]
    pub by_position: bool,
    /// Worksheet to read (default: first sheet)
    #[arg(long)]
    pub sheet: Option<String>,
    /// Sort rows and funding-source columns by key instead of input order
    #[arg(long)]
    pub sorted: bool,
}

impl InputArgs {
    pub fn path(&self) -> PathBuf {
        PathBuf::from(&self.file)
    }
}

/// Settings file plus command-line overrides.
pub(crate) fn resolve_settings(config: Option<&str>, input: &InputArgs) -> Result<Settings> {
    let config = config.map(|c| PathBuf::from(shellexpand_path(c)));
    let mut settings = load_settings(config.as_deref())?;
    if input.by_position {
        settings.binding = ColumnBinding::ByPosition;
    }
    if input.sorted {
        settings.row_order = RowOrder::Sorted;
    }
    Ok(settings)
}
