use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaysheetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Required column not found: {0}")]
    MissingColumn(String),

    #[error("Expected at least {required} columns, found {found}")]
    TooFewColumns { found: usize, required: usize },

    #[error("Could not read input: {0}")]
    Read(String),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("Settings error: {0}")]
    Settings(String),
}

pub type Result<T> = std::result::Result<T, PaysheetError>;
