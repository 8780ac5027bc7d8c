/// A single cell as handed over by an importer, before any schema binding.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl RawCell {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Text rendering used for string fields. Whole numbers lose their
    /// trailing `.0` so numeric codes read the way they appear in the sheet.
    pub fn as_text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.clone(),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Self::Number(n) => n.to_string(),
            Self::Bool(b) => b.to_string(),
        }
    }
}

/// Intermediate representation from a CSV/XLSX reader before normalization.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<RawCell>>,
    /// 1-based line or sheet row each entry of `rows` was read from. May be
    /// empty for tables built in memory.
    pub row_numbers: Vec<usize>,
}

impl RawTable {
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Source row of `rows[idx]`. Without recorded positions the header is
    /// taken to be row 1 with no gaps below it.
    pub fn row_number(&self, idx: usize) -> usize {
        self.row_numbers.get(idx).copied().unwrap_or(idx + 2)
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowType {
    Earning,
    Deduction,
    /// Flag was neither `P` nor `D`; excluded from earning/deduction sums.
    None,
}

/// One normalized, classified payroll line.
#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq)]
pub struct PayrollLine {
    pub funding_source_raw: String,
    pub funding_source_key: String,
    pub organogram_description: String,
    pub event_code: String,
    pub event_description: String,
    pub flow_type: FlowType,
    pub bond: String,
    pub bond_description: String,
    pub amount: f64,
    pub is_tax: bool,
    pub is_pension: bool,
    pub is_meal_allowance: bool,
}
