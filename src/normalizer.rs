use log::{debug, warn};
use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::classifier::{flow_type, Classifier};
use crate::error::{PaysheetError, Result};
use crate::models::{FlowType, PayrollLine, RawCell, RawTable};

/// Length of the funding-source suffix carried in the organogram code.
pub const FUNDING_SOURCE_KEY_LEN: usize = 8;

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

/// Upper-case, strip diacritics and ordinal indicators, trim.
///
/// Upper-casing runs before the fold so that characters whose upper-case
/// form introduces a combining mark are folded too; this keeps the function
/// idempotent.
pub fn normalize_text(raw: &str) -> String {
    raw.to_uppercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c) && !matches!(c, 'º' | 'ª' | '°'))
        .collect::<String>()
        .trim()
        .to_string()
}

fn normalize_header(raw: &str) -> String {
    normalize_text(raw)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Last eight characters of the organogram code, or the whole code when it
/// is shorter.
pub fn funding_source_key(raw: &str) -> String {
    let len = raw.chars().count();
    if len <= FUNDING_SOURCE_KEY_LEN {
        return raw.to_string();
    }
    raw.chars().skip(len - FUNDING_SOURCE_KEY_LEN).collect()
}

// ---------------------------------------------------------------------------
// Amounts
// ---------------------------------------------------------------------------

/// Parse a monetary text cell. Accepts `1234.56`, `1,234.56`, `1.234,56`,
/// `1234,56`, a leading `R$`/`$` and accounting negatives `(100,00)`.
/// A lone comma is read as the decimal separator.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let s: String = raw
        .trim()
        .replace("R$", "")
        .replace('$', "")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if s.is_empty() {
        return None;
    }
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return parse_amount(inner).map(|v| -v);
    }

    let commas = s.matches(',').count();
    let dots = s.matches('.').count();
    let canonical = match (commas, dots) {
        (0, 0) => s,
        (0, 1) => s,
        (0, _) => s.replace('.', ""),
        (1, 0) => s.replace(',', "."),
        (_, 0) => s.replace(',', ""),
        _ => {
            let last_comma = s.rfind(',').unwrap_or(0);
            let last_dot = s.rfind('.').unwrap_or(0);
            if last_comma > last_dot {
                s.replace('.', "").replace(',', ".")
            } else {
                s.replace(',', "")
            }
        }
    };
    canonical.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn coerce_amount(cell: &RawCell) -> Option<f64> {
    match cell {
        RawCell::Number(n) if n.is_finite() => Some(*n),
        RawCell::Text(s) => parse_amount(s),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Schema binding
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnBinding {
    /// Look columns up by header text.
    #[default]
    ByName,
    /// Take the first eight columns in schema order, whatever their headers.
    ByPosition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Organogram,
    OrganogramDescription,
    Event,
    EventDescription,
    Flag,
    Bond,
    BondDescription,
    Amount,
}

/// Schema order, which is also the positional layout of the HR export.
pub const FIELDS: [Field; 8] = [
    Field::Organogram,
    Field::OrganogramDescription,
    Field::Event,
    Field::EventDescription,
    Field::Flag,
    Field::Bond,
    Field::BondDescription,
    Field::Amount,
];

impl Field {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Organogram => "Organogram",
            Self::OrganogramDescription => "Organogram Description",
            Self::Event => "Event",
            Self::EventDescription => "Event Description",
            Self::Flag => "Earning/Deduction Flag",
            Self::Bond => "Bond",
            Self::BondDescription => "Bond Description",
            Self::Amount => "Event Amount",
        }
    }

    /// Header as written by the municipal HR export.
    pub fn source_header(&self) -> &'static str {
        match self {
            Self::Organogram => "ORGANOGRAMA",
            Self::OrganogramDescription => "DESCRIÇÃO DO ORGANOGRAMA",
            Self::Event => "EVENTO",
            Self::EventDescription => "DESCRIÇÃO DO EVENTO",
            Self::Flag => "P/D/PATRONAL",
            Self::Bond => "VÍNCULO",
            Self::BondDescription => "DESCRIÇÃO DO VÍNCULO",
            Self::Amount => "VALOR DO EVENTO",
        }
    }

    fn matches_header(&self, normalized: &str) -> bool {
        normalized == normalize_header(self.name())
            || normalized == normalize_header(self.source_header())
    }
}

/// Column index for each entry of [`FIELDS`].
pub type ColumnMap = [usize; 8];

pub fn bind_columns(headers: &[String], binding: ColumnBinding) -> Result<ColumnMap> {
    match binding {
        ColumnBinding::ByPosition => {
            if headers.len() < FIELDS.len() {
                return Err(PaysheetError::TooFewColumns {
                    found: headers.len(),
                    required: FIELDS.len(),
                });
            }
            Ok([0, 1, 2, 3, 4, 5, 6, 7])
        }
        ColumnBinding::ByName => {
            let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
            let mut map = [0usize; 8];
            for (slot, field) in map.iter_mut().zip(FIELDS.iter()) {
                *slot = normalized
                    .iter()
                    .position(|h| field.matches_header(h))
                    .ok_or_else(|| {
                        PaysheetError::MissingColumn(format!(
                            "{} ({})",
                            field.name(),
                            field.source_header()
                        ))
                    })?;
            }
            Ok(map)
        }
    }
}

// ---------------------------------------------------------------------------
// normalize
// ---------------------------------------------------------------------------

/// Data-quality counters for one run. Recovered per row, never fatal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    pub lines: usize,
    pub coerced_amounts: usize,
    pub unrecognized_flags: usize,
}

pub struct Normalized {
    pub lines: Vec<PayrollLine>,
    pub stats: NormalizeStats,
}

pub fn normalize(
    table: &RawTable,
    binding: ColumnBinding,
    classifier: &Classifier,
) -> Result<Normalized> {
    let map = bind_columns(&table.headers, binding)?;
    let mut stats = NormalizeStats::default();
    let mut lines = Vec::with_capacity(table.rows.len());

    for (idx, row) in table.rows.iter().enumerate() {
        let row_number = table.row_number(idx);
        let cell = |field: usize| row.get(map[field]).unwrap_or(&RawCell::Empty);
        let text = |field: usize| normalize_text(&cell(field).as_text());

        let amount_cell = cell(7);
        let amount = match coerce_amount(amount_cell) {
            Some(v) => v,
            None => {
                warn!("row {row_number}: amount {:?} is not numeric, using 0.0", amount_cell.as_text());
                stats.coerced_amounts += 1;
                0.0
            }
        };

        let raw_flag = cell(4).as_text();
        let flow = flow_type(&raw_flag);
        if flow == FlowType::None {
            debug!("row {row_number}: flag {raw_flag:?} is neither P nor D");
            stats.unrecognized_flags += 1;
        }

        let funding_source_raw = text(0);
        let event_description = text(3);
        let tags = classifier.classify(&event_description);
        lines.push(PayrollLine {
            funding_source_key: funding_source_key(&funding_source_raw),
            funding_source_raw,
            organogram_description: text(1),
            event_code: text(2),
            event_description,
            flow_type: flow,
            bond: text(5),
            bond_description: text(6),
            amount,
            is_tax: tags.is_tax,
            is_pension: tags.is_pension,
            is_meal_allowance: tags.is_meal_allowance,
        });
    }

    stats.lines = lines.len();
    if stats.coerced_amounts > 0 {
        warn!("{} amount cell(s) could not be parsed and were counted as 0.0", stats.coerced_amounts);
    }
    if stats.unrecognized_flags > 0 {
        warn!("{} line(s) have a flag other than P/D and are left out of earnings/deductions", stats.unrecognized_flags);
    }
    Ok(Normalized { lines, stats })
}
