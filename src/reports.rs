use std::collections::HashMap;
use std::hash::Hash;

use crate::models::{FlowType, PayrollLine};

// ---------------------------------------------------------------------------
// Key index helper
// ---------------------------------------------------------------------------

/// Distinct keys in first-seen order.
#[derive(Debug, Clone)]
struct KeyIndex<K> {
    keys: Vec<K>,
    positions: HashMap<K, usize>,
}

impl<K: Clone + Eq + Hash> KeyIndex<K> {
    fn new() -> Self {
        Self {
            keys: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// Returns the key's position and whether it was newly inserted.
    fn insert(&mut self, key: &K) -> (usize, bool) {
        if let Some(&pos) = self.positions.get(key) {
            return (pos, false);
        }
        let pos = self.keys.len();
        self.keys.push(key.clone());
        self.positions.insert(key.clone(), pos);
        (pos, true)
    }
}

/// Permutation that sorts `keys`; stable, so equal keys keep their order.
fn sorted_order<K: Ord>(keys: &[K]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by(|&a, &b| keys[a].cmp(&keys[b]));
    order
}

// ---------------------------------------------------------------------------
// Payroll summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub funding_source: String,
    pub earnings: f64,
    pub deductions: f64,
    pub meal_allowance: f64,
    pub tax: f64,
    pub net_pay: f64,
    pub net_pay_with_meal_allowance: f64,
}

impl SummaryRow {
    fn new(funding_source: &str) -> Self {
        Self {
            funding_source: funding_source.to_string(),
            earnings: 0.0,
            deductions: 0.0,
            meal_allowance: 0.0,
            tax: 0.0,
            net_pay: 0.0,
            net_pay_with_meal_allowance: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PayrollSummary {
    pub rows: Vec<SummaryRow>,
}

impl PayrollSummary {
    /// Column-wise totals, as a row keyed `TOTAL`.
    pub fn total(&self) -> SummaryRow {
        let mut total = SummaryRow::new("TOTAL");
        for r in &self.rows {
            total.earnings += r.earnings;
            total.deductions += r.deductions;
            total.meal_allowance += r.meal_allowance;
            total.tax += r.tax;
            total.net_pay += r.net_pay;
            total.net_pay_with_meal_allowance += r.net_pay_with_meal_allowance;
        }
        total
    }

    pub fn sorted(&self) -> Self {
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| a.funding_source.cmp(&b.funding_source));
        Self { rows }
    }
}

/// Earnings, deductions, meal allowance and tax per funding-source key.
///
/// Meal allowance and tax are taken from every matching line whatever its
/// flag; net pay is not clamped and may be negative.
pub fn payroll_summary(lines: &[PayrollLine]) -> PayrollSummary {
    let mut index: KeyIndex<String> = KeyIndex::new();
    let mut rows: Vec<SummaryRow> = Vec::new();

    for line in lines {
        let (pos, is_new) = index.insert(&line.funding_source_key);
        if is_new {
            rows.push(SummaryRow::new(&line.funding_source_key));
        }
        let row = &mut rows[pos];
        match line.flow_type {
            FlowType::Earning => row.earnings += line.amount,
            FlowType::Deduction => row.deductions += line.amount,
            FlowType::None => {}
        }
        if line.is_meal_allowance {
            row.meal_allowance += line.amount;
        }
        if line.is_tax {
            row.tax += line.amount;
        }
    }

    for row in &mut rows {
        row.net_pay = row.earnings - row.deductions - row.meal_allowance;
        row.net_pay_with_meal_allowance = row.earnings - row.deductions;
    }
    PayrollSummary { rows }
}

// ---------------------------------------------------------------------------
// Pivots
// ---------------------------------------------------------------------------

/// Dense two-dimensional sum table over the realized row and column keys.
/// Pairs with no contributing line hold `0.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Pivot<R> {
    pub row_keys: Vec<R>,
    pub col_keys: Vec<String>,
    pub cells: Vec<Vec<f64>>,
}

impl<R: Clone + Ord> Pivot<R> {
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.cells[row][col]
    }

    pub fn row_total(&self, row: usize) -> f64 {
        self.cells[row].iter().sum()
    }

    pub fn column_total(&self, col: usize) -> f64 {
        self.cells.iter().map(|r| r[col]).sum()
    }

    pub fn grand_total(&self) -> f64 {
        self.cells.iter().flatten().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.row_keys.is_empty()
    }

    /// Rows and columns both in key order.
    pub fn sorted(&self) -> Self {
        let row_order = sorted_order(&self.row_keys);
        let col_order = sorted_order(&self.col_keys);
        Self {
            row_keys: row_order.iter().map(|&r| self.row_keys[r].clone()).collect(),
            col_keys: col_order.iter().map(|&c| self.col_keys[c].clone()).collect(),
            cells: row_order
                .iter()
                .map(|&r| col_order.iter().map(|&c| self.cells[r][c]).collect())
                .collect(),
        }
    }
}

fn pivot<'a, R, I, FR, FC>(lines: I, row_key: FR, col_key: FC) -> Pivot<R>
where
    R: Clone + Eq + Hash,
    I: IntoIterator<Item = &'a PayrollLine>,
    FR: Fn(&PayrollLine) -> R,
    FC: Fn(&PayrollLine) -> &str,
{
    let mut rows: KeyIndex<R> = KeyIndex::new();
    let mut cols: KeyIndex<String> = KeyIndex::new();
    let mut cells: Vec<Vec<f64>> = Vec::new();

    for line in lines {
        let (c, new_col) = cols.insert(&col_key(line).to_string());
        if new_col {
            for row in &mut cells {
                row.push(0.0);
            }
        }
        let (r, new_row) = rows.insert(&row_key(line));
        if new_row {
            cells.push(vec![0.0; cols.keys.len()]);
        }
        cells[r][c] += line.amount;
    }

    Pivot {
        row_keys: rows.keys,
        col_keys: cols.keys,
        cells,
    }
}

/// Deduction lines: event description by funding-source key.
pub fn withholdings(lines: &[PayrollLine]) -> Pivot<String> {
    pivot(
        lines.iter().filter(|l| l.flow_type == FlowType::Deduction),
        |l| l.event_description.clone(),
        |l| l.funding_source_key.as_str(),
    )
}

/// Pension lines, earning or deduction alike: event description by
/// funding-source key.
pub fn pension(lines: &[PayrollLine]) -> Pivot<String> {
    pivot(
        lines.iter().filter(|l| l.is_pension),
        |l| l.event_description.clone(),
        |l| l.funding_source_key.as_str(),
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReconciliationKey {
    pub bond_description: String,
    pub event_description: String,
    pub organogram_description: String,
}

/// Every line, keyed by bond/event/organogram against the full organogram code.
pub fn reconciliation(lines: &[PayrollLine]) -> Pivot<ReconciliationKey> {
    pivot(
        lines,
        |l| ReconciliationKey {
            bond_description: l.bond_description.clone(),
            event_description: l.event_description.clone(),
            organogram_description: l.organogram_description.clone(),
        },
        |l| l.funding_source_raw.as_str(),
    )
}

pub struct Aggregates {
    pub summary: PayrollSummary,
    pub withholdings: Pivot<String>,
    pub pension: Pivot<String>,
    pub reconciliation: Pivot<ReconciliationKey>,
}

pub fn aggregate(lines: &[PayrollLine]) -> Aggregates {
    Aggregates {
        summary: payroll_summary(lines),
        withholdings: withholdings(lines),
        pension: pension(lines),
        reconciliation: reconciliation(lines),
    }
}
