use serde::{Deserialize, Serialize};

use crate::reports::{Aggregates, PayrollSummary, Pivot, ReconciliationKey, SummaryRow};

/// Row (and pivot column) ordering of the assembled sheets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowOrder {
    /// Keys in the order they first appear in the input.
    #[default]
    Insertion,
    /// Keys in lexicographic order.
    Sorted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetKind {
    PayrollSummary,
    Withholdings,
    Pension,
    Reconciliation,
}

impl SheetKind {
    pub const ALL: [SheetKind; 4] = [
        Self::PayrollSummary,
        Self::Withholdings,
        Self::Pension,
        Self::Reconciliation,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::PayrollSummary => "Payroll Summary",
            Self::Withholdings => "Withholdings",
            Self::Pension => "Pension",
            Self::Reconciliation => "Reconciliation",
        }
    }

    /// File name stem used when each sheet is written to its own file.
    pub fn file_stem(&self) -> &'static str {
        match self {
            Self::PayrollSummary => "payroll-summary",
            Self::Withholdings => "withholdings",
            Self::Pension => "pension",
            Self::Reconciliation => "reconciliation",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "summary" | "payroll-summary" => Some(Self::PayrollSummary),
            "withholdings" => Some(Self::Withholdings),
            "pension" => Some(Self::Pension),
            "reconciliation" => Some(Self::Reconciliation),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Number(f64),
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }
}

/// A named table with a fixed column order, ready for display or export.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub kind: SheetKind,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    /// The last row holds column totals rather than a key.
    pub total_row: bool,
}

impl Sheet {
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn is_total_row(&self, idx: usize) -> bool {
        self.total_row && idx + 1 == self.rows.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub sheets: Vec<Sheet>,
}

impl Report {
    pub fn sheet(&self, kind: SheetKind) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.kind == kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssembleOptions {
    pub row_order: RowOrder,
    pub include_reconciliation: bool,
    pub totals: bool,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self {
            row_order: RowOrder::Insertion,
            include_reconciliation: true,
            totals: true,
        }
    }
}

pub const SUMMARY_COLUMNS: [&str; 7] = [
    "Funding Source",
    "Earnings",
    "Deductions",
    "MealAllowance",
    "Tax",
    "NetPay",
    "NetPayWithMealAllowance",
];

const TOTAL_LABEL: &str = "Total";

pub fn assemble(agg: &Aggregates, opts: &AssembleOptions) -> Report {
    let sorted = opts.row_order == RowOrder::Sorted;
    let mut sheets = Vec::with_capacity(4);

    let summary = if sorted { agg.summary.sorted() } else { agg.summary.clone() };
    sheets.push(summary_sheet(&summary, opts.totals));

    let events = |kind: SheetKind, p: &Pivot<String>| {
        let p = if sorted { p.sorted() } else { p.clone() };
        pivot_sheet(kind, &["Event Description"], &p, |k| vec![k.clone()], opts.totals)
    };
    sheets.push(events(SheetKind::Withholdings, &agg.withholdings));
    sheets.push(events(SheetKind::Pension, &agg.pension));

    if opts.include_reconciliation {
        let p = if sorted { agg.reconciliation.sorted() } else { agg.reconciliation.clone() };
        sheets.push(pivot_sheet(
            SheetKind::Reconciliation,
            &["Bond Description", "Event Description", "Organogram Description"],
            &p,
            |k: &ReconciliationKey| {
                vec![
                    k.bond_description.clone(),
                    k.event_description.clone(),
                    k.organogram_description.clone(),
                ]
            },
            opts.totals,
        ));
    }

    Report { sheets }
}

fn summary_values(r: &SummaryRow) -> Vec<Value> {
    vec![
        Value::Text(r.funding_source.clone()),
        Value::Number(r.earnings),
        Value::Number(r.deductions),
        Value::Number(r.meal_allowance),
        Value::Number(r.tax),
        Value::Number(r.net_pay),
        Value::Number(r.net_pay_with_meal_allowance),
    ]
}

fn summary_sheet(summary: &PayrollSummary, totals: bool) -> Sheet {
    let mut rows: Vec<Vec<Value>> = summary.rows.iter().map(summary_values).collect();
    let total_row = totals && !summary.rows.is_empty();
    if total_row {
        rows.push(summary_values(&summary.total()));
    }
    Sheet {
        kind: SheetKind::PayrollSummary,
        columns: SUMMARY_COLUMNS.iter().map(|c| c.to_string()).collect(),
        rows,
        total_row,
    }
}

fn pivot_sheet<R: Clone + Ord>(
    kind: SheetKind,
    key_columns: &[&str],
    pivot: &Pivot<R>,
    key_values: impl Fn(&R) -> Vec<String>,
    totals: bool,
) -> Sheet {
    let mut columns: Vec<String> = key_columns.iter().map(|c| c.to_string()).collect();
    columns.extend(pivot.col_keys.iter().cloned());
    if totals {
        columns.push(TOTAL_LABEL.to_string());
    }

    let rows = pivot
        .row_keys
        .iter()
        .enumerate()
        .map(|(r, key)| {
            let mut row: Vec<Value> = key_values(key).into_iter().map(Value::Text).collect();
            row.extend(pivot.cells[r].iter().map(|v| Value::Number(*v)));
            if totals {
                row.push(Value::Number(pivot.row_total(r)));
            }
            row
        })
        .collect();

    Sheet {
        kind,
        columns,
        rows,
        total_row: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FlowType, PayrollLine};
    use crate::reports::aggregate;

    fn line(source: &str, flow: FlowType, desc: &str, amount: f64) -> PayrollLine {
        PayrollLine {
            funding_source_raw: format!("ORG.{source}"),
            funding_source_key: source.to_string(),
            organogram_description: "GABINETE".into(),
            event_code: "10".into(),
            event_description: desc.to_string(),
            flow_type: flow,
            bond: "1".into(),
            bond_description: "EFETIVO".into(),
            amount,
            is_tax: false,
            is_pension: desc.starts_with("CONTRIBUICAO"),
            is_meal_allowance: false,
        }
    }

    fn sample() -> Aggregates {
        aggregate(&[
            line("ZZ000001", FlowType::Earning, "VENCIMENTO", 500.0),
            line("AA000001", FlowType::Deduction, "FALTAS", 20.0),
            line("ZZ000001", FlowType::Deduction, "CONTRIBUICAO SIMPAS", 55.0),
        ])
    }

    #[test]
    fn test_canonical_sheets_and_columns() {
        let report = assemble(&sample(), &AssembleOptions::default());
        let names: Vec<_> = report.sheets.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["Payroll Summary", "Withholdings", "Pension", "Reconciliation"]);

        let summary = report.sheet(SheetKind::PayrollSummary).unwrap();
        assert_eq!(summary.columns, SUMMARY_COLUMNS.to_vec());
        // Two keys plus the total row.
        assert_eq!(summary.rows.len(), 3);
        assert_eq!(summary.rows[2][0], Value::Text("TOTAL".into()));
        assert_eq!(summary.rows[2][1], Value::Number(500.0));
        assert!(summary.is_total_row(2));
        assert!(!summary.is_total_row(0));

        let w = report.sheet(SheetKind::Withholdings).unwrap();
        assert_eq!(w.columns, vec!["Event Description", "AA000001", "ZZ000001", "Total"]);
        assert_eq!(w.rows[0], vec![
            Value::Text("FALTAS".into()),
            Value::Number(20.0),
            Value::Number(0.0),
            Value::Number(20.0),
        ]);

        let r = report.sheet(SheetKind::Reconciliation).unwrap();
        assert_eq!(&r.columns[..3], &["Bond Description", "Event Description", "Organogram Description"]);
        assert_eq!(r.columns[3], "ORG.ZZ000001");
    }

    #[test]
    fn test_insertion_order_is_default() {
        let report = assemble(&sample(), &AssembleOptions::default());
        let summary = report.sheet(SheetKind::PayrollSummary).unwrap();
        assert_eq!(summary.rows[0][0], Value::Text("ZZ000001".into()));
        assert_eq!(summary.rows[1][0], Value::Text("AA000001".into()));
    }

    #[test]
    fn test_sorted_order() {
        let opts = AssembleOptions {
            row_order: RowOrder::Sorted,
            ..AssembleOptions::default()
        };
        let report = assemble(&sample(), &opts);
        let summary = report.sheet(SheetKind::PayrollSummary).unwrap();
        assert_eq!(summary.rows[0][0], Value::Text("AA000001".into()));
        let w = report.sheet(SheetKind::Withholdings).unwrap();
        assert_eq!(w.columns[1], "AA000001");
        assert_eq!(w.rows[0][0], Value::Text("CONTRIBUICAO SIMPAS".into()));
    }

    #[test]
    fn test_without_totals_or_reconciliation() {
        let opts = AssembleOptions {
            include_reconciliation: false,
            totals: false,
            ..AssembleOptions::default()
        };
        let report = assemble(&sample(), &opts);
        assert_eq!(report.sheets.len(), 3);
        assert!(report.sheet(SheetKind::Reconciliation).is_none());
        let summary = report.sheet(SheetKind::PayrollSummary).unwrap();
        assert_eq!(summary.rows.len(), 2);
        assert!(!summary.is_total_row(1));
        let p = report.sheet(SheetKind::Pension).unwrap();
        assert_eq!(p.columns, vec!["Event Description", "ZZ000001"]);
    }

    #[test]
    fn test_funding_source_named_total_is_not_the_total_row() {
        let agg = aggregate(&[
            line("TOTAL", FlowType::Earning, "VENCIMENTO", 10.0),
            line("AA000001", FlowType::Earning, "VENCIMENTO", 5.0),
        ]);
        let report = assemble(&agg, &AssembleOptions::default());
        let summary = report.sheet(SheetKind::PayrollSummary).unwrap();
        assert_eq!(summary.rows.len(), 3);
        assert_eq!(summary.rows[0][0], Value::Text("TOTAL".into()));
        assert!(!summary.is_total_row(0));
        assert!(summary.is_total_row(2));
        assert_eq!(summary.rows[2][1], Value::Number(15.0));
    }

    #[test]
    fn test_sheet_kind_keys() {
        assert_eq!(SheetKind::from_key("summary"), Some(SheetKind::PayrollSummary));
        assert_eq!(SheetKind::from_key("pension"), Some(SheetKind::Pension));
        assert_eq!(SheetKind::from_key("nope"), None);
    }
}
