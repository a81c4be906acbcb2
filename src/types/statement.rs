//! Financial statement types

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::FinmemoError;

/// Which financial statement of a filing to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    BalanceSheet,
    IncomeStatement,
    CashFlowStatement,
}

impl StatementKind {
    pub const ALL: [StatementKind; 3] = [
        StatementKind::BalanceSheet,
        StatementKind::IncomeStatement,
        StatementKind::CashFlowStatement,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatementKind::BalanceSheet => "balance_sheet",
            StatementKind::IncomeStatement => "income_statement",
            StatementKind::CashFlowStatement => "cash_flow_statement",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatementKind {
    type Err = FinmemoError;

    /// Accepts the snake_case names, case-insensitively, with `-` or space
    /// as separators (`"Income Statement"`, `"cash-flow-statement"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        StatementKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| {
                FinmemoError::InvalidInput(format!(
                    "unknown sheet '{s}', expected one of balance_sheet, income_statement, cash_flow_statement"
                ))
            })
    }
}

/// One labelled line of a statement, with a value per period column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementRow {
    pub label: String,
    /// Period column → value. `None` where the filing has no figure.
    pub values: BTreeMap<String, Option<f64>>,
}

/// A statement as returned by a [`StatementProvider`](crate::providers::StatementProvider).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementTable {
    pub ticker: String,
    pub kind: StatementKind,
    pub period: String,
    /// Period columns, in provider order.
    pub columns: Vec<String>,
    pub rows: Vec<StatementRow>,
}

impl StatementTable {
    /// Row labels, in provider order.
    pub fn labels(&self) -> Vec<String> {
        self.rows.iter().map(|row| row.label.clone()).collect()
    }

    pub fn row(&self, label: &str) -> Option<&StatementRow> {
        self.rows.iter().find(|row| row.label == label)
    }

    /// Case- and whitespace-insensitive label lookup.
    pub fn find_label(&self, header: &str) -> Option<&StatementRow> {
        let wanted = normalize_label(header);
        self.rows
            .iter()
            .find(|row| normalize_label(&row.label) == wanted)
    }

    /// The column for `year`: an exact match, else the first column that
    /// starts with it (e.g. `2023-09-30`).
    pub fn column_for_year(&self, year: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.as_str() == year)
            .or_else(|| self.columns.iter().find(|c| c.starts_with(year)))
            .map(String::as_str)
    }
}

fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// A single line item extracted from a statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub ticker: String,
    pub year: String,
    pub sheet_name: StatementKind,
    /// Header as requested by the caller.
    pub header: String,
    /// Statement label the header resolved to.
    pub matched_label: String,
    /// Value in the requested year's column, when present.
    pub value: Option<f64>,
    /// All period values of the matched row.
    pub values: BTreeMap<String, Option<f64>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> StatementTable {
        StatementTable {
            ticker: "AAPL".into(),
            kind: StatementKind::IncomeStatement,
            period: "2023".into(),
            columns: vec!["2023-09-30".into(), "2022-09-24".into()],
            rows: vec![StatementRow {
                label: "Total Revenue".into(),
                values: BTreeMap::from([
                    ("2023-09-30".to_string(), Some(383_285.0)),
                    ("2022-09-24".to_string(), Some(394_328.0)),
                ]),
            }],
        }
    }

    #[test]
    fn statement_kind_parses_loosely() {
        assert_eq!(
            "income_statement".parse::<StatementKind>().unwrap(),
            StatementKind::IncomeStatement
        );
        assert_eq!(
            "Cash Flow Statement".parse::<StatementKind>().unwrap(),
            StatementKind::CashFlowStatement
        );
        assert_eq!(
            "balance-sheet".parse::<StatementKind>().unwrap(),
            StatementKind::BalanceSheet
        );
    }

    #[test]
    fn unknown_statement_kind_is_invalid_input() {
        let err = "ledger".parse::<StatementKind>().unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn statement_kind_serde_matches_display() {
        let json = serde_json::to_string(&StatementKind::CashFlowStatement).unwrap();
        assert_eq!(json, r#""cash_flow_statement""#);
    }

    #[test]
    fn find_label_ignores_case_and_spacing() {
        let table = table();
        assert!(table.find_label("total  revenue").is_some());
        assert!(table.find_label("Net Income").is_none());
    }

    #[test]
    fn column_for_year_matches_prefix() {
        let table = table();
        assert_eq!(table.column_for_year("2022"), Some("2022-09-24"));
        assert_eq!(table.column_for_year("2019"), None);
    }
}
