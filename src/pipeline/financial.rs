//! Financial data pipeline.
//!
//! Two memoized stages:
//!
//! 1. `get_report` - one statement of a filing, fetched from the
//!    [`StatementProvider`]. Keyed on `(ticker, year, sheet)`.
//! 2. `get_data` - one line item of that statement, resolved through the
//!    [`HeaderMatcher`] when the header is not an exact label. Keyed on the
//!    report's reference (ticker, sheet, period), a SHA-256 digest of its
//!    columns and rows, and the header. The digest keeps keys short enough
//!    for a primary-key index while a refreshed report still gets new keys.
//!
//! [`FinancialData::get_financial_data`] composes both and forwards
//! `force_reload` to each stage.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::cache::{CacheArgs, KeyArg, Memoized, Memoizer, Producer};
use crate::providers::{HeaderMatcher, StatementProvider};
use crate::types::{DataRequest, LineItem, StatementKind, StatementTable};
use crate::{FinmemoError, Result};

/// Cache identity of the report stage.
pub const REPORT_IDENTITY: &str = "get_report";
/// Cache identity of the line-item stage.
pub const DATA_IDENTITY: &str = "get_data";

/// Arguments of the report stage.
#[derive(Debug, Clone)]
pub struct ReportArgs {
    pub ticker: String,
    pub year: String,
    pub sheet: StatementKind,
}

impl CacheArgs for ReportArgs {
    fn positional(&self) -> Vec<KeyArg> {
        vec![
            self.ticker.as_str().into(),
            self.year.as_str().into(),
            self.sheet.as_str().into(),
        ]
    }
}

/// Arguments of the line-item stage.
#[derive(Debug, Clone)]
pub struct LineItemArgs {
    report: StatementTable,
    header: String,
    content: KeyArg,
}

impl LineItemArgs {
    /// Fails with [`FinmemoError::KeySerialization`] if the report cannot be
    /// fingerprinted.
    pub fn new(report: StatementTable, header: impl Into<String>) -> Result<Self> {
        let content = KeyArg::from_serialize(&(&report.columns, &report.rows))?.digest()?;
        Ok(Self {
            report,
            header: header.into(),
            content,
        })
    }

    pub fn report(&self) -> &StatementTable {
        &self.report
    }

    pub fn header(&self) -> &str {
        &self.header
    }
}

impl CacheArgs for LineItemArgs {
    fn positional(&self) -> Vec<KeyArg> {
        let report = BTreeMap::from([
            ("ticker".to_string(), KeyArg::from(self.report.ticker.as_str())),
            ("kind".to_string(), KeyArg::from(self.report.kind.as_str())),
            ("period".to_string(), KeyArg::from(self.report.period.as_str())),
            ("content".to_string(), self.content.clone()),
        ]);
        vec![KeyArg::Map(report)]
    }

    fn named(&self) -> BTreeMap<String, KeyArg> {
        BTreeMap::from([
            ("header".to_string(), KeyArg::from(self.header.as_str())),
            ("sheet_name".to_string(), KeyArg::from(self.report.kind.as_str())),
        ])
    }
}

struct ReportProducer {
    statements: Arc<dyn StatementProvider>,
}

#[async_trait]
impl Producer for ReportProducer {
    type Args = ReportArgs;
    type Output = StatementTable;

    fn identity(&self) -> &str {
        REPORT_IDENTITY
    }

    async fn produce(&self, args: ReportArgs) -> Result<StatementTable> {
        debug!(
            provider = self.statements.name(),
            ticker = %args.ticker,
            year = %args.year,
            sheet = %args.sheet,
            "fetching statement"
        );
        self.statements
            .fetch_statement(&args.ticker, args.sheet, &args.year)
            .await
    }
}

struct LineItemProducer {
    matcher: Arc<dyn HeaderMatcher>,
}

#[async_trait]
impl Producer for LineItemProducer {
    type Args = LineItemArgs;
    type Output = LineItem;

    fn identity(&self) -> &str {
        DATA_IDENTITY
    }

    async fn produce(&self, args: LineItemArgs) -> Result<LineItem> {
        let LineItemArgs { report, header, .. } = args;

        let row = match report.find_label(&header) {
            Some(row) => row,
            None => {
                let labels = report.labels();
                let matched = self
                    .matcher
                    .match_header(&header, &labels)
                    .await?
                    .ok_or_else(|| {
                        FinmemoError::ProviderNotFound(format!(
                            "no line item matching '{header}' in {} {}",
                            report.ticker, report.kind
                        ))
                    })?;
                debug!(header = %header, matched = %matched, matcher = self.matcher.name(), "header resolved");
                report.row(&matched).ok_or_else(|| {
                    FinmemoError::ProviderNotFound(format!("line item '{matched}' not in statement"))
                })?
            }
        };

        let value = report
            .column_for_year(&report.period)
            .and_then(|column| row.values.get(column).copied().flatten());

        Ok(LineItem {
            ticker: report.ticker.clone(),
            year: report.period.clone(),
            sheet_name: report.kind,
            header,
            matched_label: row.label.clone(),
            value,
            values: row.values.clone(),
        })
    }
}

/// Memoized access to statements and their line items.
#[derive(Clone)]
pub struct FinancialData {
    reports: Memoized<ReportProducer>,
    line_items: Memoized<LineItemProducer>,
}

impl FinancialData {
    pub fn new(
        memoizer: &Memoizer,
        statements: Arc<dyn StatementProvider>,
        matcher: Arc<dyn HeaderMatcher>,
    ) -> Self {
        Self {
            reports: memoizer.wrap(ReportProducer { statements }),
            line_items: memoizer.wrap(LineItemProducer { matcher }),
        }
    }

    /// One statement of `ticker`'s filing for `year`.
    pub async fn get_report(
        &self,
        ticker: &str,
        year: &str,
        sheet: StatementKind,
        force_reload: bool,
    ) -> Result<StatementTable> {
        let args = ReportArgs {
            ticker: normalize_ticker(ticker)?,
            year: required("year", year)?,
            sheet,
        };
        self.reports.call(args, force_reload).await
    }

    /// The line item of `report` best matching `header`.
    pub async fn get_data(
        &self,
        report: StatementTable,
        header: &str,
        force_reload: bool,
    ) -> Result<LineItem> {
        let args = LineItemArgs::new(report, required("header", header)?)?;
        self.line_items.call(args, force_reload).await
    }

    /// Fetch the statement, then extract the line item.
    pub async fn get_financial_data(
        &self,
        ticker: &str,
        header: &str,
        sheet_name: &str,
        year: &str,
        force_reload: bool,
    ) -> Result<LineItem> {
        let sheet: StatementKind = sheet_name.parse()?;
        info!(ticker, header, sheet = %sheet, year, force_reload, "financial data request");

        let report = self.get_report(ticker, year, sheet, force_reload).await?;
        self.get_data(report, header, force_reload).await
    }

    /// Entry point for `POST /getData`.
    pub async fn get_data_api(&self, request: &DataRequest) -> Result<LineItem> {
        self.get_financial_data(
            &request.ticker,
            &request.header,
            &request.sheet_name,
            &request.year,
            request.force_reload,
        )
        .await
    }
}

fn required(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FinmemoError::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

fn normalize_ticker(ticker: &str) -> Result<String> {
    Ok(required("ticker", ticker)?.to_uppercase())
}
