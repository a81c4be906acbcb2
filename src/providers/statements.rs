//! HTTP statement provider.
//!
//! Fetches `GET {base}/statements/{ticker}/{kind}?period={period}` and
//! expects a table with a `Label` column plus one column per period:
//!
//! ```json
//! {
//!   "columns": ["2023-09-30", "2022-09-24"],
//!   "rows": [
//!     {"Label": "Total Revenue", "2023-09-30": 383285.0, "2022-09-24": 394328.0}
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::traits::StatementProvider;
use crate::types::{StatementKind, StatementRow, StatementTable};
use crate::{FinmemoError, Result};

/// Base URL used when none is configured.
pub const DEFAULT_STATEMENTS_URL: &str = "http://127.0.0.1:8001";

/// Name of the row-index column.
pub const LABEL_COLUMN: &str = "Label";

/// Client for a filings service serving statements as JSON tables.
#[derive(Clone)]
pub struct HttpStatementProvider {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpStatementProvider {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| FinmemoError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
        })
    }

    /// Send `key` as a bearer token.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

#[derive(Deserialize)]
struct TableBody {
    columns: Vec<String>,
    rows: Vec<BTreeMap<String, serde_json::Value>>,
}

/// Convert the wire table into a [`StatementTable`].
fn into_table(
    body: TableBody,
    ticker: &str,
    kind: StatementKind,
    period: &str,
) -> Result<StatementTable> {
    let mut rows = Vec::with_capacity(body.rows.len());
    for mut raw in body.rows {
        let label = match raw.remove(LABEL_COLUMN) {
            Some(serde_json::Value::String(label)) => label,
            _ => {
                return Err(FinmemoError::Provider(format!(
                    "statement row without a string '{LABEL_COLUMN}' column"
                )));
            }
        };
        let values = body
            .columns
            .iter()
            .map(|column| {
                let value = raw.get(column).and_then(serde_json::Value::as_f64);
                (column.clone(), value)
            })
            .collect();
        rows.push(StatementRow { label, values });
    }

    Ok(StatementTable {
        ticker: ticker.to_string(),
        kind,
        period: period.to_string(),
        columns: body.columns,
        rows,
    })
}

#[async_trait]
impl StatementProvider for HttpStatementProvider {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch_statement(
        &self,
        ticker: &str,
        kind: StatementKind,
        period: &str,
    ) -> Result<StatementTable> {
        let url = format!("{}/statements/{}/{}", self.base_url, ticker, kind);

        let mut request = self.http.get(&url).query(&[("period", period)]);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await?;

        match response.status().as_u16() {
            200..=299 => {}
            404 => {
                return Err(FinmemoError::ProviderNotFound(format!(
                    "no {kind} for {ticker} in {period}"
                )));
            }
            code => {
                return Err(FinmemoError::Api {
                    status: code,
                    message: format!("statement provider error: {}", response.status()),
                });
            }
        }

        let body: TableBody = response.json().await?;
        into_table(body, ticker, kind, period)
    }
}
