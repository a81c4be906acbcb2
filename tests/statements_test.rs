//! Wiremock integration tests for HttpStatementProvider.

use finmemo::FinmemoError;
use finmemo::providers::{HttpStatementProvider, StatementProvider};
use finmemo::types::StatementKind;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn income_statement() -> serde_json::Value {
    serde_json::json!({
        "columns": ["2023-09-30", "2022-09-24"],
        "rows": [
            {"Label": "Total Revenue", "2023-09-30": 383285.0, "2022-09-24": 394328.0},
            {"Label": "Net Income", "2023-09-30": 96995.0, "2022-09-24": null}
        ]
    })
}

/// Test a successful statement fetch.
#[tokio::test]
async fn test_fetch_statement_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/statements/AAPL/income_statement"))
        .and(query_param("period", "2023"))
        .respond_with(ResponseTemplate::new(200).set_body_json(income_statement()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = HttpStatementProvider::new(mock_server.uri()).unwrap();
    let table = provider
        .fetch_statement("AAPL", StatementKind::IncomeStatement, "2023")
        .await
        .expect("fetch should succeed");

    assert_eq!(table.ticker, "AAPL");
    assert_eq!(table.kind, StatementKind::IncomeStatement);
    assert_eq!(table.labels(), vec!["Total Revenue", "Net Income"]);
    assert_eq!(table.column_for_year("2023"), Some("2023-09-30"));
    assert_eq!(table.row("Net Income").unwrap().values["2022-09-24"], None);
}

/// Test the API key is sent as a bearer token.
#[tokio::test]
async fn test_fetch_statement_with_api_key() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/statements/MSFT/balance_sheet"))
        .and(header("Authorization", "Bearer filings_key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "columns": ["2023"],
            "rows": []
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = HttpStatementProvider::new(mock_server.uri())
        .unwrap()
        .api_key("filings_key");
    let table = provider
        .fetch_statement("MSFT", StatementKind::BalanceSheet, "2023")
        .await
        .unwrap();
    assert!(table.rows.is_empty());
}

/// Test 404 maps to not found.
#[tokio::test]
async fn test_fetch_statement_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let provider = HttpStatementProvider::new(mock_server.uri()).unwrap();
    let err = provider
        .fetch_statement("ZZZZ", StatementKind::CashFlowStatement, "2023")
        .await
        .unwrap_err();
    assert!(matches!(err, FinmemoError::ProviderNotFound(_)));
    assert!(err.is_client_error());
}

/// Test 5xx maps to a transient API error.
#[tokio::test]
async fn test_fetch_statement_server_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let provider = HttpStatementProvider::new(mock_server.uri()).unwrap();
    let err = provider
        .fetch_statement("AAPL", StatementKind::IncomeStatement, "2023")
        .await
        .unwrap_err();
    assert!(matches!(err, FinmemoError::Api { status: 503, .. }));
    assert!(err.is_transient());
}

/// Test a malformed body is a serialization-level failure, not a panic.
#[tokio::test]
async fn test_fetch_statement_malformed_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&mock_server)
        .await;

    let provider = HttpStatementProvider::new(mock_server.uri()).unwrap();
    let result = provider
        .fetch_statement("AAPL", StatementKind::IncomeStatement, "2023")
        .await;
    assert!(result.is_err());
}
