use finmemo::{FinmemoError, Result};

#[test]
fn test_error_display() {
    let err = FinmemoError::ProviderNotFound("no income_statement for ZZZZ".to_string());
    assert!(err.to_string().contains("ZZZZ"));
}

#[test]
fn test_store_unavailable_names_the_store() {
    let err = FinmemoError::unavailable("volatile", "connection refused");
    assert_eq!(
        err.to_string(),
        "volatile store unavailable: connection refused"
    );
}

#[test]
fn test_cache_persist_display() {
    let err = FinmemoError::CachePersist {
        key: "get_report:[\"AAPL\"]:{}".into(),
        message: "disk full".into(),
    };
    let text = err.to_string();
    assert!(text.contains("get_report"));
    assert!(text.contains("disk full"));
}

#[test]
fn test_result_alias() {
    fn returns_error() -> Result<()> {
        Err(FinmemoError::EmptyResponse)
    }
    assert!(returns_error().is_err());
}

#[test]
fn test_errors_are_cloneable() {
    let err = FinmemoError::Provider("upstream".into());
    let copy = err.clone();
    assert_eq!(err.to_string(), copy.to_string());
}

#[test]
fn test_from_serde_json() {
    let parse: std::result::Result<u32, _> = serde_json::from_str("nope");
    let err: FinmemoError = parse.unwrap_err().into();
    assert!(matches!(err, FinmemoError::Serialization(_)));
}

// ============================================================================
// Transient error classification
// ============================================================================

#[test]
fn transient_errors() {
    assert!(FinmemoError::unavailable("durable", "timeout").is_transient());
    assert!(FinmemoError::Http("connection reset".into()).is_transient());
    assert!(
        FinmemoError::Api {
            status: 500,
            message: "internal".into()
        }
        .is_transient()
    );
    assert!(
        FinmemoError::Api {
            status: 429,
            message: "slow down".into()
        }
        .is_transient()
    );
}

#[test]
fn non_transient_errors() {
    assert!(
        !FinmemoError::Api {
            status: 400,
            message: "bad request".into()
        }
        .is_transient()
    );
    assert!(!FinmemoError::InvalidInput("x".into()).is_transient());
    assert!(
        !FinmemoError::CachePersist {
            key: "k".into(),
            message: "m".into()
        }
        .is_transient()
    );
    assert!(!FinmemoError::KeySerialization("nan".into()).is_transient());
}

// ============================================================================
// Client error classification
// ============================================================================

#[test]
fn client_errors() {
    assert!(FinmemoError::ProviderNotFound("x".into()).is_client_error());
    assert!(FinmemoError::InvalidInput("x".into()).is_client_error());
    assert!(FinmemoError::KeySerialization("x".into()).is_client_error());
}

#[test]
fn server_errors() {
    assert!(!FinmemoError::unavailable("durable", "down").is_client_error());
    assert!(!FinmemoError::Provider("x".into()).is_client_error());
    assert!(!FinmemoError::Internal("x".into()).is_client_error());
    assert!(!FinmemoError::Configuration("x".into()).is_client_error());
}
