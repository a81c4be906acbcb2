//! Tests for cache key derivation.

use std::collections::BTreeMap;

use finmemo::cache::{CacheArgs, CacheKey, KeyArg};
use finmemo::{FinmemoError, Memoizer, TieredCache};
use tokio_test::{assert_err, assert_ok};

struct Report {
    ticker: &'static str,
    year: i64,
    sheet: Option<&'static str>,
}

impl CacheArgs for Report {
    fn positional(&self) -> Vec<KeyArg> {
        vec![self.ticker.into(), self.year.into()]
    }

    fn named(&self) -> BTreeMap<String, KeyArg> {
        let mut named = BTreeMap::new();
        if let Some(sheet) = self.sheet {
            named.insert("sheet".to_string(), sheet.into());
        }
        named
    }
}

// =========================================================================
// Determinism
// =========================================================================

#[test]
fn same_inputs_same_key() {
    let a = Report { ticker: "AAPL", year: 2023, sheet: Some("income_statement") };
    let b = Report { ticker: "AAPL", year: 2023, sheet: Some("income_statement") };
    assert_eq!(
        CacheKey::for_args("get_report", &a).unwrap(),
        CacheKey::for_args("get_report", &b).unwrap()
    );
}

#[test]
fn named_argument_order_does_not_matter() {
    let first: BTreeMap<String, KeyArg> =
        [("b".to_string(), KeyArg::from(2)), ("a".to_string(), KeyArg::from(1))].into();
    let second: BTreeMap<String, KeyArg> =
        [("a".to_string(), KeyArg::from(1)), ("b".to_string(), KeyArg::from(2))].into();

    assert_eq!(
        CacheKey::derive("f", &[], &first).unwrap(),
        CacheKey::derive("f", &[], &second).unwrap()
    );
}

#[test]
fn key_layout_is_identity_positional_named() {
    let report = Report { ticker: "AAPL", year: 2023, sheet: Some("income_statement") };
    let key = assert_ok!(CacheKey::for_args("get_report", &report));
    assert_eq!(
        key.as_str(),
        r#"get_report:["AAPL",2023]:{"sheet":"income_statement"}"#
    );
}

#[test]
fn no_arguments_still_has_all_segments() {
    let key = CacheKey::for_args("ping", &()).unwrap();
    assert_eq!(key.as_str(), "ping:[]:{}");
}

// =========================================================================
// Non-collision
// =========================================================================

#[test]
fn different_identities_never_collide() {
    let args = ("AAPL",);
    assert_ne!(
        CacheKey::for_args("get_report", &args).unwrap(),
        CacheKey::for_args("get_data", &args).unwrap()
    );
}

#[test]
fn positional_and_named_are_distinguished() {
    let positional = CacheKey::derive("f", &[KeyArg::from("x")], &BTreeMap::new()).unwrap();
    let named = CacheKey::derive(
        "f",
        &[],
        &[("0".to_string(), KeyArg::from("x"))].into(),
    )
    .unwrap();
    assert_ne!(positional, named);
}

#[test]
fn strings_and_numbers_are_distinguished() {
    assert_ne!(
        CacheKey::for_args("f", &("2023",)).unwrap(),
        CacheKey::for_args("f", &(2023i64,)).unwrap()
    );
}

#[test]
fn argument_boundaries_are_preserved() {
    // ["a,b"] must not collide with ["a","b"].
    assert_ne!(
        CacheKey::for_args("f", &("a,b",)).unwrap(),
        CacheKey::for_args("f", &("a", "b")).unwrap()
    );
}

#[test]
fn absent_named_argument_differs_from_present() {
    let with = Report { ticker: "AAPL", year: 2023, sheet: Some("balance_sheet") };
    let without = Report { ticker: "AAPL", year: 2023, sheet: None };
    assert_ne!(
        CacheKey::for_args("get_report", &with).unwrap(),
        CacheKey::for_args("get_report", &without).unwrap()
    );
}

// =========================================================================
// Canonical values
// =========================================================================

#[test]
fn numerically_equal_values_share_a_key() {
    let int = CacheKey::for_args("f", &(5i64,)).unwrap();
    let uint = CacheKey::for_args("f", &(5u64,)).unwrap();
    let float = CacheKey::for_args("f", &(5.0f64,)).unwrap();
    assert_eq!(int, uint);
    assert_eq!(int, float);
}

#[test]
fn non_finite_numbers_are_rejected() {
    let err = CacheKey::for_args("f", &(f64::NAN,)).unwrap_err();
    assert!(matches!(err, FinmemoError::KeySerialization(_)));
}

#[test]
fn identity_with_separator_is_rejected() {
    let err = assert_err!(CacheKey::for_args("get:report", &()));
    assert!(matches!(err, FinmemoError::KeySerialization(_)));
}

#[test]
fn json_values_encode_like_native_arguments() {
    let native = CacheKey::for_args("f", &(vec!["x", "y"],)).unwrap();
    let json = CacheKey::for_args("f", &(serde_json::json!(["x", "y"]),)).unwrap();
    assert_eq!(native, json);
}

// =========================================================================
// force_reload never reaches the key
// =========================================================================

#[test]
fn force_reload_does_not_affect_key() {
    use std::sync::Arc;

    use finmemo::cache::{MemoryDurableStore, MemoryStore, producer_fn};

    let memoizer = Memoizer::new(Arc::new(TieredCache::new(
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryDurableStore::new()),
    )));
    let echo = memoizer.wrap(producer_fn("echo", |(s,): (String,)| async move {
        Ok::<_, FinmemoError>(s)
    }));

    // The memoized key is computed from producer arguments alone.
    let key = echo.key_for(&("AAPL".to_string(),)).unwrap();
    assert_eq!(key, CacheKey::for_args("echo", &("AAPL",)).unwrap());
    assert!(!key.as_str().contains("force_reload"));
}
