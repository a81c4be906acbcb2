//! Telemetry metric name constants.
//!
//! Consumers install their own `metrics` recorder (e.g. prometheus, statsd);
//! without a recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `finmemo_`. Counters end in `_total`.
//!
//! # Common labels
//!
//! - `function` - identity of the memoized producer (e.g. "get_report")
//! - `tier` - store tier: "volatile" or "durable"
//! - `operation` - store operation: "get" or "set"

/// Lookups answered from a cache tier.
///
/// Labels: `function`, `tier`.
pub const CACHE_HITS_TOTAL: &str = "finmemo_cache_hits_total";

/// Lookups that missed both tiers.
///
/// Labels: `function`.
pub const CACHE_MISSES_TOTAL: &str = "finmemo_cache_misses_total";

/// Invocations of an underlying producer.
///
/// Labels: `function`, `force_reload` ("true" | "false").
pub const PRODUCER_CALLS_TOTAL: &str = "finmemo_producer_calls_total";

/// Callers that joined an already running computation instead of starting one.
///
/// Labels: `function`.
pub const SINGLEFLIGHT_JOINS_TOTAL: &str = "finmemo_singleflight_joins_total";

/// Durable writes that failed (the wrapped call fails with them).
///
/// Labels: `function`.
pub const PERSIST_FAILURES_TOTAL: &str = "finmemo_persist_failures_total";

/// Swallowed volatile-tier failures (read fallthrough, repopulate, write-through).
///
/// Labels: `operation` ("get" | "set").
pub const VOLATILE_FAILURES_TOTAL: &str = "finmemo_volatile_failures_total";

/// Durable-tier read failures treated as a miss because the volatile tier answered.
///
/// Labels: `operation` ("get").
pub const DURABLE_FAILURES_TOTAL: &str = "finmemo_durable_failures_total";
