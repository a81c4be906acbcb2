//! Memoizing wrapper around asynchronous producers.
//!
//! [`Memoizer::wrap`] turns a [`Producer`] into a [`Memoized`] handle whose
//! [`call`](Memoized::call) runs the cache-aside flow:
//!
//! ```text
//! START ─▶ force_reload? ─yes─▶ PRODUCE
//!              │ no
//!              ▼
//!           LOOKUP ─hit─▶ RETURN
//!              │ miss
//!              ▼
//!           PRODUCE ─▶ PERSIST_DURABLE ─ok─▶ PERSIST_VOLATILE ─▶ RETURN
//!                             │ err
//!                             ▼
//!                           FAIL (CachePersist)
//! ```
//!
//! # Single-flight
//!
//! Concurrent calls for the same key share one computation: the first
//! caller starts a flight, later callers await the same shared future.
//! `force_reload` calls always start a fresh flight and replace the
//! registered one, so subsequent callers join the fresh result.
//!
//! Flights run on a spawned task. A caller that gives up (e.g. an upstream
//! timeout) never aborts a producer invocation or a durable write halfway.
//!
//! # Write ordering
//!
//! Flights for one key pass through a per-key write gate that records the
//! newest flight whose result reached the stores. A flight overtaken by a
//! newer one that already persisted (typically a `force_reload`) hands its
//! value to its own callers but does not write it, so a stale result never
//! overwrites a fresher one. Lookups hold the same gate, so a durable-hit
//! repopulation cannot land after a newer write-through.
//!
//! # Persist policy
//!
//! A fresh value that cannot be written to the durable tier is not returned:
//! the call fails with [`FinmemoError::CachePersist`]. Nothing reaches a
//! caller as "cached" unless it was durably persisted.

use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::{CacheArgs, CacheKey, TieredCache};
use crate::telemetry;
use crate::{FinmemoError, Result};

/// An asynchronous computation whose results are worth caching.
#[async_trait]
pub trait Producer: Send + Sync + 'static {
    /// Arguments; these and only these feed key derivation.
    type Args: CacheArgs + Send + 'static;
    /// Result; stored as a JSON payload.
    type Output: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;

    /// Stable name scoping this producer's keys. Must not contain `:`.
    fn identity(&self) -> &str;

    async fn produce(&self, args: Self::Args) -> Result<Self::Output>;
}

/// [`Producer`] built from a closure. See [`producer_fn`].
pub struct FnProducer<A, T, F> {
    identity: String,
    f: F,
    _marker: PhantomData<fn(A) -> T>,
}

/// Adapt an async closure into a [`Producer`] named `identity`.
///
/// ```rust
/// # use finmemo::cache::producer_fn;
/// let double = producer_fn("double", |(n,): (i64,)| async move {
///     Ok::<_, finmemo::FinmemoError>(n * 2)
/// });
/// ```
pub fn producer_fn<A, T, F, Fut>(identity: impl Into<String>, f: F) -> FnProducer<A, T, F>
where
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    FnProducer {
        identity: identity.into(),
        f,
        _marker: PhantomData,
    }
}

#[async_trait]
impl<A, T, F, Fut> Producer for FnProducer<A, T, F>
where
    A: CacheArgs + Send + 'static,
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    type Args = A;
    type Output = T;

    fn identity(&self) -> &str {
        &self.identity
    }

    async fn produce(&self, args: A) -> Result<T> {
        (self.f)(args).await
    }
}

/// Factory for [`Memoized`] handles sharing one [`TieredCache`].
#[derive(Clone)]
pub struct Memoizer {
    cache: Arc<TieredCache>,
}

impl Memoizer {
    pub fn new(cache: Arc<TieredCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<TieredCache> {
        &self.cache
    }

    /// Wrap `producer` with cache-aside semantics.
    pub fn wrap<P: Producer>(&self, producer: P) -> Memoized<P> {
        Memoized {
            producer: Arc::new(producer),
            cache: Arc::clone(&self.cache),
            flights: Arc::new(Mutex::new(FlightTable {
                next_id: 1,
                flights: HashMap::new(),
                gates: HashMap::new(),
            })),
        }
    }
}

type FlightFuture<T> = Shared<BoxFuture<'static, Result<T>>>;

struct Flight<T> {
    id: u64,
    future: FlightFuture<T>,
}

/// Id of the newest flight that wrote its result for a key; 0 if none yet.
type WriteGate = tokio::sync::Mutex<u64>;

struct FlightTable<T> {
    next_id: u64,
    flights: HashMap<CacheKey, Flight<T>>,
    /// Shared by every flight of a key that is still running.
    gates: HashMap<CacheKey, Arc<WriteGate>>,
}

/// A producer wrapped with two-tier caching and single-flight de-duplication.
///
/// Cheap to clone; clones share the in-flight table.
pub struct Memoized<P: Producer> {
    producer: Arc<P>,
    cache: Arc<TieredCache>,
    flights: Arc<Mutex<FlightTable<P::Output>>>,
}

impl<P: Producer> Clone for Memoized<P> {
    fn clone(&self) -> Self {
        Self {
            producer: Arc::clone(&self.producer),
            cache: Arc::clone(&self.cache),
            flights: Arc::clone(&self.flights),
        }
    }
}

impl<P: Producer> Memoized<P> {
    pub fn identity(&self) -> &str {
        self.producer.identity()
    }

    /// The key `args` map to. Independent of `force_reload`.
    pub fn key_for(&self, args: &P::Args) -> Result<CacheKey> {
        CacheKey::for_args(self.producer.identity(), args)
    }

    /// Call the wrapped producer through the cache.
    ///
    /// With `force_reload` the lookup is skipped and the producer always
    /// runs; its result overwrites any cached entry.
    pub async fn call(&self, args: P::Args, force_reload: bool) -> Result<P::Output> {
        let key = self.key_for(&args)?;

        let future = {
            let mut table = lock(&self.flights);
            let joinable = if force_reload {
                None
            } else {
                table.flights.get(&key).map(|flight| flight.future.clone())
            };
            match joinable {
                Some(future) => {
                    metrics::counter!(telemetry::SINGLEFLIGHT_JOINS_TOTAL,
                        "function" => self.identity().to_owned(),
                    )
                    .increment(1);
                    debug!(key = %key, "joining in-flight computation");
                    future
                }
                None => {
                    let id = table.next_id;
                    table.next_id += 1;
                    let gate = Arc::clone(
                        table
                            .gates
                            .entry(key.clone())
                            .or_insert_with(|| Arc::new(WriteGate::new(0))),
                    );
                    let future = self.start_flight(id, key.clone(), gate, args, force_reload);
                    table.flights.insert(
                        key,
                        Flight {
                            id,
                            future: future.clone(),
                        },
                    );
                    future
                }
            }
        };

        future.await
    }

    /// Spawn the flight task. Called with the flight table locked, so the
    /// task cannot deregister itself before it is registered.
    fn start_flight(
        &self,
        id: u64,
        key: CacheKey,
        gate: Arc<WriteGate>,
        args: P::Args,
        force_reload: bool,
    ) -> FlightFuture<P::Output> {
        let producer = Arc::clone(&self.producer);
        let cache = Arc::clone(&self.cache);
        let flights = Arc::clone(&self.flights);

        let handle = tokio::spawn(async move {
            let flight = FlightRef {
                key: &key,
                id,
                gate: &gate,
            };
            let outcome = run_flight(&*producer, &cache, flight, args, force_reload).await;
            drop(gate);

            let mut table = lock(&flights);
            if table.flights.get(&key).is_some_and(|f| f.id == id) {
                table.flights.remove(&key);
            }
            // Gates are only cloned under the table lock, so a lone
            // reference here means no flight of this key is running.
            if table.gates.get(&key).is_some_and(|g| Arc::strong_count(g) == 1) {
                table.gates.remove(&key);
            }
            outcome
        });

        async move {
            handle
                .await
                .unwrap_or_else(|e| Err(FinmemoError::Internal(format!("cache flight aborted: {e}"))))
        }
        .boxed()
        .shared()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // The table stays consistent even if a holder panicked.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct FlightRef<'a> {
    key: &'a CacheKey,
    id: u64,
    gate: &'a WriteGate,
}

async fn run_flight<P: Producer>(
    producer: &P,
    cache: &TieredCache,
    flight: FlightRef<'_>,
    args: P::Args,
    force_reload: bool,
) -> Result<P::Output> {
    let function = producer.identity().to_owned();
    let key = flight.key;

    if !force_reload {
        let cached = {
            let _ordered = flight.gate.lock().await;
            cache.lookup_tiered(key).await?
        };
        match cached {
            Some((payload, tier)) => match serde_json::from_str::<P::Output>(&payload) {
                Ok(value) => {
                    metrics::counter!(telemetry::CACHE_HITS_TOTAL,
                        "function" => function,
                        "tier" => tier.as_str(),
                    )
                    .increment(1);
                    return Ok(value);
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "cached payload does not decode, recomputing");
                }
            },
            None => {
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "function" => function.clone())
                    .increment(1);
            }
        }
    }

    metrics::counter!(telemetry::PRODUCER_CALLS_TOTAL,
        "function" => function.clone(),
        "force_reload" => if force_reload { "true" } else { "false" },
    )
    .increment(1);
    debug!(key = %key, force_reload, "invoking producer");

    let value = producer.produce(args).await?;
    let payload = serde_json::to_string(&value)?;

    let mut newest = flight.gate.lock().await;
    if *newest > flight.id {
        debug!(key = %key, "newer result already persisted, not writing this one");
        return Ok(value);
    }
    if let Err(e) = cache.write_through(key, &payload).await {
        metrics::counter!(telemetry::PERSIST_FAILURES_TOTAL, "function" => function).increment(1);
        return Err(e);
    }
    *newest = flight.id;
    Ok(value)
}
