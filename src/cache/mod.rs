//! Caching subsystem.
//!
//! Layers, leaves first:
//!
//! - [`key`] - deterministic [`CacheKey`] derivation from a producer
//!   identity plus its arguments.
//! - [`volatile`] - fast, evictable tier ([`RedisStore`], [`MemoryStore`]).
//! - [`durable`] - persistent source-of-truth tier ([`PostgresStore`],
//!   [`MemoryDurableStore`]).
//! - [`tiered`] - [`TieredCache`], cache-aside reads and write-through
//!   writes across both tiers.
//! - [`memoize`] - [`Memoizer`] / [`Memoized`], the wrapper that puts any
//!   async [`Producer`] behind the tiered cache, with `force_reload` bypass
//!   and single-flight de-duplication.

pub mod durable;
pub mod key;
pub mod memoize;
pub mod tiered;
pub mod volatile;

pub use durable::{DurableStore, MemoryDurableStore, PostgresStore};
pub use key::{CacheArgs, CacheKey, KeyArg};
pub use memoize::{FnProducer, Memoized, Memoizer, Producer, producer_fn};
pub use tiered::{Tier, TieredCache};
pub use volatile::{MemoryStore, RedisStore, VolatileStore};
