//! finmemo - financial statement and chat API with a two-tier memoizing cache
//!
//! Expensive producers (statement fetches, LLM header matching) are wrapped
//! in a [`Memoizer`] that consults a fast volatile tier (Redis), then a
//! durable tier (PostgreSQL), and only then invokes the producer. Results are
//! written through to both tiers, durable first.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use finmemo::cache::{MemoryDurableStore, MemoryStore, Memoizer, TieredCache, producer_fn};
//!
//! # #[tokio::main]
//! # async fn main() -> finmemo::Result<()> {
//! let cache = TieredCache::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(MemoryDurableStore::new()),
//! );
//! let memoizer = Memoizer::new(Arc::new(cache));
//!
//! let square = memoizer.wrap(producer_fn("square", |(n,): (i64,)| async move {
//!     Ok::<_, finmemo::FinmemoError>(n * n)
//! }));
//!
//! assert_eq!(square.call((7,), false).await?, 49);
//! // Served from cache.
//! assert_eq!(square.call((7,), false).await?, 49);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod error;
pub mod pipeline;
pub mod providers;
#[cfg(feature = "server")]
pub mod server;
pub mod telemetry;
pub mod types;
pub mod version;

pub use cache::{CacheArgs, CacheKey, KeyArg, Memoized, Memoizer, Producer, TieredCache};
pub use error::{FinmemoError, Result};
pub use pipeline::{ChatService, FinancialData};
pub use version::{GIT_BRANCH, GIT_SHA, PKG_VERSION, version_string};
