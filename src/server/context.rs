//! Application context: the stores, the memoizer and the pipelines built on
//! them, opened once at startup and closed once at shutdown.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use super::config::Config;
use crate::cache::{
    DurableStore, MemoryDurableStore, MemoryStore, Memoizer, PostgresStore, RedisStore,
    TieredCache, VolatileStore,
};
use crate::pipeline::{ChatService, FinancialData};
use crate::providers::statements::DEFAULT_STATEMENTS_URL;
use crate::providers::{CompletionProvider, GroqClient, HttpStatementProvider, LlmHeaderMatcher};
use crate::types::{Completion, CompletionOptions};
use crate::{FinmemoError, Result};

/// Store URL that selects the in-process implementation of a tier.
pub const MEMORY_URL: &str = "memory://";

/// Connection strings and keys taken from the environment.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub redis_url: String,
    pub database_url: String,
    pub groq_api_key: Option<String>,
    pub statements_url: Option<String>,
}

enum Volatile {
    Redis(RedisStore),
    Memory(Arc<MemoryStore>),
}

enum Durable {
    Postgres(PostgresStore),
    Memory(Arc<MemoryDurableStore>),
}

/// Everything a request handler needs.
pub struct AppContext {
    pub financial: FinancialData,
    pub chat: ChatService,
    volatile: Volatile,
    durable: Durable,
}

impl AppContext {
    /// Open the store pools and build the pipelines.
    pub async fn connect(config: &Config, endpoints: &Endpoints) -> Result<Self> {
        let volatile = if endpoints.redis_url == MEMORY_URL {
            Volatile::Memory(Arc::new(MemoryStore::with_max_entries(
                config.cache.volatile_max_entries,
            )))
        } else {
            let store = RedisStore::connect(&endpoints.redis_url, config.cache.pool_size)?;
            // The volatile tier is best-effort; serve from durable if it is down.
            if let Err(e) = store.ping().await {
                warn!(error = %e, "redis unreachable at startup");
            }
            Volatile::Redis(store)
        };

        let durable = if endpoints.database_url == MEMORY_URL {
            Durable::Memory(Arc::new(MemoryDurableStore::new()))
        } else {
            let store = PostgresStore::connect(&endpoints.database_url, config.cache.pool_size)?;
            if config.cache.bootstrap_schema {
                store.ensure_table().await?;
            }
            Durable::Postgres(store)
        };

        let volatile_store: Arc<dyn VolatileStore> = match &volatile {
            Volatile::Redis(store) => Arc::new(store.clone()),
            Volatile::Memory(store) => store.clone(),
        };
        let durable_store: Arc<dyn DurableStore> = match &durable {
            Durable::Postgres(store) => Arc::new(store.clone()),
            Durable::Memory(store) => store.clone(),
        };
        info!(
            volatile = volatile_store.name(),
            durable = durable_store.name(),
            "cache tiers ready"
        );

        let memoizer = Memoizer::new(Arc::new(TieredCache::new(volatile_store, durable_store)));

        let completion: Arc<dyn CompletionProvider> = match &endpoints.groq_api_key {
            Some(key) => Arc::new(
                GroqClient::with_base_url(key.clone(), config.llm.base_url.clone())?
                    .model(config.llm.model.clone()),
            ),
            None => {
                warn!("GROQ_API_KEY not set; chat and header matching are disabled");
                Arc::new(MissingCompletion)
            }
        };

        let statements = HttpStatementProvider::new(
            endpoints
                .statements_url
                .as_deref()
                .unwrap_or(DEFAULT_STATEMENTS_URL),
        )?;
        let matcher = LlmHeaderMatcher::new(completion.clone());

        Ok(Self {
            financial: FinancialData::new(&memoizer, Arc::new(statements), Arc::new(matcher)),
            chat: ChatService::new(completion),
            volatile,
            durable,
        })
    }

    /// Close the store pools.
    pub fn close(&self) {
        match &self.volatile {
            Volatile::Redis(store) => store.close(),
            Volatile::Memory(store) => store.clear(),
        }
        if let Durable::Postgres(store) = &self.durable {
            store.close();
        }
        info!("store pools closed");
    }
}

/// Stands in for the completion provider when no API key is configured.
struct MissingCompletion;

#[async_trait]
impl CompletionProvider for MissingCompletion {
    fn name(&self) -> &str {
        "none"
    }

    async fn complete(&self, _prompt: &str, _options: &CompletionOptions) -> Result<Completion> {
        Err(FinmemoError::Configuration(
            "no completion provider configured (set GROQ_API_KEY)".into(),
        ))
    }
}
