//! HTTP daemon pieces.
//!
//! - `config`: TOML configuration and defaults
//! - `context`: store pools and pipelines, with explicit connect/close
//! - `routes`: the axum router and error mapping

pub mod config;
pub mod context;
pub mod routes;

pub use config::{Config, PROJECT_NAME};
pub use context::{AppContext, Endpoints, MEMORY_URL};
pub use routes::{ApiError, AppState, router};
