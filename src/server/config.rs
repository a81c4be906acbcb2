//! Configuration loading for finmemod.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.finmemo/config.toml` (user)
//! 3. `/etc/finmemo/config.toml` (system)
//!
//! When no file is found the defaults apply. Connection strings and API keys
//! are never read from these files; they come from the environment.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::volatile::DEFAULT_MEMORY_MAX_ENTRIES;
use crate::providers::groq;
use crate::{FinmemoError, Result};

/// Name reported at startup.
pub const PROJECT_NAME: &str = "getData API";

/// Server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

/// Server network configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to (default: 0.0.0.0:8000).
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            limits: LimitsConfig::default(),
        }
    }
}

fn default_address() -> String {
    "0.0.0.0:8000".to_string()
}

/// Resource limits.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Request timeout in seconds (default: 60).
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
}

impl LimitsConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    60
}

/// Cache tier settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Upper bound for the in-process volatile tier used when Redis is
    /// replaced by memory (tests, local runs).
    #[serde(default = "default_volatile_max_entries")]
    pub volatile_max_entries: u64,
    /// Connection pool size for each backing store (default: 16).
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    /// Create the `cache_items` table at startup if missing (default: true).
    #[serde(default = "default_true")]
    pub bootstrap_schema: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            volatile_max_entries: default_volatile_max_entries(),
            pool_size: default_pool_size(),
            bootstrap_schema: true,
        }
    }
}

fn default_volatile_max_entries() -> u64 {
    DEFAULT_MEMORY_MAX_ENTRIES
}

fn default_pool_size() -> usize {
    16
}

fn default_true() -> bool {
    true
}

/// Completion endpoint settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
        }
    }
}

fn default_model() -> String {
    groq::DEFAULT_MODEL.to_string()
}

fn default_base_url() -> String {
    groq::DEFAULT_BASE_URL.to_string()
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// An explicit path must exist. Without one, the first of
    /// `~/.finmemo/config.toml` and `/etc/finmemo/config.toml` that exists is
    /// used, or the defaults if neither does.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            FinmemoError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            FinmemoError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(FinmemoError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".finmemo").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        let system_config = PathBuf::from("/etc/finmemo/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.server.address, "0.0.0.0:8000");
        assert_eq!(config.server.limits.request_timeout_secs, 60);
        assert_eq!(config.cache.pool_size, 16);
        assert!(config.cache.bootstrap_schema);
        assert_eq!(config.llm.model, "llama3-8b-8192");
    }

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
            [server]
            address = "127.0.0.1:9000"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.address, "127.0.0.1:9000");
        assert_eq!(config.cache.volatile_max_entries, DEFAULT_MEMORY_MAX_ENTRIES);
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
            [server]
            address = "0.0.0.0:8000"

            [server.limits]
            request_timeout_secs = 10

            [cache]
            volatile_max_entries = 500
            pool_size = 4
            bootstrap_schema = false

            [llm]
            model = "llama3-70b-8192"
            base_url = "http://localhost:8080/v1"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.limits.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.cache.volatile_max_entries, 500);
        assert_eq!(config.cache.pool_size, 4);
        assert!(!config.cache.bootstrap_schema);
        assert_eq!(config.llm.model, "llama3-70b-8192");
        assert_eq!(config.llm.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn load_reads_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[cache]\npool_size = 2").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.cache.pool_size, 2);
        assert_eq!(config.server.address, "0.0.0.0:8000");
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, FinmemoError::Configuration(_)));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server\naddress = 1").unwrap();
        assert!(Config::load(Some(file.path())).is_err());
    }
}
