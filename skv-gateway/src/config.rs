//! # Gateway Configuration
//!
//! Purpose: Read the JSON process config: listen address, named stores, and
//! the script directory.
//!
//! ```json
//! {
//!   "listenhost": "0.0.0.0",
//!   "listenport": 8080,
//!   "redis": [{ "name": "master", "redishost": "127.0.0.1", "redisport": 6379 }],
//!   "scripts_dir": "./script",
//!   "max_store_conn": 3
//! }
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use skv_client::PoolConfig;

use crate::error::{GatewayError, GatewayResult};

/// Whole-process configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(rename = "listenhost", default = "default_listen_host")]
    pub listen_host: String,
    #[serde(rename = "listenport", default)]
    pub listen_port: u16,
    /// Named store endpoints, looked up by name at call time.
    #[serde(rename = "redis")]
    pub stores: Vec<StoreConfig>,
    #[serde(default = "default_scripts_dir")]
    pub scripts_dir: PathBuf,
    /// Sessions per store pool.
    #[serde(default = "default_max_store_conn")]
    pub max_store_conn: usize,
    #[serde(default)]
    pub connect_timeout_ms: Option<u64>,
    #[serde(default)]
    pub read_timeout_ms: Option<u64>,
    #[serde(default)]
    pub write_timeout_ms: Option<u64>,
}

/// One named store endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoreConfig {
    pub name: String,
    #[serde(rename = "redishost")]
    pub host: String,
    #[serde(rename = "redisport")]
    pub port: u16,
}

fn default_listen_host() -> String {
    "0.0.0.0".to_string()
}

fn default_scripts_dir() -> PathBuf {
    PathBuf::from("./script")
}

fn default_max_store_conn() -> usize {
    3
}

impl GatewayConfig {
    /// Reads, parses and validates the config file at `path`.
    pub fn load(path: impl AsRef<Path>) -> GatewayResult<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| GatewayError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Parses and validates a JSON document.
    pub fn from_json(raw: &str) -> GatewayResult<Self> {
        let config: GatewayConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects configs that could never serve a call.
    pub fn validate(&self) -> GatewayResult<()> {
        if self.stores.is_empty() {
            return Err(GatewayError::InvalidConfig("no store configured".into()));
        }
        if self.max_store_conn == 0 {
            return Err(GatewayError::InvalidConfig("max_store_conn must be at least 1".into()));
        }
        let mut seen = HashSet::new();
        for store in &self.stores {
            if !seen.insert(store.name.as_str()) {
                return Err(GatewayError::InvalidConfig(format!(
                    "duplicate store name {}",
                    store.name
                )));
            }
        }
        Ok(())
    }

    /// Pool settings for one store.
    pub fn pool_config(&self, store: &StoreConfig) -> PoolConfig {
        let mut pool = PoolConfig::new(store.host.clone(), store.port, self.max_store_conn);
        pool.connect_timeout = self.connect_timeout_ms.map(Duration::from_millis);
        pool.read_timeout = self.read_timeout_ms.map(Duration::from_millis);
        pool.write_timeout = self.write_timeout_ms.map(Duration::from_millis);
        pool
    }
}
