//! # Store Registry
//!
//! Purpose: Own one connection pool per named store and find it by name.

use skv_client::ConnectionPool;
use tracing::info;

use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};

/// Named pools, in config order.
#[derive(Debug, Clone, Default)]
pub struct StoreRegistry {
    pools: Vec<(String, ConnectionPool)>,
}

impl StoreRegistry {
    /// Connects every configured store; the first failing pool aborts startup.
    pub fn connect(config: &GatewayConfig) -> GatewayResult<Self> {
        let mut registry = StoreRegistry::default();
        for store in &config.stores {
            let pool = ConnectionPool::init(config.pool_config(store)).map_err(|source| {
                GatewayError::StoreInit {
                    name: store.name.clone(),
                    source,
                }
            })?;
            info!(store = %store.name, addr = pool.addr(), "store pool registered");
            registry.insert(store.name.clone(), pool);
        }
        Ok(registry)
    }

    /// Adds or replaces the pool registered under `name`.
    pub fn insert(&mut self, name: impl Into<String>, pool: ConnectionPool) {
        let name = name.into();
        match self.pools.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = pool,
            None => self.pools.push((name, pool)),
        }
    }

    /// Pool for store `name`.
    pub fn pool(&self, name: &str) -> Option<&ConnectionPool> {
        self.pools
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, pool)| pool)
    }

    /// Registered store names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.pools.iter().map(|(name, _)| name.as_str())
    }
}
