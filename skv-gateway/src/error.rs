//! # Gateway Errors

use std::io;
use std::path::PathBuf;

use skv_client::ClientError;
use thiserror::Error;

/// Result type for gateway setup.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Startup failures: bad configuration or an unreachable store.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Config file could not be read.
    #[error("read config {}: {source}", path.display())]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Config file is not valid JSON for `GatewayConfig`.
    #[error("parse config: {0}")]
    ParseConfig(#[from] serde_json::Error),
    /// Config parsed but describes an unusable gateway.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    /// A store pool could not be fully connected.
    #[error("init store pool {name}: {source}")]
    StoreInit {
        name: String,
        #[source]
        source: ClientError,
    },
}
