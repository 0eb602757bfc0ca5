//! # ScriptKV Gateway
//!
//! Purpose: The collaborator layer around the pool and script runner: process
//! config, named store pools, action routing, reply shaping, log setup.
//!
//! The HTTP listener that feeds `Gateway::dispatch` lives outside this crate.

mod config;
mod error;
mod gateway;
pub mod logging;
mod registry;
mod reply;

pub use config::{GatewayConfig, StoreConfig};
pub use error::{GatewayError, GatewayResult};
pub use gateway::{Gateway, MASTER_STORE, SIGNUP_SCRIPT};
pub use registry::StoreRegistry;
pub use reply::{Reply, ReplyCode};
