//! # Gateway
//!
//! Purpose: The call surface the transport layer drives. Pick a store, borrow
//! a session, run a script, give the session back, shape the reply.

use std::sync::Arc;

use serde_json::{Map, Value};
use skv_script::{ScriptCache, ScriptRunner};
use tracing::error;

use crate::config::GatewayConfig;
use crate::error::GatewayResult;
use crate::registry::StoreRegistry;
use crate::reply::{Reply, ReplyCode};

/// Store used by the sign-up action.
pub const MASTER_STORE: &str = "master";
/// Script run by the sign-up action.
pub const SIGNUP_SCRIPT: &str = "Signup.lua";

/// Stores plus the shared script runner.
#[derive(Debug, Clone)]
pub struct Gateway {
    registry: StoreRegistry,
    runner: ScriptRunner,
}

impl Gateway {
    pub fn new(registry: StoreRegistry, runner: ScriptRunner) -> Self {
        Gateway { registry, runner }
    }

    /// Connects every configured store and opens the script directory.
    pub fn connect(config: &GatewayConfig) -> GatewayResult<Self> {
        let registry = StoreRegistry::connect(config)?;
        let cache = Arc::new(ScriptCache::new(&config.scripts_dir));
        Ok(Gateway::new(registry, ScriptRunner::new(cache)))
    }

    pub fn registry(&self) -> &StoreRegistry {
        &self.registry
    }

    /// Runs `script` on store `store`.
    pub fn call(&self, store: &str, script: &str, args: &[&[u8]]) -> Reply {
        let reply = self.call_inner(store, script, args);
        log_failure(&reply, store, script);
        reply
    }

    fn call_inner(&self, store: &str, script: &str, args: &[&[u8]]) -> Reply {
        let Some(pool) = self.registry.pool(store) else {
            return Reply::failure(ReplyCode::Store, format!("unknown store {}", store));
        };
        let mut session = match pool.acquire() {
            Ok(session) => session,
            Err(err) => return Reply::failure(ReplyCode::Store, err.to_string()),
        };
        let result = self.runner.run(&mut session, script, args);
        pool.release(session);
        Reply::from_script(result)
    }

    /// Routes a named action carrying a JSON object payload.
    pub fn dispatch(&self, action: &str, json_data: &str, now: i64) -> Reply {
        if serde_json::from_str::<Map<String, Value>>(json_data).is_err() {
            return rejected(action);
        }
        match action {
            "sign_up" => {
                let now = now.to_string();
                self.call(
                    MASTER_STORE,
                    SIGNUP_SCRIPT,
                    &[b"0", json_data.as_bytes(), now.as_bytes()],
                )
            }
            _ => rejected(action),
        }
    }
}

fn rejected(action: &str) -> Reply {
    let code = ReplyCode::InvalidRequest;
    error!(action, code = code.code(), "{}", code.message());
    Reply::canned(code)
}

fn log_failure(reply: &Reply, store: &str, script: &str) {
    if let Reply::Failure { code, msg } = reply {
        error!(store, script, code = code.code(), "{}", msg);
    }
}
